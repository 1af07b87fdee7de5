//! # Cancellation Tests
//!
//! Sources that drain their input poll the cancellation handler once per
//! row and stop with a [`QueryCancelled`] error once it trips.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test cancellation
//! ```

use std::sync::Arc;
use std::thread;

use journaldb::config::EngineConfig;
use journaldb::records::{RecordCursor, RecordMetadata};
use journaldb::source::{
    AggregatedRecordSource, AnalyticRecordSource, AtomicCancellationHandler, CancellationHandler,
    CountAggregator, HashJoinRecordSource, JournalRecordSource, PrevRowAnalyticFunction,
    QueryCancelled, RecordSource,
};
use journaldb::storage::{JournalFactory, PartitionBy};
use journaldb::types::ColumnType;

fn events(rows: usize) -> JournalFactory {
    let factory = JournalFactory::new();
    let metadata = RecordMetadata::builder()
        .column("kind", ColumnType::Symbol)
        .column("v", ColumnType::Long)
        .column("ts", ColumnType::Date)
        .timestamp("ts")
        .build()
        .unwrap();
    let journal = factory.create("events", metadata, PartitionBy::None).unwrap();
    let mut writer = journal.writer().unwrap();
    for i in 0..rows {
        let kind = if i % 2 == 0 { "even" } else { "odd" };
        writer
            .row(i as i64)
            .unwrap()
            .put_sym(0, kind)
            .put_long(1, i as i64)
            .append()
            .unwrap();
    }
    writer.commit();
    factory
}

fn scan(factory: &JournalFactory) -> Box<dyn RecordSource> {
    Box::new(JournalRecordSource::new(factory, "events").unwrap())
}

fn cancelled() -> Arc<dyn CancellationHandler> {
    let handler = AtomicCancellationHandler::new();
    handler.cancel();
    Arc::new(handler)
}

fn is_cancelled(err: &eyre::Report) -> bool {
    err.downcast_ref::<QueryCancelled>().is_some()
}

#[test]
fn aggregation_stops_while_building_groups() {
    let factory = events(10);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &["kind"],
        vec![Box::new(CountAggregator::new())],
        &EngineConfig::default(),
    )
    .unwrap();
    let err = source.prepare_cursor(&factory, &cancelled()).err().unwrap();
    assert!(is_cancelled(&err));
    assert_eq!(err.to_string(), "Query was cancelled");
}

#[test]
fn hash_join_stops_while_indexing_the_slave() {
    let factory = events(10);
    let mut source = HashJoinRecordSource::new(
        scan(&factory),
        &["kind"],
        scan(&factory),
        &["kind"],
        false,
        &EngineConfig::default(),
    )
    .unwrap();
    let err = source.prepare_cursor(&factory, &cancelled()).err().unwrap();
    assert!(is_cancelled(&err));
}

#[test]
fn hash_join_stops_while_emitting_rows() {
    let factory = events(10);
    let mut source = HashJoinRecordSource::new(
        scan(&factory),
        &["kind"],
        scan(&factory),
        &["kind"],
        false,
        &EngineConfig::default(),
    )
    .unwrap();

    let handler = AtomicCancellationHandler::new();
    let shared: Arc<dyn CancellationHandler> = Arc::new(handler.clone());
    let cursor = source.prepare_cursor(&factory, &shared).unwrap();
    // The first master row fans out to five slave rows.
    assert_eq!(cursor.next().unwrap().get_long(1), 0);

    handler.cancel();
    let err = cursor.next().err().unwrap();
    assert!(is_cancelled(&err));
    assert!(cursor.has_next().is_err());
}

#[test]
fn analytic_stops_between_rows() {
    let factory = events(10);
    let mut source = AnalyticRecordSource::new(
        scan(&factory),
        vec![Box::new(PrevRowAnalyticFunction::new("v", &["kind"]))],
        &EngineConfig::default(),
    )
    .unwrap();

    let handler = AtomicCancellationHandler::new();
    let shared: Arc<dyn CancellationHandler> = Arc::new(handler.clone());
    let cursor = source.prepare_cursor(&factory, &shared).unwrap();
    assert_eq!(cursor.next().unwrap().get_long(1), 0);
    assert_eq!(cursor.next().unwrap().get_long(1), 1);

    let remote = handler.clone();
    thread::spawn(move || remote.cancel()).join().unwrap();
    assert!(handler.is_cancelled());

    let err = cursor.next().err().unwrap();
    assert!(is_cancelled(&err));
}

#[test]
fn empty_input_never_polls_the_handler() {
    let factory = events(0);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &["kind"],
        vec![Box::new(CountAggregator::new())],
        &EngineConfig::default(),
    )
    .unwrap();
    let cursor = source.prepare_cursor(&factory, &cancelled()).unwrap();
    assert!(!cursor.has_next().unwrap());
}
