//! # Group-By Aggregation Tests
//!
//! Aggregation over journal scans: per-group results, first-seen group
//! order, every aggregator and replay after reset.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test group_by
//! ```

use journaldb::config::EngineConfig;
use journaldb::records::{Record, RecordCursor, RecordMetadata};
use journaldb::source::{
    AggregatedRecordSource, AggregatorFunction, AvgAggregator, CountAggregator, FirstAggregator,
    JournalRecordSource, LastAggregator, MaxAggregator, MinAggregator, NeverCancelled,
    RecordSource, SumAggregator,
};
use journaldb::storage::{JournalFactory, PartitionBy};
use journaldb::types::ColumnType;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// trades(sym SYMBOL, qty INT, price DOUBLE, note STRING, ts DATE)
fn trades(rows: &[(&str, i32, f64)]) -> JournalFactory {
    let factory = JournalFactory::new();
    let metadata = RecordMetadata::builder()
        .column("sym", ColumnType::Symbol)
        .column("qty", ColumnType::Int)
        .column("price", ColumnType::Double)
        .column("note", ColumnType::String)
        .column("ts", ColumnType::Date)
        .timestamp("ts")
        .build()
        .unwrap();
    let journal = factory.create("trades", metadata, PartitionBy::None).unwrap();
    let mut writer = journal.writer().unwrap();
    for (i, &(sym, qty, price)) in rows.iter().enumerate() {
        writer
            .row(i as i64)
            .unwrap()
            .put_sym(0, sym)
            .put_int(1, qty)
            .put_double(2, price)
            .append()
            .unwrap();
    }
    writer.commit();
    factory
}

fn scan(factory: &JournalFactory) -> Box<dyn RecordSource> {
    Box::new(JournalRecordSource::new(factory, "trades").unwrap())
}

fn collect<T>(cursor: &mut dyn RecordCursor, mut f: impl FnMut(&dyn Record) -> T) -> Vec<T> {
    let mut out = Vec::new();
    while cursor.has_next().unwrap() {
        out.push(f(cursor.next().unwrap()));
    }
    out
}

const ROWS: &[(&str, i32, f64)] = &[
    ("A", 10, 1.0),
    ("B", 5, 2.0),
    ("A", 7, 3.0),
    ("C", 1, 4.0),
    ("B", 2, 5.0),
];

// ============================================================================
// SUM AND ORDER
// ============================================================================

#[test]
fn sum_per_group_in_first_seen_order() {
    let factory = trades(ROWS);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &["sym"],
        vec![Box::new(SumAggregator::new("qty"))],
        &EngineConfig::default(),
    )
    .unwrap();

    let metadata = source.metadata().clone();
    assert_eq!(metadata.column(0).name(), "sym");
    assert_eq!(metadata.column_type(0), ColumnType::String);
    assert_eq!(metadata.column(1).name(), "sum");
    assert_eq!(metadata.column_type(1), ColumnType::Long);

    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let groups = collect(cursor, |r| (r.get_str(0).unwrap().to_owned(), r.get_long(1)));
    assert_eq!(
        groups,
        vec![("A".to_owned(), 17), ("B".to_owned(), 7), ("C".to_owned(), 1)]
    );
}

#[test]
fn sum_of_doubles_stays_floating() {
    let factory = trades(ROWS);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &["sym"],
        vec![Box::new(SumAggregator::new("price").alias("total"))],
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(source.metadata().column_type(1), ColumnType::Double);

    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let totals = collect(cursor, |r| r.get_double(1));
    assert_eq!(totals, vec![4.0, 7.0, 4.0]);
}

#[test]
fn no_key_columns_folds_everything_into_one_group() {
    let factory = trades(ROWS);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &[],
        vec![
            Box::new(CountAggregator::new()),
            Box::new(SumAggregator::new("qty")),
        ],
        &EngineConfig::default(),
    )
    .unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    assert_eq!(collect(cursor, |r| (r.get_long(0), r.get_long(1))), vec![(5, 25)]);
}

#[test]
fn empty_input_yields_no_groups() {
    let factory = trades(&[]);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &["sym"],
        vec![Box::new(CountAggregator::new())],
        &EngineConfig::default(),
    )
    .unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    assert!(!cursor.has_next().unwrap());
}

// ============================================================================
// EVERY AGGREGATOR
// ============================================================================

#[test]
fn all_aggregators_side_by_side() {
    let factory = trades(ROWS);
    let aggregators: Vec<Box<dyn AggregatorFunction>> = vec![
        Box::new(CountAggregator::new()),
        Box::new(SumAggregator::new("qty").alias("sum_qty")),
        Box::new(AvgAggregator::new("price")),
        Box::new(MinAggregator::new("qty")),
        Box::new(MaxAggregator::new("price")),
        Box::new(FirstAggregator::new("price")),
        Box::new(LastAggregator::new("qty")),
    ];
    let mut source =
        AggregatedRecordSource::new(scan(&factory), &["sym"], aggregators, &EngineConfig::default())
            .unwrap();

    let metadata = source.metadata().clone();
    let names: Vec<_> = metadata.columns().iter().map(|c| c.name().to_owned()).collect();
    assert_eq!(
        names,
        vec![
            "sym", "count", "sum_qty", "avg$sum", "avg$count", "avg", "min", "max", "first",
            "last"
        ]
    );
    assert_eq!(metadata.column_type(6), ColumnType::Int);
    assert_eq!(metadata.column_type(7), ColumnType::Double);

    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let groups = collect(cursor, |r| {
        (
            r.get_str(0).unwrap().to_owned(),
            r.get_long(1),
            r.get_long(2),
            r.get_double(5),
            r.get_int(6),
            r.get_double(7),
            r.get_double(8),
            r.get_int(9),
        )
    });
    assert_eq!(
        groups,
        vec![
            ("A".to_owned(), 2, 17, 2.0, 7, 3.0, 1.0, 7),
            ("B".to_owned(), 2, 7, 3.5, 2, 5.0, 2.0, 2),
            ("C".to_owned(), 1, 1, 4.0, 1, 4.0, 4.0, 1),
        ]
    );
}

#[test]
fn min_handles_negative_values_from_zeroed_slots() {
    let factory = trades(&[("A", 3, -1.5), ("A", -4, -0.5), ("A", 9, -2.5)]);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &["sym"],
        vec![
            Box::new(MinAggregator::new("qty")),
            Box::new(MaxAggregator::new("price")),
            Box::new(MinAggregator::new("price").alias("low")),
        ],
        &EngineConfig::default(),
    )
    .unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let rows = collect(cursor, |r| (r.get_int(1), r.get_double(2), r.get_double(3)));
    assert_eq!(rows, vec![(-4, -0.5, -2.5)]);
}

#[test]
fn aggregators_reject_unsupported_columns() {
    let factory = trades(ROWS);
    let err = AggregatedRecordSource::new(
        scan(&factory),
        &["sym"],
        vec![Box::new(SumAggregator::new("note"))],
        &EngineConfig::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.to_string(), "sum() does not support STRING column note");

    let err = AggregatedRecordSource::new(
        scan(&factory),
        &["sym"],
        vec![Box::new(FirstAggregator::new("sym"))],
        &EngineConfig::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.to_string(), "first() does not support SYMBOL column sym");
}

#[test]
fn unknown_key_column_fails() {
    let factory = trades(ROWS);
    let err = AggregatedRecordSource::new(
        scan(&factory),
        &["venue"],
        vec![Box::new(CountAggregator::new())],
        &EngineConfig::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.to_string(), "Invalid column name: venue");
}

// ============================================================================
// REPLAY
// ============================================================================

#[test]
fn reset_rebuilds_identical_groups() {
    let factory = trades(ROWS);
    let mut source = AggregatedRecordSource::new(
        scan(&factory),
        &["sym", "qty"],
        vec![Box::new(CountAggregator::new())],
        &EngineConfig::default(),
    )
    .unwrap();
    assert!(!source.supports_row_id_access());

    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let first = collect(cursor, |r| (r.get_str(0).unwrap().to_owned(), r.get_int(1), r.get_long(2)));
    assert_eq!(first.len(), 5);

    source.reset().unwrap();
    let second = collect(&mut source, |r| {
        (r.get_str(0).unwrap().to_owned(), r.get_int(1), r.get_long(2))
    });
    assert_eq!(first, second);
    assert!(second.iter().all(|(_, _, count)| *count == 1));
}
