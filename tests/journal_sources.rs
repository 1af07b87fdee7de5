//! # Journal Scan Tests
//!
//! Full scans, row id access and projection over in-memory journals.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test journal_sources
//! ```

use std::sync::Arc;

use journaldb::records::{Record, RecordCursor, RecordMetadata};
use journaldb::source::{
    JournalRecordSource, NeverCancelled, RecordSource, SelectedColumnsRecordSource,
};
use journaldb::storage::{to_row_id, Journal, JournalFactory, PartitionBy};
use journaldb::types::ColumnType;

const DAY: i64 = 86_400_000;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn create_quotes(factory: &JournalFactory) -> Arc<Journal> {
    let metadata = RecordMetadata::builder()
        .column("sym", ColumnType::Symbol)
        .column("price", ColumnType::Double)
        .column("note", ColumnType::String)
        .column("ts", ColumnType::Date)
        .timestamp("ts")
        .build()
        .expect("metadata");
    factory
        .create("quotes", metadata, PartitionBy::Day)
        .expect("create journal")
}

fn write_quotes(journal: &Arc<Journal>, rows: &[(&str, f64, i64)]) {
    let mut writer = journal.writer().expect("writer");
    for &(sym, price, ts) in rows {
        writer
            .row(ts)
            .unwrap()
            .put_sym(0, sym)
            .put_double(1, price)
            .append()
            .unwrap();
    }
    writer.commit();
}

fn collect<T>(cursor: &mut dyn RecordCursor, mut f: impl FnMut(&dyn Record) -> T) -> Vec<T> {
    let mut out = Vec::new();
    while cursor.has_next().unwrap() {
        out.push(f(cursor.next().unwrap()));
    }
    out
}

// ============================================================================
// FULL SCAN
// ============================================================================

#[test]
fn scan_walks_partitions_in_time_order() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    write_quotes(
        &journal,
        &[("A", 1.0, 10), ("B", 2.0, 20), ("A", 3.0, DAY + 5), ("C", 4.0, 2 * DAY + 1)],
    );

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let rows = collect(cursor, |r| {
        (r.get_sym(0).map(str::to_owned), r.get_double(1), r.get_date(3), r.row_id())
    });

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], (Some("A".to_owned()), 1.0, 10, to_row_id(0, 0)));
    assert_eq!(rows[1], (Some("B".to_owned()), 2.0, 20, to_row_id(0, 1)));
    assert_eq!(rows[2], (Some("A".to_owned()), 3.0, DAY + 5, to_row_id(1, 0)));
    assert_eq!(rows[3], (Some("C".to_owned()), 4.0, 2 * DAY + 1, to_row_id(2, 0)));
}

#[test]
fn empty_journal_has_no_rows() {
    let factory = JournalFactory::new();
    create_quotes(&factory);

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    assert!(!cursor.has_next().unwrap());
    assert!(cursor.next().is_err());
}

#[test]
fn unknown_journal_is_an_error() {
    let factory = JournalFactory::new();
    let err = JournalRecordSource::new(&factory, "missing").err().unwrap();
    assert_eq!(err.to_string(), "Journal does not exist: missing");
}

// ============================================================================
// ROW ID ACCESS
// ============================================================================

#[test]
fn row_ids_reread_the_rows_they_came_from() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    write_quotes(
        &journal,
        &[("A", 1.5, 1), ("B", 2.5, 2), ("C", 3.5, DAY), ("D", 4.5, DAY + 1)],
    );

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    assert!(source.supports_row_id_access());
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let scanned = collect(cursor, |r| {
        (r.row_id(), r.get_sym(0).map(str::to_owned), r.get_double(1))
    });

    for (row_id, sym, price) in scanned.iter().rev() {
        let record = source.get_by_row_id(*row_id).unwrap();
        assert_eq!(record.get_sym(0).map(str::to_owned), *sym);
        assert_eq!(record.get_double(1), *price);
        assert_eq!(record.row_id(), *row_id);
    }
}

#[test]
fn row_id_past_partition_end_is_an_error() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    write_quotes(&journal, &[("A", 1.0, 1)]);

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    assert!(source.get_by_row_id(to_row_id(0, 1)).is_err());
    assert!(source.get_by_row_id(to_row_id(3, 0)).is_err());
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[test]
fn prepare_and_reset_pick_up_new_commits() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    write_quotes(&journal, &[("A", 1.0, 1)]);

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    write_quotes(&journal, &[("B", 2.0, 2)]);

    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    assert_eq!(collect(cursor, |r| r.get_double(1)), vec![1.0, 2.0]);

    write_quotes(&journal, &[("C", 3.0, 3)]);
    source.reset().unwrap();
    assert_eq!(collect(&mut source, |r| r.get_double(1)), vec![1.0, 2.0, 3.0]);
}

#[test]
fn uncommitted_rows_stay_invisible() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    let mut writer = journal.writer().unwrap();
    writer.row(1).unwrap().put_sym(0, "A").put_double(1, 1.0).append().unwrap();

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    assert!(!cursor.has_next().unwrap());

    writer.commit();
    source.reset().unwrap();
    assert_eq!(collect(&mut source, |r| r.get_double(1)), vec![1.0]);
}

// ============================================================================
// NULLS
// ============================================================================

#[test]
fn null_string_differs_from_empty_string() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    let mut writer = journal.writer().unwrap();
    writer.row(1).unwrap().put_sym(0, "A").put_str(2, "").append().unwrap();
    writer.row(2).unwrap().put_sym(0, "B").append().unwrap();
    writer.commit();

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let notes = collect(cursor, |r| r.get_str(2).map(str::to_owned));
    assert_eq!(notes, vec![Some(String::new()), None]);
}

#[test]
fn unset_numeric_columns_read_as_null_sentinels() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    let mut writer = journal.writer().unwrap();
    writer.row(1).unwrap().append().unwrap();
    writer.commit();

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let record = cursor.next().unwrap();
    assert!(record.get_double(1).is_nan());
    assert_eq!(record.get_sym(0), None);
    assert_eq!(record.get_date(3), 1);
}

// ============================================================================
// PROJECTION
// ============================================================================

#[test]
fn selected_columns_are_reordered_and_keep_row_ids() {
    let factory = JournalFactory::new();
    let journal = create_quotes(&factory);
    write_quotes(&journal, &[("A", 1.0, 1), ("B", 2.0, DAY)]);

    let scan = JournalRecordSource::new(&factory, "quotes").unwrap();
    let mut select = SelectedColumnsRecordSource::new(Box::new(scan), &["price", "ts", "sym"]).unwrap();

    let names: Vec<_> = select.metadata().columns().iter().map(|c| c.name().to_owned()).collect();
    assert_eq!(names, vec!["price", "ts", "sym"]);
    assert_eq!(select.metadata().timestamp_index(), Some(1));
    assert!(select.supports_row_id_access());

    let cursor = select
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let rows = collect(cursor, |r| {
        (r.get_double(0), r.get_date(1), r.get_sym(2).map(str::to_owned), r.row_id())
    });
    assert_eq!(
        rows,
        vec![
            (1.0, 1, Some("A".to_owned()), to_row_id(0, 0)),
            (2.0, DAY, Some("B".to_owned()), to_row_id(1, 0)),
        ]
    );

    let record = select.get_by_row_id(to_row_id(0, 0)).unwrap();
    assert_eq!(record.get_sym(2), Some("A"));
}

#[test]
fn projection_without_timestamp_has_no_timestamp_index() {
    let factory = JournalFactory::new();
    create_quotes(&factory);
    let scan = JournalRecordSource::new(&factory, "quotes").unwrap();
    let select = SelectedColumnsRecordSource::new(Box::new(scan), &["sym"]).unwrap();
    assert_eq!(select.metadata().timestamp_index(), None);
}

#[test]
fn projection_of_unknown_column_fails() {
    let factory = JournalFactory::new();
    create_quotes(&factory);
    let scan = JournalRecordSource::new(&factory, "quotes").unwrap();
    let err = SelectedColumnsRecordSource::new(Box::new(scan), &["nope"]).err().unwrap();
    assert_eq!(err.to_string(), "Invalid column name: nope");
}
