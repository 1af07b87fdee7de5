//! # Analytic prev() Tests
//!
//! `prev(column) over (partition by ...)` on journal scans: first-row
//! nulls per partition, values carried from the previous row and output
//! column naming.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test analytic_prev
//! ```

use journaldb::config::EngineConfig;
use journaldb::records::{Record, RecordCursor, RecordMetadata};
use journaldb::source::{
    AnalyticFunction, AnalyticRecordSource, JournalRecordSource, NeverCancelled,
    PrevRowAnalyticFunction, RecordSource,
};
use journaldb::storage::{JournalFactory, PartitionBy};
use journaldb::types::ColumnType;

/// trades(sym SYMBOL, price DOUBLE, qty INT, note STRING, flag BOOLEAN, ts DATE)
fn trades() -> JournalFactory {
    let factory = JournalFactory::new();
    let metadata = RecordMetadata::builder()
        .column("sym", ColumnType::Symbol)
        .column("price", ColumnType::Double)
        .column("qty", ColumnType::Int)
        .column("note", ColumnType::String)
        .column("flag", ColumnType::Boolean)
        .column("ts", ColumnType::Date)
        .timestamp("ts")
        .build()
        .unwrap();
    let journal = factory.create("trades", metadata, PartitionBy::Day).unwrap();
    let mut writer = journal.writer().unwrap();
    let rows: [(&str, f64, i32, Option<&str>, bool); 4] = [
        ("A", 1.0, 10, Some("a1"), true),
        ("B", 2.0, 20, None, true),
        ("A", 3.0, 30, Some("a3"), false),
        ("B", 4.0, 40, Some("b4"), false),
    ];
    for (i, (sym, price, qty, note, flag)) in rows.into_iter().enumerate() {
        let mut row = writer.row(i as i64 * 40_000_000).unwrap();
        row.put_sym(0, sym).put_double(1, price).put_int(2, qty).put_bool(4, flag);
        if let Some(note) = note {
            row.put_str(3, note);
        }
        row.append().unwrap();
    }
    writer.commit();
    factory
}

fn analytic(factory: &JournalFactory, functions: Vec<Box<dyn AnalyticFunction>>) -> AnalyticRecordSource {
    AnalyticRecordSource::new(
        Box::new(JournalRecordSource::new(factory, "trades").unwrap()),
        functions,
        &EngineConfig::default(),
    )
    .unwrap()
}

fn collect<T>(cursor: &mut dyn RecordCursor, mut f: impl FnMut(&dyn Record) -> T) -> Vec<T> {
    let mut out = Vec::new();
    while cursor.has_next().unwrap() {
        out.push(f(cursor.next().unwrap()));
    }
    out
}

#[test]
fn prev_double_per_partition() {
    let factory = trades();
    let mut source = analytic(
        &factory,
        vec![Box::new(PrevRowAnalyticFunction::new("price", &["sym"]).alias("prev_price"))],
    );
    assert_eq!(source.metadata().column(6).name(), "prev_price");
    assert_eq!(source.metadata().column_type(6), ColumnType::Double);

    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let prevs = collect(cursor, |r| r.get_double(6));
    assert!(prevs[0].is_nan());
    assert!(prevs[1].is_nan());
    assert_eq!(&prevs[2..], &[1.0, 2.0]);
}

#[test]
fn input_columns_pass_through() {
    let factory = trades();
    let mut source = analytic(&factory, vec![Box::new(PrevRowAnalyticFunction::new("qty", &["sym"]))]);
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let rows = collect(cursor, |r| (r.get_sym(0).unwrap().to_owned(), r.get_int(2), r.get_int(6)));
    assert_eq!(
        rows,
        vec![
            ("A".to_owned(), 10, i32::MIN),
            ("B".to_owned(), 20, i32::MIN),
            ("A".to_owned(), 30, 10),
            ("B".to_owned(), 40, 20),
        ]
    );
}

#[test]
fn no_partition_columns_chain_every_row() {
    let factory = trades();
    let mut source = analytic(
        &factory,
        vec![
            Box::new(PrevRowAnalyticFunction::new::<&str>("qty", &[])),
            Box::new(PrevRowAnalyticFunction::new::<&str>("ts", &[])),
        ],
    );
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let rows = collect(cursor, |r| (r.get_int(6), r.get_date(7)));
    assert_eq!(
        rows,
        vec![
            (i32::MIN, i64::MIN),
            (10, 0),
            (20, 40_000_000),
            (30, 80_000_000),
        ]
    );
}

#[test]
fn prev_strings_and_symbols_keep_nulls() {
    let factory = trades();
    let mut source = analytic(
        &factory,
        vec![
            Box::new(PrevRowAnalyticFunction::new("note", &["sym"])),
            Box::new(PrevRowAnalyticFunction::new::<&str>("sym", &[])),
        ],
    );
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let rows = collect(cursor, |r| {
        (r.get_str(6).map(str::to_owned), r.get_sym(7).map(str::to_owned))
    });
    let rows: Vec<_> = rows
        .iter()
        .map(|(note, sym)| (note.as_deref(), sym.as_deref()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (None, None),
            (None, Some("A")),
            (Some("a1"), Some("B")),
            (None, Some("A")),
        ]
    );
}

#[test]
fn prev_boolean_defaults_to_false() {
    let factory = trades();
    let mut source = analytic(&factory, vec![Box::new(PrevRowAnalyticFunction::new("flag", &["sym"]))]);
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    assert_eq!(collect(cursor, |r| r.get_bool(6)), vec![false, false, true, true]);
}

#[test]
fn unaliased_functions_are_named_by_position() {
    let factory = trades();
    let source = analytic(
        &factory,
        vec![
            Box::new(PrevRowAnalyticFunction::new("price", &["sym"])),
            Box::new(PrevRowAnalyticFunction::new("qty", &["sym"]).alias("pq")),
            Box::new(PrevRowAnalyticFunction::new("note", &["sym"])),
        ],
    );
    let names: Vec<_> = source.metadata().columns()[6..]
        .iter()
        .map(|c| c.name().to_owned())
        .collect();
    assert_eq!(names, vec!["col0", "pq", "col2"]);
    assert_eq!(source.metadata().timestamp_index(), Some(5));
}

#[test]
fn reset_starts_partitions_over() {
    let factory = trades();
    let mut source = analytic(&factory, vec![Box::new(PrevRowAnalyticFunction::new("qty", &["sym"]))]);
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let first = collect(cursor, |r| r.get_int(6));
    source.reset().unwrap();
    assert_eq!(collect(&mut source, |r| r.get_int(6)), first);
}

#[test]
fn unknown_column_fails_construction() {
    let factory = trades();
    let err = AnalyticRecordSource::new(
        Box::new(JournalRecordSource::new(&factory, "trades").unwrap()),
        vec![Box::new(PrevRowAnalyticFunction::new("volume", &["sym"]))],
        &EngineConfig::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.to_string(), "Invalid column: volume");
}

#[test]
fn row_id_access_is_unsupported() {
    let factory = trades();
    let mut source = analytic(&factory, vec![Box::new(PrevRowAnalyticFunction::new("qty", &["sym"]))]);
    assert!(!source.supports_row_id_access());

    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let row_id = cursor.next().unwrap().row_id();
    let err = cursor.get_by_row_id(row_id).err().unwrap();
    assert_eq!(err.to_string(), "Analytic records do not support row id access");
}
