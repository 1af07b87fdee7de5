//! # Query Parser Tests
//!
//! End-to-end parsing through the public API: query models, error
//! positions and `create journal` statements feeding the journal factory.
//!
//! ## Usage
//!
//! ```sh
//! cargo test --test query_parser
//! ```

use bumpalo::Bump;
use journaldb::records::{Record, RecordCursor};
use journaldb::source::{JournalRecordSource, NeverCancelled, RecordSource};
use journaldb::sql::{Direction, ExprNodeType, JoinType, ParseError, Parser, Statement};
use journaldb::storage::{JournalFactory, PartitionBy};
use journaldb::types::ColumnType;

fn parse_error(text: &str) -> ParseError {
    let arena = Bump::new();
    let report = Parser::new(text, &arena).parse_statement().unwrap_err();
    report.downcast_ref::<ParseError>().unwrap().clone()
}

#[test]
fn full_select_builds_every_clause() {
    let arena = Bump::new();
    let text = "select a, b from t where a > 1 order by b desc limit 10";
    let Statement::Query(model) = Parser::new(text, &arena).parse_statement().unwrap() else {
        panic!("expected a query");
    };

    let columns: Vec<_> = model.columns.iter().map(|c| c.expr.token).collect();
    assert_eq!(columns, vec!["a", "b"]);
    assert_eq!(model.journal(), Some("t"));
    assert_eq!(model.where_clause.unwrap().to_string(), "(a > 1)");
    assert_eq!(model.order_by.len(), 1);
    assert_eq!(model.order_by[0].0.token, "b");
    assert_eq!(model.order_by[0].1, Direction::Desc);

    let (lo, hi) = model.limit.unwrap();
    assert_eq!(lo.node_type, ExprNodeType::Constant);
    assert_eq!(lo.token, "10");
    assert!(hi.is_none());
}

#[test]
fn truncated_where_reports_end_of_input() {
    let text = "select a,b from t where";
    let err = parse_error(text);
    assert_eq!(err.position, text.len());
    assert_eq!(err.to_string(), format!("{} at position {}", err.message, text.len()));
}

#[test]
fn joined_query_with_analytic_column() {
    let arena = Bump::new();
    let text = "select sym, prev(price) p over (partition by sym) \
                from trades t latest by sym outer join quotes q on t.sym = q.sym";
    let Statement::Query(model) = Parser::new(text, &arena).parse_statement().unwrap() else {
        panic!("expected a query");
    };
    assert_eq!(model.alias, Some("t"));
    assert_eq!(model.columns[1].alias, Some("p"));
    assert_eq!(model.columns[1].expr.to_string(), "prev(price)");
    let analytic = model.columns[1].analytic.as_ref().unwrap();
    assert_eq!(analytic.partition_by[0].token, "sym");
    assert_eq!(model.joins.len(), 1);
    assert_eq!(model.joins[0].join_type, JoinType::Outer);
    assert_eq!(model.joins[0].model.journal(), Some("quotes"));
    assert_eq!(model.joins[0].criteria.unwrap().to_string(), "(t.sym = q.sym)");
    assert_eq!(model.latest_by.unwrap().token, "sym");
}

#[test]
fn created_journal_accepts_rows() {
    let arena = Bump::new();
    let text = "create journal quotes (sym SYMBOL index, bid DOUBLE, note STRING, ts DATE) \
                timestamp(ts) partition by DAY;";
    let Statement::CreateJournal(structure) = Parser::new(text, &arena).parse_statement().unwrap()
    else {
        panic!("expected create journal");
    };

    let factory = JournalFactory::new();
    let journal = factory.create_journal(&structure).unwrap();
    assert_eq!(journal.partition_by(), PartitionBy::Day);
    assert_eq!(journal.metadata().column_type(0), ColumnType::Symbol);
    assert_eq!(journal.metadata().timestamp_index(), Some(3));

    let mut writer = journal.writer().unwrap();
    writer
        .row(86_400_000)
        .unwrap()
        .put_sym(0, "EURUSD")
        .put_double(1, 1.25)
        .put_str(2, "first")
        .append()
        .unwrap();
    writer.commit();

    let mut source = JournalRecordSource::new(&factory, "quotes").unwrap();
    let cursor = source
        .prepare_cursor(&factory, &NeverCancelled::handler())
        .unwrap();
    let record = cursor.next().unwrap();
    assert_eq!(record.get_sym(0), Some("EURUSD"));
    assert_eq!(record.get_double(1), 1.25);
    assert_eq!(record.get_str(2), Some("first"));
    assert_eq!(record.get_date(3), 86_400_000);
    assert!(!cursor.has_next().unwrap());

    let err = factory.create_journal(&structure).unwrap_err();
    assert_eq!(err.to_string(), "Journal already exists: quotes");
}
