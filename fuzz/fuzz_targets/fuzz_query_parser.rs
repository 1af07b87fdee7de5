//! Fuzz testing for the query parser.
//!
//! Feeds arbitrary text to the parser. Every input must either parse or
//! fail with a `ParseError` whose position lies inside the input; the
//! parser must never panic.

#![no_main]

use bumpalo::Bump;
use libfuzzer_sys::fuzz_target;

use journaldb::sql::{ParseError, Parser, Statement};

fuzz_target!(|text: &str| {
    let arena = Bump::new();
    match Parser::new(text, &arena).parse_statement() {
        Ok(Statement::Query(model)) => {
            for column in &model.columns {
                let _ = column.expr.to_string();
            }
            if let Some(clause) = model.where_clause {
                let _ = clause.to_string();
            }
        }
        Ok(Statement::CreateJournal(structure)) => {
            let _ = structure.to_metadata();
        }
        Err(report) => {
            let err = report
                .downcast_ref::<ParseError>()
                .expect("parser errors are ParseError");
            assert!(err.position <= text.len());
        }
    }
});
