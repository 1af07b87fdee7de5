//! # Query Language
//!
//! Text to [`Statement`]: a zero-copy [`Lexer`] feeds a [`Parser`] that
//! allocates expression nodes in a caller-provided `bumpalo::Bump`.
//!
//! ```text
//! "select a, b from t where a > 1"
//!      │
//!   Lexer ──> Token<'a> ──> Parser ──> Statement::Query(QueryModel)
//!                                      Statement::CreateJournal(JournalStructure)
//! ```
//!
//! The model is a description of the query; wiring it to record sources is
//! up to the caller.
//!
//! ```ignore
//! use bumpalo::Bump;
//! use journaldb::sql::{Parser, Statement};
//!
//! let arena = Bump::new();
//! let statement = Parser::new("select a from t where a > 1", &arena).parse_statement()?;
//! if let Statement::Query(model) = statement {
//!     assert_eq!(model.journal(), Some("t"));
//! }
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    AnalyticSpec, ColumnStructure, Direction, ExprNode, ExprNodeType, JoinModel, JoinType,
    JournalStructure, QueryColumn, QueryModel, Statement,
};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser, COLUMN_ALIAS_STOP, JOURNAL_ALIAS_STOP};
pub use token::{Span, Token};
