//! # Query Model
//!
//! Parser output. Expression nodes live in the caller's `bumpalo::Bump` and
//! borrow their text from the query; the clause structure around them is
//! plain owned data.
//!
//! ```text
//! Statement
//! ├── Query(QueryModel)
//! │     ├── columns: [QueryColumn { expr, alias, analytic }]
//! │     ├── journal_name | nested
//! │     ├── joins: [JoinModel { join_type, model, criteria }]
//! │     └── where / sample by / order by / limit
//! └── CreateJournal(JournalStructure)
//!       └── columns: [ColumnStructure { name, column_type, indexed, buckets }]
//! ```
//!
//! ## Expression Nodes
//!
//! | Type | `token` | `args` |
//! |------|---------|--------|
//! | `Literal` | column or journal name, dotted names joined | none |
//! | `Constant` | number, quoted string (quotes kept), `null`, `true`, `false` | none |
//! | `Operation` | operator, lower-cased for `and`/`or`/`not`/`in` | operands, `in` lists follow the probe |
//! | `Function` | function name | call arguments |

use std::fmt;

use eyre::Result;

use crate::config::{DEFAULT_BINARY_AVG_SIZE, DEFAULT_STRING_AVG_SIZE};
use crate::records::RecordMetadata;
use crate::storage::PartitionBy;
use crate::types::{ColumnMetadata, ColumnType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprNodeType {
    Literal,
    Constant,
    Operation,
    Function,
}

#[derive(Debug, PartialEq)]
pub struct ExprNode<'a> {
    pub node_type: ExprNodeType,
    pub token: &'a str,
    pub args: &'a [&'a ExprNode<'a>],
    /// Byte offset of the node's first token.
    pub position: usize,
}

impl<'a> ExprNode<'a> {
    pub fn is_literal(&self) -> bool {
        self.node_type == ExprNodeType::Literal
    }

    pub fn lhs(&self) -> Option<&'a ExprNode<'a>> {
        self.args.first().copied()
    }

    pub fn rhs(&self) -> Option<&'a ExprNode<'a>> {
        self.args.get(1).copied()
    }
}

/// Renders operations fully parenthesized, e.g. `((a + 1) > b)`.
impl fmt::Display for ExprNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node_type {
            ExprNodeType::Literal | ExprNodeType::Constant => f.write_str(self.token),
            ExprNodeType::Function => {
                write!(f, "{}(", self.token)?;
                write_list(f, self.args)?;
                f.write_str(")")
            }
            ExprNodeType::Operation => match self.args {
                [operand] if self.token == "-" => write!(f, "-{}", operand),
                [operand] => write!(f, "{} {}", self.token, operand),
                [probe, list @ ..] if self.token == "in" => {
                    write!(f, "({} in (", probe)?;
                    write_list(f, list)?;
                    f.write_str("))")
                }
                [lhs, rhs] => write!(f, "({} {} {})", lhs, self.token, rhs),
                _ => f.write_str(self.token),
            },
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, nodes: &[&ExprNode<'_>]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Outer,
    Cross,
    Asof,
}

/// `over (partition by .. order by ..)` of an analytic column.
#[derive(Debug, Default, PartialEq)]
pub struct AnalyticSpec<'a> {
    pub partition_by: Vec<&'a ExprNode<'a>>,
    pub order_by: Vec<(&'a ExprNode<'a>, Direction)>,
}

#[derive(Debug, PartialEq)]
pub struct QueryColumn<'a> {
    pub expr: &'a ExprNode<'a>,
    pub alias: Option<&'a str>,
    pub analytic: Option<AnalyticSpec<'a>>,
}

#[derive(Debug, PartialEq)]
pub struct JoinModel<'a> {
    pub join_type: JoinType,
    pub model: QueryModel<'a>,
    pub criteria: Option<&'a ExprNode<'a>>,
}

#[derive(Debug, Default, PartialEq)]
pub struct QueryModel<'a> {
    pub columns: Vec<QueryColumn<'a>>,
    pub journal_name: Option<&'a ExprNode<'a>>,
    pub alias: Option<&'a str>,
    pub nested: Option<Box<QueryModel<'a>>>,
    pub timestamp: Option<&'a ExprNode<'a>>,
    pub latest_by: Option<&'a ExprNode<'a>>,
    pub joins: Vec<JoinModel<'a>>,
    pub where_clause: Option<&'a ExprNode<'a>>,
    pub sample_by: Option<&'a ExprNode<'a>>,
    pub order_by: Vec<(&'a ExprNode<'a>, Direction)>,
    /// `limit lo[, hi]`.
    pub limit: Option<(&'a ExprNode<'a>, Option<&'a ExprNode<'a>>)>,
}

impl QueryModel<'_> {
    /// Journal name, or `None` for a nested query.
    pub fn journal(&self) -> Option<&str> {
        self.journal_name.map(|n| n.token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnStructure<'a> {
    pub name: &'a str,
    pub column_type: ColumnType,
    pub indexed: bool,
    pub buckets: Option<usize>,
}

/// Schema of a `create journal` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalStructure<'a> {
    pub name: &'a str,
    pub columns: Vec<ColumnStructure<'a>>,
    pub timestamp: Option<&'a str>,
    pub partition_by: PartitionBy,
}

impl JournalStructure<'_> {
    /// Builds journal metadata; `buckets` becomes the distinct count hint.
    pub fn to_metadata(&self) -> Result<RecordMetadata> {
        let mut builder = RecordMetadata::builder();
        for column in &self.columns {
            let mut meta = ColumnMetadata::new(column.name, column.column_type)
                .with_indexed(column.indexed);
            match column.column_type {
                ColumnType::String => meta = meta.with_avg_size(DEFAULT_STRING_AVG_SIZE),
                ColumnType::Binary => meta = meta.with_avg_size(DEFAULT_BINARY_AVG_SIZE),
                _ => {}
            }
            if let Some(buckets) = column.buckets {
                meta = meta.with_distinct_count_hint(buckets);
            }
            builder = builder.add(meta);
        }
        if let Some(timestamp) = self.timestamp {
            builder = builder.timestamp(timestamp);
        }
        builder.build()
    }
}

#[derive(Debug, PartialEq)]
pub enum Statement<'a> {
    Query(QueryModel<'a>),
    CreateJournal(JournalStructure<'a>),
}
