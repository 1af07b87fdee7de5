//! # Record and Cursor Contracts
//!
//! Every row the engine produces is exposed through [`Record`], a typed
//! accessor indexed by column position. Implementations are flyweights: a
//! record is positioned over some backing storage (an arena entry, a buffered
//! row, a partition column set) and repositioned as its cursor advances.
//!
//! ## Getter Contract
//!
//! | Getter | Column types | Null value |
//! |--------|--------------|------------|
//! | `get_bool` | BOOLEAN | `false` |
//! | `get_byte` | BYTE | `0` |
//! | `get_short` | SHORT | `0` |
//! | `get_int` | INT, SYMBOL (dictionary key) | `i32::MIN` |
//! | `get_long` | LONG | `i64::MIN` |
//! | `get_float` / `get_double` | FLOAT / DOUBLE | NaN |
//! | `get_date` | DATE | `i64::MIN` |
//! | `get_str` | STRING | `None` |
//! | `get_sym` | SYMBOL (resolved through the storage facade) | `None` |
//! | `get_bin` | BINARY | `None` |
//!
//! Calling a getter on a column of another type is a code-generation bug;
//! implementations check it with `debug_assert!` only.
//!
//! ## Cursor Protocol
//!
//! ```text
//! prepare_cursor ──> has_next? ──yes──> next() ──> &dyn Record
//!                       │  ▲                           │
//!                       │  └───────────────────────────┘
//!                       no
//!                       ▼
//!                    exhausted (reset() re-primes)
//! ```
//!
//! The reference returned by `next()` borrows the cursor, so a row cannot be
//! held across the next advance; copy values out with
//! [`OwnedValue`](crate::types::OwnedValue) when they must outlive the row.

use std::sync::Arc;

use eyre::Result;

use super::{BinarySequence, StorageFacade};

/// Typed accessor over one row.
pub trait Record {
    fn get_bool(&self, col: usize) -> bool;

    fn get_byte(&self, col: usize) -> i8;

    fn get_short(&self, col: usize) -> i16;

    /// INT value, or the dictionary key of a SYMBOL column.
    fn get_int(&self, col: usize) -> i32;

    fn get_long(&self, col: usize) -> i64;

    fn get_float(&self, col: usize) -> f32;

    fn get_double(&self, col: usize) -> f64;

    /// Epoch milliseconds.
    fn get_date(&self, col: usize) -> i64;

    fn get_str(&self, col: usize) -> Option<&str>;

    fn get_sym(&self, col: usize) -> Option<&str>;

    /// Lazy view over a binary value; no bytes are copied until read.
    fn get_bin(&self, col: usize) -> Option<BinarySequence<'_>>;

    /// Stable handle for re-reading this row through `get_by_row_id`, or -1
    /// when the row has no single backing location.
    fn row_id(&self) -> i64;
}

/// Forward-only iterator over records with optional random access.
pub trait RecordCursor {
    /// Advances internal state as needed and reports whether `next` has a row.
    fn has_next(&mut self) -> Result<bool>;

    /// Positions the cursor's flyweight on the next row.
    fn next(&mut self) -> Result<&dyn Record>;

    /// The flyweight as left by the last `next` or `get_by_row_id`.
    fn record(&self) -> &dyn Record;

    /// Repositions the flyweight on `row_id`. Sources without row identity
    /// return an error.
    fn get_by_row_id(&mut self, row_id: i64) -> Result<&dyn Record>;

    /// Symbol resolver for the rows this cursor produces.
    fn storage_facade(&self) -> Arc<dyn StorageFacade>;
}
