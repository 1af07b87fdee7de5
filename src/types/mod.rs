//! # Type System
//!
//! Storage types, column descriptors and owned values shared by every layer
//! of the engine.
//!
//! ## Module Structure
//!
//! - `column_type`: `ColumnType` discriminant and null sentinels
//! - `column`: `ColumnMetadata` with sizing and indexing hints
//! - `owned_value`: `OwnedValue`, a heap-owned copy of one column value
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `ColumnType` | Storage-level type discriminant |
//! | `ColumnMetadata` | Column name, type and sizing |
//! | `OwnedValue` | Value copied out of a flyweight record |

mod column;
mod column_type;
mod owned_value;

pub use column::ColumnMetadata;
pub use column_type::{ColumnType, DATE_NULL, INT_NULL, LONG_NULL, SYMBOL_NULL_KEY};
pub use owned_value::OwnedValue;
