//! # Column Metadata
//!
//! `ColumnMetadata` pairs a [`ColumnType`] with the sizing hints storage and
//! indexing need:
//!
//! - `size`: byte width for fixed types, the per-value budget for STRING
//! - `avg_size`: expected payload size of variable-width values
//! - `indexed` / `distinct_count_hint`: symbol table and index bucket sizing
//!
//! ## Usage
//!
//! ```ignore
//! use journaldb::types::{ColumnMetadata, ColumnType};
//!
//! let ts = ColumnMetadata::new("timestamp", ColumnType::Date);
//! let sym = ColumnMetadata::new("sym", ColumnType::Symbol).with_indexed(true);
//! ```

use super::ColumnType;

/// Name, type and sizing of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    name: String,
    column_type: ColumnType,
    size: usize,
    avg_size: usize,
    indexed: bool,
    distinct_count_hint: usize,
}

impl ColumnMetadata {
    /// Creates a column whose `size` is the type's fixed width.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            size: column_type.size(),
            avg_size: 0,
            indexed: false,
            distinct_count_hint: 0,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_avg_size(mut self, avg_size: usize) -> Self {
        self.avg_size = avg_size;
        self
    }

    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn with_distinct_count_hint(mut self, hint: usize) -> Self {
        self.distinct_count_hint = hint;
        self
    }

    /// Same column under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn avg_size(&self) -> usize {
        self.avg_size
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn distinct_count_hint(&self) -> usize {
        self.distinct_count_hint
    }

    pub(crate) fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub(crate) fn set_distinct_count_hint(&mut self, hint: usize) {
        self.distinct_count_hint = hint;
    }
}
