//! # Row Layout
//!
//! `RowLayout` pre-computes where each column lives inside a materialized
//! row so per-row reads and writes are plain offset arithmetic.
//!
//! ## Layout Internals
//!
//! ```text
//! +----------------------------------+-------------------------------+
//! | fixed region (padded to 8)       | var header (8 bytes / column) |
//! | BOOLEAN/BYTE 1, SHORT 2,         | arena offset of each STRING / |
//! | INT/SYMBOL/FLOAT 4, LONG/...  8  | BINARY payload                |
//! +----------------------------------+-------------------------------+
//! ```
//!
//! - `offsets[col]`: byte offset in the fixed region, or the var-header slot
//!   offset (relative to the start of the header) for variable columns
//! - `fixed_size`: fixed region size, rounded up to 8
//! - `header_size`: 8 bytes per variable column

use crate::config::VAR_HEADER_SLOT_SIZE;
use crate::types::ColumnType;

use super::RecordMetadata;

#[derive(Debug, Clone)]
pub struct RowLayout {
    pub(crate) types: Vec<ColumnType>,
    pub(crate) offsets: Vec<usize>,
    pub(crate) fixed_size: usize,
    pub(crate) header_size: usize,
}

impl RowLayout {
    pub fn new(metadata: &RecordMetadata) -> Self {
        let types: Vec<ColumnType> = metadata.columns().iter().map(|c| c.column_type()).collect();
        let mut offsets = Vec::with_capacity(types.len());
        let mut fixed = 0;
        let mut var = 0;

        for ty in &types {
            if ty.is_fixed() {
                offsets.push(fixed);
                fixed += ty.size();
            } else {
                offsets.push(var * VAR_HEADER_SLOT_SIZE);
                var += 1;
            }
        }

        Self {
            types,
            offsets,
            fixed_size: fixed.next_multiple_of(8),
            header_size: var * VAR_HEADER_SLOT_SIZE,
        }
    }

    pub fn column_count(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn column_type(&self, col: usize) -> ColumnType {
        self.types[col]
    }

    pub fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    pub fn has_var_columns(&self) -> bool {
        self.header_size > 0
    }

    /// Bytes of one row excluding variable payloads.
    pub fn row_size(&self) -> usize {
        self.fixed_size + self.header_size
    }

    #[inline]
    pub fn offset(&self, col: usize) -> usize {
        self.offsets[col]
    }
}
