//! # Record Metadata
//!
//! `RecordMetadata` is the ordered column list every component agrees on,
//! plus the optional designated timestamp column used by interval filtering
//! and "latest by". It is immutable after construction and shared as
//! `Arc<RecordMetadata>`.
//!
//! ## Builder Defaults
//!
//! [`RecordMetadataBuilder`] derives sizing hints the way journal storage
//! expects them:
//!
//! | Column | Rule |
//! |--------|------|
//! | STRING | `size = avg_size + 4` (`avg_size` defaults to `DEFAULT_STRING_AVG_SIZE`) |
//! | BINARY | `size = avg_size`; both zero is an error |
//! | SYMBOL | `distinct_count_hint = ceil_pow2(record_count_hint * 0.2) - 1` when unset |
//! | indexed | hint below 2 becomes `ceil_pow2(max(2, record_count_hint * 0.01)) - 1` |
//!
//! ## Usage
//!
//! ```ignore
//! let metadata = RecordMetadata::builder()
//!     .column("sym", ColumnType::Symbol).indexed()
//!     .column("price", ColumnType::Double)
//!     .column("timestamp", ColumnType::Date)
//!     .timestamp("timestamp")
//!     .build()?;
//! ```

use eyre::{bail, ensure, eyre, Result};
use hashbrown::HashMap;

use crate::config::{DEFAULT_RECORD_COUNT_HINT, DEFAULT_STRING_AVG_SIZE, MIN_INDEX_BUCKETS};
use crate::types::{ColumnMetadata, ColumnType};

/// Ordered, immutable description of a row.
#[derive(Debug, Clone)]
pub struct RecordMetadata {
    columns: Vec<ColumnMetadata>,
    timestamp_index: Option<usize>,
    by_name: HashMap<String, usize>,
}

impl RecordMetadata {
    /// Wraps `columns` as-is. Names must be unique.
    pub fn new(columns: Vec<ColumnMetadata>, timestamp_index: Option<usize>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if by_name.insert(column.name().to_owned(), idx).is_some() {
                bail!("Duplicate column name: {}", column.name());
            }
        }

        if let Some(ts) = timestamp_index {
            let column = columns
                .get(ts)
                .ok_or_else(|| eyre!("timestamp index {} out of range", ts))?;
            ensure!(
                column.column_type() == ColumnType::Date,
                "timestamp column {} must be DATE, found {}",
                column.name(),
                column.column_type()
            );
        }

        Ok(Self {
            columns,
            timestamp_index,
            by_name,
        })
    }

    pub fn builder() -> RecordMetadataBuilder {
        RecordMetadataBuilder::new()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> &ColumnMetadata {
        &self.columns[idx]
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    #[inline]
    pub fn column_type(&self, idx: usize) -> ColumnType {
        self.columns[idx].column_type()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.column_index_quiet(name)
            .ok_or_else(|| eyre!("Invalid column name: {}", name))
    }

    pub fn column_index_quiet(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn timestamp_index(&self) -> Option<usize> {
        self.timestamp_index
    }
}

/// Builder deriving storage hints for a journal schema.
#[derive(Debug)]
pub struct RecordMetadataBuilder {
    columns: Vec<ColumnMetadata>,
    timestamp: Option<String>,
    record_count_hint: usize,
    error: Option<String>,
}

impl Default for RecordMetadataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordMetadataBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            timestamp: None,
            record_count_hint: DEFAULT_RECORD_COUNT_HINT,
            error: None,
        }
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        let mut column = ColumnMetadata::new(name, column_type);
        if column_type == ColumnType::String {
            column = column.with_avg_size(DEFAULT_STRING_AVG_SIZE);
        }
        self.columns.push(column);
        self
    }

    /// Appends a fully described column.
    pub fn add(mut self, column: ColumnMetadata) -> Self {
        self.columns.push(column);
        self
    }

    /// Marks the most recently added column as indexed.
    pub fn indexed(self) -> Self {
        self.modify_last("indexed", |c| c.with_indexed(true))
    }

    pub fn size(self, size: usize) -> Self {
        self.modify_last("size", |c| c.with_size(size))
    }

    pub fn avg_size(self, avg_size: usize) -> Self {
        self.modify_last("avg_size", |c| c.with_avg_size(avg_size))
    }

    pub fn distinct_count_hint(self, hint: usize) -> Self {
        self.modify_last("distinct_count_hint", |c| c.with_distinct_count_hint(hint))
    }

    pub fn timestamp(mut self, name: impl Into<String>) -> Self {
        self.timestamp = Some(name.into());
        self
    }

    pub fn record_count_hint(mut self, hint: usize) -> Self {
        self.record_count_hint = hint;
        self
    }

    pub fn build(self) -> Result<RecordMetadata> {
        if let Some(error) = self.error {
            bail!(error);
        }

        let hint = self.record_count_hint;
        let mut columns = self.columns;
        for column in &mut columns {
            if column.is_indexed() && column.distinct_count_hint() < MIN_INDEX_BUCKETS {
                let buckets = ((hint as f64 * 0.01) as usize).max(MIN_INDEX_BUCKETS);
                column.set_distinct_count_hint(buckets.next_power_of_two() - 1);
            }

            if column.size() == 0 && column.avg_size() == 0 {
                bail!("Invalid size for column {}", column.name());
            }

            if column.distinct_count_hint() < 1 && column.column_type() == ColumnType::Symbol {
                let distinct = ((hint as f64 * 0.2) as usize).max(1);
                column.set_distinct_count_hint(distinct.next_power_of_two() - 1);
            }

            match column.column_type() {
                ColumnType::String => column.set_size(column.avg_size() + 4),
                ColumnType::Binary => column.set_size(column.avg_size()),
                _ => {}
            }
        }

        let timestamp_index = match self.timestamp {
            Some(name) => Some(
                columns
                    .iter()
                    .position(|c| c.name() == name)
                    .ok_or_else(|| eyre!("Invalid column name: {}", name))?,
            ),
            None => None,
        };

        RecordMetadata::new(columns, timestamp_index)
    }

    fn modify_last(
        mut self,
        what: &str,
        f: impl FnOnce(ColumnMetadata) -> ColumnMetadata,
    ) -> Self {
        match self.columns.pop() {
            Some(column) => self.columns.push(f(column)),
            None => {
                self.error
                    .get_or_insert_with(|| format!("{} set before any column was added", what));
            }
        }
        self
    }
}
