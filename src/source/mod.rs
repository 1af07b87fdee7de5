//! # Record Sources - Pull-Based Query Operators
//!
//! Every query pipeline is a tree of [`RecordSource`]s. A source is a
//! [`RecordCursor`] that also knows its output metadata and how to prepare
//! itself against journal storage:
//!
//! ```text
//! AggregatedRecordSource / AnalyticRecordSource / SelectedColumnsRecordSource
//!     └── HashJoinRecordSource
//!             ├── IntervalRecordSource
//!             │       └── JournalRecordSource ──> JournalPartitionSource
//!             └── JournalRecordSource
//! ```
//!
//! ## Lifecycle
//!
//! 1. Construct the tree. Output metadata is fixed at construction.
//! 2. `prepare_cursor(factory, cancel)` opens readers and, for blocking
//!    operators, drains their inputs. It returns the source as a cursor.
//! 3. Pull rows with `has_next` / `next`. A row borrows the cursor and is
//!    invalid after the next advance.
//! 4. `reset()` rewinds the tree so it can be replayed.
//!
//! ## Blocking Behaviour
//!
//! | Source | Blocking | Row ids |
//! |--------|----------|---------|
//! | `JournalRecordSource` | no | yes |
//! | `IntervalRecordSource` | no | pass-through |
//! | `SelectedColumnsRecordSource` | no | pass-through |
//! | `HashJoinRecordSource` | build side only | no |
//! | `AggregatedRecordSource` | fully | no |
//! | `AnalyticRecordSource` | no | pass-through |
//!
//! ## Cancellation
//!
//! Sources that loop over many rows inside one call poll a
//! [`CancellationHandler`] once per row. A tripped handler fails the call
//! with [`QueryCancelled`].

pub mod aggregation;
pub mod analytic;
pub mod interval;
pub mod join;
pub mod journal;
pub mod select;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{bail, Result};

use crate::records::{BinarySequence, Record, RecordCursor, RecordMetadata};
use crate::storage::JournalReaderFactory;
use crate::types::{DATE_NULL, INT_NULL, LONG_NULL};

pub use aggregation::{
    AggregatedRecordSource, AggregatorFunction, AvgAggregator, CountAggregator, FirstAggregator,
    LastAggregator, MaxAggregator, MinAggregator, SumAggregator,
};
pub use analytic::{AnalyticFunction, AnalyticRecordSource, PrevRowAnalyticFunction};
pub use interval::{Interval, IntervalRecordSource, IntervalSource, ListIntervalSource};
pub use join::HashJoinRecordSource;
pub use journal::{JournalPartitionSource, JournalRecordSource, PartitionSlice};
pub use select::SelectedColumnsRecordSource;

/// A query operator: a restartable cursor with fixed output metadata.
pub trait RecordSource: RecordCursor {
    fn metadata(&self) -> &Arc<RecordMetadata>;

    /// Opens inputs and readies the first row.
    fn prepare_cursor(
        &mut self,
        factory: &dyn JournalReaderFactory,
        cancel: &Arc<dyn CancellationHandler>,
    ) -> Result<&mut dyn RecordCursor>;

    /// Rewinds the source and everything below it.
    fn reset(&mut self) -> Result<()>;

    fn supports_row_id_access(&self) -> bool;
}

/// Raised when a query is cancelled between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCancelled;

impl std::fmt::Display for QueryCancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Query was cancelled")
    }
}

impl std::error::Error for QueryCancelled {}

/// Cooperative cancellation check, polled once per input row.
pub trait CancellationHandler: Send + Sync {
    fn check(&self) -> Result<()>;
}

/// Handler that never trips.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancelled;

impl NeverCancelled {
    pub fn handler() -> Arc<dyn CancellationHandler> {
        Arc::new(NeverCancelled)
    }
}

impl CancellationHandler for NeverCancelled {
    #[inline]
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Handler tripped by `cancel()`, possibly from another thread.
#[derive(Debug, Default, Clone)]
pub struct AtomicCancellationHandler {
    cancelled: Arc<AtomicBool>,
}

impl AtomicCancellationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl CancellationHandler for AtomicCancellationHandler {
    #[inline]
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            bail!(QueryCancelled);
        }
        Ok(())
    }
}

/// Row of nulls for every column type, used for outer-join padding.
pub(crate) struct NullRecord;

impl Record for NullRecord {
    fn get_bool(&self, _col: usize) -> bool {
        false
    }

    fn get_byte(&self, _col: usize) -> i8 {
        0
    }

    fn get_short(&self, _col: usize) -> i16 {
        0
    }

    fn get_int(&self, _col: usize) -> i32 {
        INT_NULL
    }

    fn get_long(&self, _col: usize) -> i64 {
        LONG_NULL
    }

    fn get_float(&self, _col: usize) -> f32 {
        f32::NAN
    }

    fn get_double(&self, _col: usize) -> f64 {
        f64::NAN
    }

    fn get_date(&self, _col: usize) -> i64 {
        DATE_NULL
    }

    fn get_str(&self, _col: usize) -> Option<&str> {
        None
    }

    fn get_sym(&self, _col: usize) -> Option<&str> {
        None
    }

    fn get_bin(&self, _col: usize) -> Option<BinarySequence<'_>> {
        None
    }

    fn row_id(&self) -> i64 {
        -1
    }
}
