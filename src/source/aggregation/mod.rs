//! # Group-By Aggregation
//!
//! `AggregatedRecordSource` drains its input into a [`MultiMap`] keyed by the
//! group-by columns, folding every row into the group's value slots, then
//! replays the map:
//!
//! ```text
//! upstream row ──write_key──> MultiMap.get_or_create_values ──> aggregators.calculate
//!                                                                     │
//!            output: [key columns][value columns] <── map cursor <────┘
//! ```
//!
//! Groups come out in the order their first row was seen. SYMBOL keys are
//! output as STRING columns.
//!
//! ## Aggregators
//!
//! An [`AggregatorFunction`] appends its value slots during `prepare` and
//! updates them in `calculate`. Functions whose visible value is derived
//! from hidden slots hand the map an interceptor that finalizes it on read.

mod functions;

use std::sync::Arc;

use eyre::{bail, Result};
use tracing::debug;

use super::{CancellationHandler, NeverCancelled, RecordSource};
use crate::config::EngineConfig;
use crate::map::{write_key, KeyWriter, MapRecordValueInterceptor, MapValues, MultiMap};
use crate::records::{Record, RecordCursor, RecordMetadata, StorageFacade};
use crate::storage::JournalReaderFactory;
use crate::types::{ColumnMetadata, ColumnType};

pub use functions::{
    AvgAggregator, CountAggregator, FirstAggregator, LastAggregator, MaxAggregator, MinAggregator,
    SumAggregator,
};

/// One aggregate over the rows of a group.
pub trait AggregatorFunction {
    /// Resolves input columns and appends this function's value columns.
    /// `first_value_index` is the index its first column will have among
    /// the map's value columns.
    fn prepare(
        &mut self,
        metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()>;

    /// Folds `record` into the group's slots.
    fn calculate(&mut self, record: &dyn Record, values: &mut MapValues<'_>);

    fn interceptor(&self) -> Option<Box<dyn MapRecordValueInterceptor>> {
        None
    }
}

pub struct AggregatedRecordSource {
    delegate: Box<dyn RecordSource>,
    keys: Vec<(usize, ColumnType)>,
    aggregators: Vec<Box<dyn AggregatorFunction>>,
    map: MultiMap,
    key: KeyWriter,
    cancel: Arc<dyn CancellationHandler>,
}

impl AggregatedRecordSource {
    pub fn new(
        delegate: Box<dyn RecordSource>,
        key_column_names: &[&str],
        mut aggregators: Vec<Box<dyn AggregatorFunction>>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let metadata = Arc::clone(delegate.metadata());
        let mut keys = Vec::with_capacity(key_column_names.len());
        let mut key_columns = Vec::with_capacity(key_column_names.len());
        for name in key_column_names {
            let idx = metadata.column_index(name)?;
            keys.push((idx, metadata.column_type(idx)));
            key_columns.push(metadata.column(idx).clone());
        }

        let mut value_columns = Vec::new();
        let mut interceptors = Vec::new();
        for aggregator in &mut aggregators {
            let first = value_columns.len();
            aggregator.prepare(&metadata, &mut value_columns, first)?;
            if let Some(interceptor) = aggregator.interceptor() {
                interceptors.push(interceptor);
            }
        }

        Ok(Self {
            map: MultiMap::new(key_columns, value_columns, interceptors, config)?,
            delegate,
            keys,
            aggregators,
            key: KeyWriter::with_capacity(64),
            cancel: NeverCancelled::handler(),
        })
    }

    fn build_map(&mut self) -> Result<()> {
        let mut rows = 0usize;
        while self.delegate.has_next()? {
            self.cancel.check()?;
            let record = self.delegate.next()?;
            self.key.reset();
            for &(col, ty) in &self.keys {
                write_key(&mut self.key, record, col, ty);
            }
            let mut values = self.map.get_or_create_values(&self.key)?;
            for aggregator in &mut self.aggregators {
                aggregator.calculate(record, &mut values);
            }
            rows += 1;
        }
        self.map.to_top();
        debug!(groups = self.map.size(), rows, "built aggregation map");
        Ok(())
    }
}

impl RecordCursor for AggregatedRecordSource {
    fn has_next(&mut self) -> Result<bool> {
        self.map.has_next()
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.map.has_next()? {
            bail!("Aggregation has no more records");
        }
        self.map.next()
    }

    fn record(&self) -> &dyn Record {
        &self.map
    }

    fn get_by_row_id(&mut self, _row_id: i64) -> Result<&dyn Record> {
        bail!("Aggregated records do not support row id access")
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        self.map.storage_facade()
    }
}

impl RecordSource for AggregatedRecordSource {
    fn metadata(&self) -> &Arc<RecordMetadata> {
        self.map.metadata()
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn JournalReaderFactory,
        cancel: &Arc<dyn CancellationHandler>,
    ) -> Result<&mut dyn RecordCursor> {
        self.cancel = Arc::clone(cancel);
        self.delegate.prepare_cursor(factory, cancel)?;
        self.map.clear();
        self.build_map()?;
        Ok(self)
    }

    /// Clears the groups, rewinds the input and aggregates it again.
    fn reset(&mut self) -> Result<()> {
        self.delegate.reset()?;
        self.map.clear();
        self.build_map()
    }

    fn supports_row_id_access(&self) -> bool {
        false
    }
}
