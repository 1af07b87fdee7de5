//! # Analytic (Window) Functions
//!
//! `AnalyticRecordSource` streams its input unchanged and appends one column
//! per [`AnalyticFunction`]. For every input row each function is handed the
//! row before the combined row is exposed:
//!
//! ```text
//! delegate.next() ──> f0.add_record(row) ──> f1.add_record(row) ──> [row cols][f0][f1]
//! ```
//!
//! Functions keep whatever per-partition state they need; `reset` discards it
//! so a replay produces the same output.
//!
//! Function columns without an alias are named `col{i}`, `i` being the
//! function's position.
//!
//! Row id access is not supported: function values only exist for the row
//! just streamed.

mod prev;

use std::sync::Arc;

use eyre::{bail, Result};

use super::{CancellationHandler, NeverCancelled, RecordSource};
use crate::config::EngineConfig;
use crate::records::{
    BinarySequence, Record, RecordCursor, RecordMetadata, RemappedStorageFacade, StorageFacade,
};
use crate::storage::JournalReaderFactory;
use crate::types::ColumnMetadata;

pub use prev::PrevRowAnalyticFunction;

/// A function computed over the preceding rows of a window partition.
pub trait AnalyticFunction {
    /// Resolves columns against the input and allocates partition state.
    fn prepare(&mut self, metadata: &RecordMetadata, config: &EngineConfig) -> Result<()>;

    /// Binds the resolver for SYMBOL values read from the input.
    fn set_storage_facade(&mut self, facade: Arc<dyn StorageFacade>);

    /// Output column; an empty name asks the source to generate one.
    fn column(&self) -> ColumnMetadata;

    /// Input column whose symbol table resolves this function's SYMBOL output.
    fn symbol_source(&self) -> Option<usize> {
        None
    }

    /// Computes the output for `record` and folds it into partition state.
    fn add_record(&mut self, record: &dyn Record) -> Result<()>;

    fn get_bool(&self) -> bool;
    fn get_byte(&self) -> i8;
    fn get_short(&self) -> i16;
    fn get_int(&self) -> i32;
    fn get_long(&self) -> i64;
    fn get_float(&self) -> f32;
    fn get_double(&self) -> f64;
    fn get_date(&self) -> i64;
    fn get_str(&self) -> Option<&str>;
    fn get_sym(&self) -> Option<&str>;

    fn get_bin(&self) -> Option<BinarySequence<'_>> {
        None
    }

    /// Drops all partition state.
    fn reset(&mut self);
}

pub struct AnalyticRecordSource {
    delegate: Box<dyn RecordSource>,
    functions: Vec<Box<dyn AnalyticFunction>>,
    metadata: Arc<RecordMetadata>,
    split: usize,
    cancel: Arc<dyn CancellationHandler>,
}

impl AnalyticRecordSource {
    pub fn new(
        delegate: Box<dyn RecordSource>,
        mut functions: Vec<Box<dyn AnalyticFunction>>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let input = Arc::clone(delegate.metadata());
        let mut columns = input.columns().to_vec();
        for (i, function) in functions.iter_mut().enumerate() {
            function.prepare(&input, config)?;
            let column = function.column();
            if column.name().is_empty() {
                columns.push(column.renamed(format!("col{}", i)));
            } else {
                columns.push(column);
            }
        }
        Ok(Self {
            split: input.column_count(),
            metadata: Arc::new(RecordMetadata::new(columns, input.timestamp_index())?),
            delegate,
            functions,
            cancel: NeverCancelled::handler(),
        })
    }

    fn bind_facade(&mut self) {
        let facade = self.delegate.storage_facade();
        for function in &mut self.functions {
            function.set_storage_facade(Arc::clone(&facade));
        }
    }
}

impl RecordCursor for AnalyticRecordSource {
    fn has_next(&mut self) -> Result<bool> {
        self.delegate.has_next()
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.delegate.has_next()? {
            bail!("Analytic source has no more records");
        }
        self.cancel.check()?;
        let record = self.delegate.next()?;
        for function in &mut self.functions {
            function.add_record(record)?;
        }
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn get_by_row_id(&mut self, _row_id: i64) -> Result<&dyn Record> {
        bail!("Analytic records do not support row id access")
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        let mapping = (0..self.split)
            .map(|c| Some((0, c)))
            .chain(self.functions.iter().map(|f| f.symbol_source().map(|c| (0, c))))
            .collect();
        Arc::new(RemappedStorageFacade::new(
            vec![self.delegate.storage_facade()],
            mapping,
        ))
    }
}

impl Record for AnalyticRecordSource {
    fn get_bool(&self, col: usize) -> bool {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_bool(col),
            Some(f) => self.functions[f].get_bool(),
        }
    }

    fn get_byte(&self, col: usize) -> i8 {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_byte(col),
            Some(f) => self.functions[f].get_byte(),
        }
    }

    fn get_short(&self, col: usize) -> i16 {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_short(col),
            Some(f) => self.functions[f].get_short(),
        }
    }

    fn get_int(&self, col: usize) -> i32 {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_int(col),
            Some(f) => self.functions[f].get_int(),
        }
    }

    fn get_long(&self, col: usize) -> i64 {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_long(col),
            Some(f) => self.functions[f].get_long(),
        }
    }

    fn get_float(&self, col: usize) -> f32 {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_float(col),
            Some(f) => self.functions[f].get_float(),
        }
    }

    fn get_double(&self, col: usize) -> f64 {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_double(col),
            Some(f) => self.functions[f].get_double(),
        }
    }

    fn get_date(&self, col: usize) -> i64 {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_date(col),
            Some(f) => self.functions[f].get_date(),
        }
    }

    fn get_str(&self, col: usize) -> Option<&str> {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_str(col),
            Some(f) => self.functions[f].get_str(),
        }
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_sym(col),
            Some(f) => self.functions[f].get_sym(),
        }
    }

    fn get_bin(&self, col: usize) -> Option<BinarySequence<'_>> {
        match col.checked_sub(self.split) {
            None => self.delegate.record().get_bin(col),
            Some(f) => self.functions[f].get_bin(),
        }
    }

    fn row_id(&self) -> i64 {
        self.delegate.record().row_id()
    }
}

impl RecordSource for AnalyticRecordSource {
    fn metadata(&self) -> &Arc<RecordMetadata> {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn JournalReaderFactory,
        cancel: &Arc<dyn CancellationHandler>,
    ) -> Result<&mut dyn RecordCursor> {
        self.cancel = Arc::clone(cancel);
        self.delegate.prepare_cursor(factory, cancel)?;
        for function in &mut self.functions {
            function.reset();
        }
        self.bind_facade();
        Ok(self)
    }

    fn reset(&mut self) -> Result<()> {
        self.delegate.reset()?;
        for function in &mut self.functions {
            function.reset();
        }
        self.bind_facade();
        Ok(())
    }

    /// Function columns depend on the rows streamed before, so a row
    /// fetched out of order has no defined value for them.
    fn supports_row_id_access(&self) -> bool {
        false
    }
}
