//! Projection by column names.

use std::sync::Arc;

use eyre::{bail, Result};

use super::{CancellationHandler, RecordSource};
use crate::records::{
    BinarySequence, Record, RecordCursor, RecordMetadata, RemappedStorageFacade, StorageFacade,
};
use crate::storage::JournalReaderFactory;

/// Exposes a subset of the delegate's columns, in the requested order.
pub struct SelectedColumnsRecordSource {
    delegate: Box<dyn RecordSource>,
    metadata: Arc<RecordMetadata>,
    mapping: Vec<usize>,
}

impl SelectedColumnsRecordSource {
    pub fn new(delegate: Box<dyn RecordSource>, names: &[&str]) -> Result<Self> {
        let source_meta = Arc::clone(delegate.metadata());
        let mut mapping = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let idx = source_meta.column_index(name)?;
            mapping.push(idx);
            columns.push(source_meta.column(idx).clone());
        }
        let timestamp_index = source_meta
            .timestamp_index()
            .and_then(|ts| mapping.iter().position(|&c| c == ts));
        Ok(Self {
            delegate,
            metadata: Arc::new(RecordMetadata::new(columns, timestamp_index)?),
            mapping,
        })
    }
}

impl RecordCursor for SelectedColumnsRecordSource {
    fn has_next(&mut self) -> Result<bool> {
        self.delegate.has_next()
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.delegate.has_next()? {
            bail!("Selection has no more records");
        }
        self.delegate.next()?;
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn get_by_row_id(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.delegate.get_by_row_id(row_id)?;
        Ok(self)
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        Arc::new(RemappedStorageFacade::new(
            vec![self.delegate.storage_facade()],
            self.mapping.iter().map(|&c| Some((0, c))).collect(),
        ))
    }
}

impl Record for SelectedColumnsRecordSource {
    fn get_bool(&self, col: usize) -> bool {
        self.delegate.record().get_bool(self.mapping[col])
    }

    fn get_byte(&self, col: usize) -> i8 {
        self.delegate.record().get_byte(self.mapping[col])
    }

    fn get_short(&self, col: usize) -> i16 {
        self.delegate.record().get_short(self.mapping[col])
    }

    fn get_int(&self, col: usize) -> i32 {
        self.delegate.record().get_int(self.mapping[col])
    }

    fn get_long(&self, col: usize) -> i64 {
        self.delegate.record().get_long(self.mapping[col])
    }

    fn get_float(&self, col: usize) -> f32 {
        self.delegate.record().get_float(self.mapping[col])
    }

    fn get_double(&self, col: usize) -> f64 {
        self.delegate.record().get_double(self.mapping[col])
    }

    fn get_date(&self, col: usize) -> i64 {
        self.delegate.record().get_date(self.mapping[col])
    }

    fn get_str(&self, col: usize) -> Option<&str> {
        self.delegate.record().get_str(self.mapping[col])
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        self.delegate.record().get_sym(self.mapping[col])
    }

    fn get_bin(&self, col: usize) -> Option<BinarySequence<'_>> {
        self.delegate.record().get_bin(self.mapping[col])
    }

    fn row_id(&self) -> i64 {
        self.delegate.record().row_id()
    }
}

impl RecordSource for SelectedColumnsRecordSource {
    fn metadata(&self) -> &Arc<RecordMetadata> {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn JournalReaderFactory,
        cancel: &Arc<dyn CancellationHandler>,
    ) -> Result<&mut dyn RecordCursor> {
        self.delegate.prepare_cursor(factory, cancel)?;
        Ok(self)
    }

    fn reset(&mut self) -> Result<()> {
        self.delegate.reset()
    }

    fn supports_row_id_access(&self) -> bool {
        self.delegate.supports_row_id_access()
    }
}
