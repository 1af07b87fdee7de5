//! # Journal Sources
//!
//! The leaves of every pipeline. [`JournalPartitionSource`] enumerates the
//! partition slices of a journal; [`JournalRecordSource`] walks every row of
//! each slice through a single [`PartitionRecord`] flyweight.
//!
//! ```text
//! JournalReader ──> [slice 0: rows 0..n0] [slice 1: rows 0..n1] ...
//!                          │
//!                          ▼
//!                   PartitionRecord (row_id = partition << 44 | row)
//! ```

use std::sync::Arc;

use eyre::{bail, Result};

use super::{CancellationHandler, RecordSource};
use crate::records::{Record, RecordCursor, RecordMetadata, StorageFacade};
use crate::storage::{
    to_local_row, to_partition_index, to_row_id, JournalReader, JournalReaderFactory, Partition,
    PartitionRecord,
};

/// Row range `[lo, hi)` of one partition.
#[derive(Debug, Clone)]
pub struct PartitionSlice {
    pub partition: Arc<Partition>,
    pub lo: usize,
    pub hi: usize,
}

/// Enumerates the partitions of a journal as whole-partition slices.
pub struct JournalPartitionSource {
    reader: JournalReader,
    next: usize,
}

impl JournalPartitionSource {
    pub fn new(reader: JournalReader) -> Self {
        Self { reader, next: 0 }
    }

    pub fn reader(&self) -> &JournalReader {
        &self.reader
    }

    pub fn metadata(&self) -> &Arc<RecordMetadata> {
        self.reader.metadata()
    }

    /// Opens a fresh reader for the same journal through `factory`.
    pub fn prepare(&mut self, factory: &dyn JournalReaderFactory) -> Result<()> {
        let name = self.reader.name().to_owned();
        self.reader = factory.reader(&name)?;
        self.next = 0;
        Ok(())
    }

    pub fn next_slice(&mut self) -> Result<Option<PartitionSlice>> {
        if self.next >= self.reader.partition_count() {
            return Ok(None);
        }
        let partition = Arc::clone(self.reader.partition(self.next)?);
        self.next += 1;
        let hi = partition.size();
        Ok(Some(PartitionSlice {
            partition,
            lo: 0,
            hi,
        }))
    }

    /// Refreshes the reader and restarts from the first partition.
    pub fn reset(&mut self) -> Result<()> {
        self.reader.refresh()?;
        self.next = 0;
        Ok(())
    }
}

/// Full scan over a journal.
pub struct JournalRecordSource {
    partitions: JournalPartitionSource,
    slice: Option<PartitionSlice>,
    row: usize,
    record: PartitionRecord,
}

impl JournalRecordSource {
    /// Opens `name` through `factory`; the reader is reopened on each prepare.
    pub fn new(factory: &dyn JournalReaderFactory, name: &str) -> Result<Self> {
        Ok(Self::from_reader(factory.reader(name)?))
    }

    pub fn from_reader(reader: JournalReader) -> Self {
        let record = PartitionRecord::new(reader.facade());
        Self {
            partitions: JournalPartitionSource::new(reader),
            slice: None,
            row: 0,
            record,
        }
    }

    fn rewind(&mut self) {
        self.slice = None;
        self.row = 0;
        self.record.release();
        self.record.set_storage_facade(self.partitions.reader().facade());
    }
}

impl RecordCursor for JournalRecordSource {
    fn has_next(&mut self) -> Result<bool> {
        loop {
            if let Some(slice) = &self.slice {
                if self.row < slice.hi {
                    return Ok(true);
                }
            }
            match self.partitions.next_slice()? {
                Some(slice) => {
                    self.row = slice.lo;
                    self.slice = Some(slice);
                }
                None => {
                    self.slice = None;
                    return Ok(false);
                }
            }
        }
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.has_next()? {
            bail!("Journal {} has no more records", self.partitions.reader().name());
        }
        if let Some(slice) = &self.slice {
            let row_id = to_row_id(slice.partition.index(), self.row);
            self.record.of(&slice.partition, self.row, row_id);
            self.row += 1;
        }
        Ok(&self.record)
    }

    fn record(&self) -> &dyn Record {
        &self.record
    }

    fn get_by_row_id(&mut self, row_id: i64) -> Result<&dyn Record> {
        let reader = self.partitions.reader();
        let partition = reader.partition(to_partition_index(row_id))?;
        let local = to_local_row(row_id);
        if row_id < 0 || local >= partition.size() {
            bail!("Cannot read partition {} at {}", partition.name(), local);
        }
        self.record.of(partition, local, row_id);
        Ok(&self.record)
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        self.partitions.reader().facade()
    }
}

impl RecordSource for JournalRecordSource {
    fn metadata(&self) -> &Arc<RecordMetadata> {
        self.partitions.metadata()
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn JournalReaderFactory,
        _cancel: &Arc<dyn CancellationHandler>,
    ) -> Result<&mut dyn RecordCursor> {
        self.partitions.prepare(factory)?;
        self.rewind();
        Ok(self)
    }

    fn reset(&mut self) -> Result<()> {
        self.partitions.reset()?;
        self.rewind();
        Ok(())
    }

    fn supports_row_id_access(&self) -> bool {
        true
    }
}
