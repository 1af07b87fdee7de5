//! # Journals, Writers and Readers
//!
//! A [`Journal`] is an append-only table of rows ordered by timestamp. It has
//! exactly one writer and any number of readers:
//!
//! ```text
//!              commit()                       refresh()
//! JournalWriter ───────> RwLock<Arc<Snapshot>> ────────> JournalReader
//!   (private partitions)     (committed state)           (pinned snapshot)
//! ```
//!
//! ## Snapshots
//!
//! Committed state is an `Arc<Snapshot>`: a list of `Arc<Partition>` plus the
//! symbol tables. A reader pins one snapshot until it calls `refresh`, so
//! rows committed later are invisible to it. The writer mutates its own
//! partition list through `Arc::make_mut`; a partition still shared with a
//! snapshot is cloned once on the first append after a commit, and partitions
//! the writer has moved past stay shared.
//!
//! That clone copies every row already in the tail partition, so a commit
//! costs O(rows in the tail partition) on the next append. Many small commits
//! into one large partition are therefore quadratic overall; batch rows
//! between commits, or partition finer, when committing often.
//!
//! ## Ordering
//!
//! Timestamps must be non-decreasing. A row older than the newest appended
//! row is rejected with "Cannot insert records out of order" and the writer
//! state is left unchanged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{bail, ensure, Result};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{Partition, PartitionBy};
use crate::config::ROW_ID_PARTITION_SHIFT;
use crate::records::{RecordMetadata, StorageFacade, SymbolTable};
use crate::types::{ColumnType, OwnedValue};

/// Committed journal state shared with readers.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    partitions: Vec<Arc<Partition>>,
    symbols: Vec<Option<Arc<SymbolTable>>>,
    size: usize,
    max_timestamp: i64,
}

impl StorageFacade for Snapshot {
    fn symbol_table(&self, col: usize) -> Option<&SymbolTable> {
        self.symbols.get(col)?.as_deref()
    }
}

/// Append-only, time-partitioned table.
pub struct Journal {
    name: String,
    metadata: Arc<RecordMetadata>,
    partition_by: PartitionBy,
    committed: RwLock<Arc<Snapshot>>,
    writer_open: AtomicBool,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("name", &self.name)
            .field("partition_by", &self.partition_by)
            .field("size", &self.committed.read().size)
            .finish()
    }
}

impl Journal {
    pub fn new(
        name: impl Into<String>,
        metadata: RecordMetadata,
        partition_by: PartitionBy,
    ) -> Result<Arc<Journal>> {
        let name = name.into();
        ensure!(
            partition_by == PartitionBy::None || metadata.timestamp_index().is_some(),
            "Journal {} is partitioned by {} but has no timestamp column",
            name,
            partition_by
        );
        let symbols = metadata
            .columns()
            .iter()
            .map(|c| (c.column_type() == ColumnType::Symbol).then(|| Arc::new(SymbolTable::new())))
            .collect();
        Ok(Arc::new(Journal {
            name,
            metadata: Arc::new(metadata),
            partition_by,
            committed: RwLock::new(Arc::new(Snapshot {
                symbols,
                max_timestamp: i64::MIN,
                ..Snapshot::default()
            })),
            writer_open: AtomicBool::new(false),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Arc<RecordMetadata> {
        &self.metadata
    }

    pub fn partition_by(&self) -> PartitionBy {
        self.partition_by
    }

    /// Number of committed rows.
    pub fn size(&self) -> usize {
        self.committed.read().size
    }

    /// Opens the single writer, continuing from the committed state.
    pub fn writer(self: &Arc<Self>) -> Result<JournalWriter> {
        if self
            .writer_open
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            bail!("Journal {} is already open for writing", self.name);
        }
        let snapshot = Arc::clone(&self.committed.read());
        Ok(JournalWriter {
            journal: Arc::clone(self),
            state: (*snapshot).clone(),
            values: Vec::with_capacity(self.metadata.column_count()),
        })
    }

    /// Reader pinned to the currently committed state.
    pub fn reader(self: &Arc<Self>) -> JournalReader {
        JournalReader {
            journal: Arc::clone(self),
            snapshot: Arc::clone(&self.committed.read()),
        }
    }
}

/// Exclusive appender for one journal; dropping it discards uncommitted rows.
pub struct JournalWriter {
    journal: Arc<Journal>,
    state: Snapshot,
    values: Vec<Option<OwnedValue>>,
}

impl JournalWriter {
    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// Starts a row at `ts`. The timestamp column, if any, is filled in.
    pub fn row(&mut self, ts: i64) -> Result<RowWriter<'_>> {
        let ts_col = self.journal.metadata.timestamp_index();
        if ts_col.is_some() && ts < self.state.max_timestamp {
            warn!(
                journal = %self.journal.name,
                timestamp = ts,
                max_timestamp = self.state.max_timestamp,
                "rejected out-of-order record"
            );
            bail!(
                "Cannot insert records out of order: {} < {} in journal {}",
                ts,
                self.state.max_timestamp,
                self.journal.name
            );
        }
        self.values.clear();
        self.values.resize(self.journal.metadata.column_count(), None);
        if let Some(col) = ts_col {
            self.values[col] = Some(OwnedValue::Date(ts));
        }
        Ok(RowWriter { writer: self, ts })
    }

    /// Uncommitted plus committed rows.
    pub fn size(&self) -> usize {
        self.state.size
    }

    /// Publishes everything appended so far to new readers and refreshes.
    pub fn commit(&mut self) {
        let snapshot = Arc::new(self.state.clone());
        *self.journal.committed.write() = snapshot;
        debug!(
            journal = %self.journal.name,
            partitions = self.state.partitions.len(),
            rows = self.state.size,
            "committed journal"
        );
    }

    /// Discards rows appended since the last commit.
    pub fn rollback(&mut self) {
        self.state = (**self.journal.committed.read()).clone();
    }

    fn append(&mut self, ts: i64) -> Result<()> {
        let metadata = Arc::clone(&self.journal.metadata);
        for (col, value) in self.values.iter().enumerate() {
            let Some(v) = value else { continue };
            let expected = metadata.column_type(col);
            ensure!(
                v.column_type() == expected,
                "Column {} is {}, cannot write {}",
                metadata.column(col).name(),
                expected,
                v.column_type()
            );
        }
        // Interning happens only once the whole row is known to be valid.
        for (col, value) in self.values.iter_mut().enumerate() {
            if let Some(OwnedValue::Sym(sym)) = value {
                let key = match self.state.symbols.get_mut(col).and_then(Option::as_mut) {
                    Some(table) => Arc::make_mut(table).put(sym.as_deref()),
                    None => bail!("Column {} has no symbol table", metadata.column(col).name()),
                };
                *value = Some(OwnedValue::Int(key));
            }
        }

        let partition_by = self.journal.partition_by;
        let needs_partition = self
            .state
            .partitions
            .last()
            .map_or(true, |p| !p.contains(ts));
        if needs_partition {
            let index = self.state.partitions.len();
            ensure!(
                (index as u64) < (1u64 << (63 - ROW_ID_PARTITION_SHIFT)),
                "Journal {} has too many partitions",
                self.journal.name
            );
            let types = metadata.columns().iter().map(|c| c.column_type()).collect();
            self.state
                .partitions
                .push(Arc::new(Partition::new(index, partition_by, ts, types)));
        }
        if let Some(last) = self.state.partitions.last_mut() {
            Arc::make_mut(last).append(&self.values);
        }
        self.state.size += 1;
        if metadata.timestamp_index().is_some() {
            self.state.max_timestamp = ts;
        }
        Ok(())
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        self.journal.writer_open.store(false, Ordering::Release);
    }
}

/// One row under construction. Columns left unset are stored as null.
pub struct RowWriter<'a> {
    writer: &'a mut JournalWriter,
    ts: i64,
}

impl RowWriter<'_> {
    fn set(&mut self, col: usize, value: OwnedValue) -> &mut Self {
        if let Some(slot) = self.writer.values.get_mut(col) {
            *slot = Some(value);
        }
        self
    }

    pub fn put_bool(&mut self, col: usize, value: bool) -> &mut Self {
        self.set(col, OwnedValue::Boolean(value))
    }

    pub fn put_byte(&mut self, col: usize, value: i8) -> &mut Self {
        self.set(col, OwnedValue::Byte(value))
    }

    pub fn put_short(&mut self, col: usize, value: i16) -> &mut Self {
        self.set(col, OwnedValue::Short(value))
    }

    pub fn put_int(&mut self, col: usize, value: i32) -> &mut Self {
        self.set(col, OwnedValue::Int(value))
    }

    pub fn put_long(&mut self, col: usize, value: i64) -> &mut Self {
        self.set(col, OwnedValue::Long(value))
    }

    pub fn put_float(&mut self, col: usize, value: f32) -> &mut Self {
        self.set(col, OwnedValue::Float(value))
    }

    pub fn put_double(&mut self, col: usize, value: f64) -> &mut Self {
        self.set(col, OwnedValue::Double(value))
    }

    pub fn put_date(&mut self, col: usize, value: i64) -> &mut Self {
        self.set(col, OwnedValue::Date(value))
    }

    pub fn put_str(&mut self, col: usize, value: &str) -> &mut Self {
        self.set(col, OwnedValue::Str(Some(value.to_owned())))
    }

    pub fn put_sym(&mut self, col: usize, value: &str) -> &mut Self {
        self.set(col, OwnedValue::Sym(Some(value.to_owned())))
    }

    pub fn put_bin(&mut self, col: usize, value: &[u8]) -> &mut Self {
        self.set(col, OwnedValue::Bin(Some(value.to_vec())))
    }

    /// Stores an already typed value.
    pub fn put(&mut self, col: usize, value: OwnedValue) -> &mut Self {
        self.set(col, value)
    }

    pub fn append(&mut self) -> Result<()> {
        let ts = self.ts;
        self.writer.append(ts)
    }
}

/// Read view of a journal pinned to one committed snapshot.
#[derive(Clone)]
pub struct JournalReader {
    journal: Arc<Journal>,
    snapshot: Arc<Snapshot>,
}

impl JournalReader {
    pub fn name(&self) -> &str {
        &self.journal.name
    }

    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    pub fn metadata(&self) -> &Arc<RecordMetadata> {
        &self.journal.metadata
    }

    pub fn partition_count(&self) -> usize {
        self.snapshot.partitions.len()
    }

    pub fn partition(&self, index: usize) -> Result<&Arc<Partition>> {
        match self.snapshot.partitions.get(index) {
            Some(p) => Ok(p),
            None => bail!(
                "Cannot read partition {} of journal {}: {} partitions",
                index,
                self.journal.name,
                self.snapshot.partitions.len()
            ),
        }
    }

    /// Committed rows visible to this reader.
    pub fn size(&self) -> usize {
        self.snapshot.size
    }

    /// Re-pins the reader to the latest committed state.
    pub fn refresh(&mut self) -> Result<()> {
        self.snapshot = Arc::clone(&self.journal.committed.read());
        debug!(
            journal = %self.journal.name,
            partitions = self.snapshot.partitions.len(),
            rows = self.snapshot.size,
            "refreshed journal reader"
        );
        Ok(())
    }

    /// Symbol resolver for rows of the pinned snapshot.
    pub fn facade(&self) -> Arc<dyn StorageFacade> {
        self.snapshot.clone()
    }
}

impl StorageFacade for JournalReader {
    fn symbol_table(&self, col: usize) -> Option<&SymbolTable> {
        self.snapshot.symbol_table(col)
    }
}
