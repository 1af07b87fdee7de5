//! # Storage Module
//!
//! In-memory journal storage: the leaf every query pipeline reads from.
//!
//! ## Architecture Overview
//!
//! ```text
//! JournalFactory (name -> Arc<Journal>)
//!     │
//!     ▼
//! Journal ──writer()──> JournalWriter ──commit()──┐
//!     │                                          ▼
//!     └────reader()──> JournalReader <── RwLock<Arc<Snapshot>>
//!                          │
//!                          ▼
//!                 Arc<Partition> ... ──> PartitionRecord (flyweight)
//! ```
//!
//! Journals are split into time partitions ([`PartitionBy`]). Rows within a
//! partition are addressed by a local index; sources combine the partition
//! index and the local index into a row id:
//!
//! ```text
//! row_id = partition_index << ROW_ID_PARTITION_SHIFT | local_row
//! ```
//!
//! ## Concurrency
//!
//! One writer and many readers per journal. Readers never block the writer
//! beyond the pointer swap in `commit`, and see exactly the state of their
//! last `refresh`.
//!
//! ## Module Organization
//!
//! - `partition`: `PartitionBy`, columnar `Partition`, `PartitionRecord`
//! - `journal`: `Journal`, `JournalWriter`, `RowWriter`, `JournalReader`

mod journal;
mod partition;

use std::sync::Arc;

use eyre::{bail, Result, WrapErr};
use hashbrown::HashMap;
use parking_lot::RwLock;

pub use journal::{Journal, JournalReader, JournalWriter, RowWriter};
pub use partition::{Partition, PartitionBy, PartitionRecord};

use crate::config::{ROW_ID_LOCAL_MASK, ROW_ID_PARTITION_SHIFT};
use crate::records::RecordMetadata;
use crate::sql::JournalStructure;

/// Packs a partition index and a local row into a row id.
#[inline]
pub fn to_row_id(partition_index: usize, local_row: usize) -> i64 {
    ((partition_index as i64) << ROW_ID_PARTITION_SHIFT) | local_row as i64
}

#[inline]
pub fn to_partition_index(row_id: i64) -> usize {
    (row_id >> ROW_ID_PARTITION_SHIFT) as usize
}

#[inline]
pub fn to_local_row(row_id: i64) -> usize {
    (row_id & ROW_ID_LOCAL_MASK) as usize
}

/// Opens readers by journal name.
pub trait JournalReaderFactory {
    fn reader(&self, name: &str) -> Result<JournalReader>;
}

/// Registry of named in-memory journals.
#[derive(Debug, Default)]
pub struct JournalFactory {
    journals: RwLock<HashMap<String, Arc<Journal>>>,
}

impl JournalFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        name: &str,
        metadata: RecordMetadata,
        partition_by: PartitionBy,
    ) -> Result<Arc<Journal>> {
        let mut journals = self.journals.write();
        if journals.contains_key(name) {
            bail!("Journal already exists: {}", name);
        }
        let journal = Journal::new(name, metadata, partition_by)?;
        journals.insert(name.to_owned(), Arc::clone(&journal));
        Ok(journal)
    }

    /// Returns the existing journal if its partitioning matches, or creates it.
    pub fn open_or_create(
        &self,
        name: &str,
        metadata: RecordMetadata,
        partition_by: PartitionBy,
    ) -> Result<Arc<Journal>> {
        if let Some(journal) = self.journals.read().get(name) {
            if journal.partition_by() != partition_by {
                bail!(
                    "Incompatible partition type for journal {}: {} on disk, {} requested",
                    name,
                    journal.partition_by(),
                    partition_by
                );
            }
            return Ok(Arc::clone(journal));
        }
        self.create(name, metadata, partition_by)
    }

    /// Creates a journal from a parsed `create journal` statement.
    pub fn create_journal(&self, structure: &JournalStructure<'_>) -> Result<Arc<Journal>> {
        let metadata = structure
            .to_metadata()
            .wrap_err_with(|| format!("Invalid structure for journal {}", structure.name))?;
        self.create(structure.name, metadata, structure.partition_by)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Journal>> {
        match self.journals.read().get(name) {
            Some(journal) => Ok(Arc::clone(journal)),
            None => bail!("Journal does not exist: {}", name),
        }
    }
}

impl JournalReaderFactory for JournalFactory {
    fn reader(&self, name: &str) -> Result<JournalReader> {
        Ok(self.get(name)?.reader())
    }
}
