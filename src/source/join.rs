//! # Hash Join
//!
//! `HashJoinRecordSource` equi-joins a streaming master source against a
//! slave source that is fully indexed in memory at prepare time.
//!
//! ## Build Phase
//!
//! ```text
//! slave row ──write_key──> MultiMap[key] = (head, tail)
//!     │                                     │
//!     └──append(row, tail)──> RecordList ───┘  rows chained per key
//! ```
//!
//! Every slave row is materialized once in a [`RecordList`]. Rows sharing a
//! key form a chain through the list's `next` links; the map keeps the first
//! and last address of each chain so appends stay O(1).
//!
//! ## Probe Phase
//!
//! Each master row is keyed with the same [`write_key`] helper and looked up
//! without inserting. The chain is replayed in slave insertion order, one
//! output row per slave row. Outer joins emit one row padded with nulls when
//! nothing matches; inner joins drop the master row.
//!
//! Output columns are the master columns followed by the slave columns. A
//! slave column whose name is already taken is renamed with the first free
//! numeric suffix (`band` -> `band1`).

use std::sync::Arc;

use eyre::{bail, ensure, Result};
use tracing::debug;

use super::{CancellationHandler, NullRecord, RecordSource};
use crate::config::EngineConfig;
use crate::map::{key_column_type, write_key, KeyWriter, MultiMap};
use crate::records::{
    BinarySequence, Record, RecordCursor, RecordList, RecordMetadata, RemappedStorageFacade,
    StorageFacade,
};
use crate::storage::JournalReaderFactory;
use crate::types::{ColumnMetadata, ColumnType};

const HEAD: usize = 0;
const TAIL: usize = 1;

pub struct HashJoinRecordSource {
    master: Box<dyn RecordSource>,
    master_keys: Vec<(usize, ColumnType)>,
    slave: Box<dyn RecordSource>,
    slave_keys: Vec<(usize, ColumnType)>,
    outer: bool,
    metadata: Arc<RecordMetadata>,
    split: usize,
    index: MultiMap,
    rows: RecordList,
    key: KeyWriter,
    facade: Arc<dyn StorageFacade>,
    cancel: Option<Arc<dyn CancellationHandler>>,
    in_chain: bool,
    null_slave: bool,
    ready: bool,
}

impl HashJoinRecordSource {
    pub fn new(
        master: Box<dyn RecordSource>,
        master_key_names: &[&str],
        slave: Box<dyn RecordSource>,
        slave_key_names: &[&str],
        outer: bool,
        config: &EngineConfig,
    ) -> Result<Self> {
        ensure!(
            master_key_names.len() == slave_key_names.len(),
            "Join needs the same number of key columns on both sides: {} vs {}",
            master_key_names.len(),
            slave_key_names.len()
        );
        let master_meta = Arc::clone(master.metadata());
        let slave_meta = Arc::clone(slave.metadata());

        let mut master_keys = Vec::with_capacity(master_key_names.len());
        let mut slave_keys = Vec::with_capacity(slave_key_names.len());
        let mut key_columns = Vec::with_capacity(master_key_names.len());
        for (m, s) in master_key_names.iter().zip(slave_key_names) {
            let mi = master_meta.column_index(m)?;
            let si = slave_meta.column_index(s)?;
            let (mt, st) = (master_meta.column_type(mi), slave_meta.column_type(si));
            if key_column_type(mt) != key_column_type(st) {
                bail!("Join key type mismatch: {} is {}, {} is {}", m, mt, s, st);
            }
            master_keys.push((mi, mt));
            slave_keys.push((si, st));
            key_columns.push(master_meta.column(mi).clone());
        }

        let mut columns: Vec<ColumnMetadata> = master_meta.columns().to_vec();
        for column in slave_meta.columns() {
            let mut name = column.name().to_owned();
            let mut suffix = 1;
            while columns.iter().any(|c| c.name() == name) {
                name = format!("{}{}", column.name(), suffix);
                suffix += 1;
            }
            columns.push(column.renamed(name));
        }
        let metadata = Arc::new(RecordMetadata::new(columns, master_meta.timestamp_index())?);

        let index = MultiMap::new(
            key_columns,
            vec![
                ColumnMetadata::new("head", ColumnType::Long),
                ColumnMetadata::new("tail", ColumnType::Long),
            ],
            Vec::new(),
            config,
        )?;
        let rows = RecordList::new(Arc::clone(&slave_meta), config.record_list_page_size())?;

        Ok(Self {
            split: master_meta.column_count(),
            facade: Self::compose_facade(master.as_ref(), slave.as_ref(), &master_meta, &slave_meta),
            master,
            master_keys,
            slave,
            slave_keys,
            outer,
            metadata,
            index,
            rows,
            key: KeyWriter::with_capacity(64),
            cancel: None,
            in_chain: false,
            null_slave: false,
            ready: false,
        })
    }

    fn compose_facade(
        master: &dyn RecordSource,
        slave: &dyn RecordSource,
        master_meta: &RecordMetadata,
        slave_meta: &RecordMetadata,
    ) -> Arc<dyn StorageFacade> {
        let mapping = (0..master_meta.column_count())
            .map(|c| Some((0, c)))
            .chain((0..slave_meta.column_count()).map(|c| Some((1, c))))
            .collect();
        Arc::new(RemappedStorageFacade::new(
            vec![master.storage_facade(), slave.storage_facade()],
            mapping,
        ))
    }

    fn build_index(&mut self) -> Result<()> {
        self.index.clear();
        self.rows.clear();
        self.rows.set_storage_facade(self.slave.storage_facade());

        while self.slave.has_next()? {
            if let Some(cancel) = &self.cancel {
                cancel.check()?;
            }
            let record = self.slave.next()?;
            self.key.reset();
            for &(col, ty) in &self.slave_keys {
                write_key(&mut self.key, record, col, ty);
            }
            let mut values = self.index.get_or_create_values(&self.key)?;
            let tail = if values.is_new() { -1 } else { values.get_long(TAIL) };
            let address = self.rows.append(record, tail)?;
            if values.is_new() {
                values.put_long(HEAD, address);
            }
            values.put_long(TAIL, address);
        }

        debug!(
            rows = self.rows.size(),
            keys = self.index.size(),
            outer = self.outer,
            "built hash join index"
        );
        Ok(())
    }

    fn slave_record(&self) -> &dyn Record {
        if self.null_slave {
            &NullRecord
        } else {
            &self.rows
        }
    }

    fn rewind(&mut self) {
        self.in_chain = false;
        self.null_slave = false;
        self.ready = false;
    }
}

impl RecordCursor for HashJoinRecordSource {
    fn has_next(&mut self) -> Result<bool> {
        if self.ready {
            return Ok(true);
        }
        loop {
            if let Some(cancel) = &self.cancel {
                cancel.check()?;
            }
            if self.in_chain {
                if self.rows.has_next()? {
                    self.rows.next()?;
                    self.null_slave = false;
                    self.ready = true;
                    return Ok(true);
                }
                self.in_chain = false;
            }

            if !self.master.has_next()? {
                return Ok(false);
            }
            let record = self.master.next()?;
            self.key.reset();
            for &(col, ty) in &self.master_keys {
                write_key(&mut self.key, record, col, ty);
            }

            let head = self.index.get_values(&self.key).map(|v| v.get_long(HEAD));
            match head {
                Some(head) => {
                    self.rows.of(head);
                    self.in_chain = true;
                }
                None if self.outer => {
                    self.null_slave = true;
                    self.ready = true;
                    return Ok(true);
                }
                None => {}
            }
        }
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.has_next()? {
            bail!("Join has no more records");
        }
        self.ready = false;
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn get_by_row_id(&mut self, _row_id: i64) -> Result<&dyn Record> {
        bail!("Hash join does not support row id access")
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        Arc::clone(&self.facade)
    }
}

impl Record for HashJoinRecordSource {
    fn get_bool(&self, col: usize) -> bool {
        match col.checked_sub(self.split) {
            None => self.master.record().get_bool(col),
            Some(c) => self.slave_record().get_bool(c),
        }
    }

    fn get_byte(&self, col: usize) -> i8 {
        match col.checked_sub(self.split) {
            None => self.master.record().get_byte(col),
            Some(c) => self.slave_record().get_byte(c),
        }
    }

    fn get_short(&self, col: usize) -> i16 {
        match col.checked_sub(self.split) {
            None => self.master.record().get_short(col),
            Some(c) => self.slave_record().get_short(c),
        }
    }

    fn get_int(&self, col: usize) -> i32 {
        match col.checked_sub(self.split) {
            None => self.master.record().get_int(col),
            Some(c) => self.slave_record().get_int(c),
        }
    }

    fn get_long(&self, col: usize) -> i64 {
        match col.checked_sub(self.split) {
            None => self.master.record().get_long(col),
            Some(c) => self.slave_record().get_long(c),
        }
    }

    fn get_float(&self, col: usize) -> f32 {
        match col.checked_sub(self.split) {
            None => self.master.record().get_float(col),
            Some(c) => self.slave_record().get_float(c),
        }
    }

    fn get_double(&self, col: usize) -> f64 {
        match col.checked_sub(self.split) {
            None => self.master.record().get_double(col),
            Some(c) => self.slave_record().get_double(c),
        }
    }

    fn get_date(&self, col: usize) -> i64 {
        match col.checked_sub(self.split) {
            None => self.master.record().get_date(col),
            Some(c) => self.slave_record().get_date(c),
        }
    }

    fn get_str(&self, col: usize) -> Option<&str> {
        match col.checked_sub(self.split) {
            None => self.master.record().get_str(col),
            Some(c) => self.slave_record().get_str(c),
        }
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        match col.checked_sub(self.split) {
            None => self.master.record().get_sym(col),
            Some(c) => self.slave_record().get_sym(c),
        }
    }

    fn get_bin(&self, col: usize) -> Option<BinarySequence<'_>> {
        match col.checked_sub(self.split) {
            None => self.master.record().get_bin(col),
            Some(c) => self.slave_record().get_bin(c),
        }
    }

    fn row_id(&self) -> i64 {
        -1
    }
}

impl RecordSource for HashJoinRecordSource {
    fn metadata(&self) -> &Arc<RecordMetadata> {
        &self.metadata
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn JournalReaderFactory,
        cancel: &Arc<dyn CancellationHandler>,
    ) -> Result<&mut dyn RecordCursor> {
        self.cancel = Some(Arc::clone(cancel));
        self.slave.prepare_cursor(factory, cancel)?;
        self.master.prepare_cursor(factory, cancel)?;
        let master_meta = Arc::clone(self.master.metadata());
        let slave_meta = Arc::clone(self.slave.metadata());
        self.facade =
            Self::compose_facade(self.master.as_ref(), self.slave.as_ref(), &master_meta, &slave_meta);
        self.build_index()?;
        self.rewind();
        Ok(self)
    }

    fn reset(&mut self) -> Result<()> {
        self.master.reset()?;
        self.slave.reset()?;
        self.build_index()?;
        self.rewind();
        Ok(())
    }

    fn supports_row_id_access(&self) -> bool {
        false
    }
}
