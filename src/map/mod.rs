//! # Multi-Map: Composite-Key Hash Map
//!
//! `MultiMap` backs GROUP BY aggregation, hash join indexes and analytic
//! partition state. It maps a serialized composite key to a fixed block of
//! value slots, both stored in a [`MemoryPages`] arena.
//!
//! ## Architecture
//!
//! ```text
//!   KeyWriter bytes ──hash──> HashTable<u32> ──> entries[idx] ──> arena offset
//!                                 (open addressing,            │
//!                                  key bytes compared          ▼
//!                                  on collision)   +--------------+----------+-----------+
//!                                                  | value slots  | len: i32 | key bytes |
//!                                                  +--------------+----------+-----------+
//! ```
//!
//! - The table stores entry indices; equality compares serialized key bytes
//!   in the arena, never references.
//! - `entries` keeps first-insertion order, which is the cursor's order.
//! - Value slots are zeroed when an entry is created and reported through
//!   [`MapValues::is_new`] so aggregators can initialize them.
//!
//! ## Cursor
//!
//! The map is its own [`RecordCursor`]. Each row exposes the key columns
//! first, then the value columns. Before a row is exposed every registered
//! [`MapRecordValueInterceptor`] may rewrite its value slots (averages are
//! finalized this way).
//!
//! ## Usage
//!
//! ```ignore
//! let mut map = MultiMap::new(key_columns, value_columns, Vec::new(), &config)?;
//! let mut key = map.key_writer();
//! write_key(&mut key, record, 0, ColumnType::Symbol);
//! let mut values = map.get_or_create_values(&key)?;
//! if values.is_new() {
//!     values.put_long(0, 0);
//! }
//! ```

pub mod key;
pub mod values;

use std::hash::BuildHasher;
use std::sync::Arc;

use eyre::{bail, ensure, Result};
use hashbrown::{DefaultHashBuilder, HashTable};
use smallvec::SmallVec;

use crate::config::{EngineConfig, STRING_LENGTH_PREFIX};
use crate::memory::MemoryPages;
use crate::records::{
    BinarySequence, NoSymbols, Record, RecordCursor, RecordMetadata, RowLayout, StorageFacade,
};
use crate::types::{ColumnMetadata, ColumnType};

pub use key::{key_column_type, write_key, KeyWriter};
pub use values::MapValues;

/// Hook run on an entry's values right before the map cursor exposes it.
pub trait MapRecordValueInterceptor {
    fn before_record(&self, values: &mut MapValues<'_>);
}

/// Composite-key hash map with arena-resident entries.
pub struct MultiMap {
    mem: MemoryPages,
    table: HashTable<u32>,
    entries: Vec<u64>,
    hashes: Vec<u64>,
    hasher: DefaultHashBuilder,
    metadata: Arc<RecordMetadata>,
    key_types: Vec<ColumnType>,
    value_layout: RowLayout,
    value_size: usize,
    interceptors: Vec<Box<dyn MapRecordValueInterceptor>>,
    read_pos: usize,
    current: u64,
    key_offsets: SmallVec<[u64; 8]>,
}

impl MultiMap {
    /// Key columns keep their names; SYMBOL keys are stored as STRING.
    /// Value columns must be fixed-width.
    pub fn new(
        key_columns: Vec<ColumnMetadata>,
        value_columns: Vec<ColumnMetadata>,
        interceptors: Vec<Box<dyn MapRecordValueInterceptor>>,
        config: &EngineConfig,
    ) -> Result<Self> {
        for column in &value_columns {
            ensure!(
                column.column_type().is_fixed(),
                "map value column {} must be fixed-width, found {}",
                column.name(),
                column.column_type()
            );
        }

        let key_types: Vec<ColumnType> = key_columns
            .iter()
            .map(|c| key_column_type(c.column_type()))
            .collect();
        let value_metadata = RecordMetadata::new(value_columns.clone(), None)?;
        let value_layout = RowLayout::new(&value_metadata);
        let value_size = value_layout.fixed_size();

        let mut columns: Vec<ColumnMetadata> = key_columns
            .iter()
            .zip(&key_types)
            .map(|(c, ty)| ColumnMetadata::new(c.name(), *ty))
            .collect();
        columns.extend(value_columns);

        Ok(Self {
            mem: MemoryPages::new(config.map_page_size())?,
            table: HashTable::with_capacity(config.map_capacity()),
            entries: Vec::with_capacity(config.map_capacity()),
            hashes: Vec::with_capacity(config.map_capacity()),
            hasher: DefaultHashBuilder::default(),
            metadata: Arc::new(RecordMetadata::new(columns, None)?),
            key_types,
            value_layout,
            value_size,
            interceptors,
            read_pos: 0,
            current: 0,
            key_offsets: SmallVec::new(),
        })
    }

    /// Key columns followed by value columns.
    pub fn metadata(&self) -> &Arc<RecordMetadata> {
        &self.metadata
    }

    pub fn key_count(&self) -> usize {
        self.key_types.len()
    }

    /// Number of distinct keys.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh writer sized for this map's keys.
    pub fn key_writer(&self) -> KeyWriter {
        KeyWriter::with_capacity(self.key_types.len() * 8)
    }

    /// Values for `key`, creating a zeroed entry when the key is new.
    pub fn get_or_create_values(&mut self, key: &KeyWriter) -> Result<MapValues<'_>> {
        let bytes = key.as_bytes();
        let hash = self.hasher.hash_one(bytes);

        if let Some(entry) = self.find(hash, bytes) {
            return Ok(MapValues::new(&mut self.mem, &self.value_layout, entry, false));
        }

        let entry = self
            .mem
            .allocate(self.value_size + STRING_LENGTH_PREFIX + bytes.len())?;
        self.mem.slice_mut(entry, self.value_size).fill(0);
        let key_at = entry + self.value_size as u64;
        self.mem.write_i32(key_at, bytes.len() as i32);
        self.mem
            .slice_mut(key_at + STRING_LENGTH_PREFIX as u64, bytes.len())
            .copy_from_slice(bytes);

        let idx = self.entries.len() as u32;
        self.entries.push(entry);
        self.hashes.push(hash);
        let hashes = &self.hashes;
        self.table
            .insert_unique(hash, idx, |&i| hashes[i as usize]);

        Ok(MapValues::new(&mut self.mem, &self.value_layout, entry, true))
    }

    /// Values for `key` if present; never inserts.
    pub fn get_values(&mut self, key: &KeyWriter) -> Option<MapValues<'_>> {
        let bytes = key.as_bytes();
        let hash = self.hasher.hash_one(bytes);
        let entry = self.find(hash, bytes)?;
        Some(MapValues::new(&mut self.mem, &self.value_layout, entry, false))
    }

    /// Rewinds the map cursor to the first inserted key.
    pub fn to_top(&mut self) {
        self.read_pos = 0;
    }

    /// Removes every entry, keeping arena pages and table capacity.
    pub fn clear(&mut self) {
        self.mem.clear();
        self.table.clear();
        self.entries.clear();
        self.hashes.clear();
        self.read_pos = 0;
        self.key_offsets.clear();
    }

    fn find(&self, hash: u64, bytes: &[u8]) -> Option<u64> {
        let idx = *self.table.find(hash, |&idx| {
            let entry = self.entries[idx as usize];
            let key_at = entry + self.value_size as u64;
            let len = self.mem.read_i32(key_at) as usize;
            len == bytes.len()
                && self.mem.slice(key_at + STRING_LENGTH_PREFIX as u64, len) == bytes
        })?;
        Some(self.entries[idx as usize])
    }

    fn position(&mut self, entry: u64) {
        self.current = entry;
        self.key_offsets.clear();
        let key_at = entry + self.value_size as u64;
        let len = self.mem.read_i32(key_at) as usize;
        let start = key_at + STRING_LENGTH_PREFIX as u64;
        let bytes = self.mem.slice(start, len);
        let mut at = 0;
        for ty in &self.key_types {
            self.key_offsets.push(start + at as u64);
            at += key::encoded_len(*ty, &bytes[at..]);
        }
    }

    fn view(&self) -> MapRecord<'_> {
        MapRecord {
            mem: &self.mem,
            key_types: &self.key_types,
            key_offsets: &self.key_offsets,
            value_layout: &self.value_layout,
            entry: self.current,
        }
    }
}

impl RecordCursor for MultiMap {
    fn has_next(&mut self) -> Result<bool> {
        Ok(self.read_pos < self.entries.len())
    }

    fn next(&mut self) -> Result<&dyn Record> {
        let entry = self.entries[self.read_pos];
        self.read_pos += 1;
        for interceptor in &self.interceptors {
            let mut values = MapValues::new(&mut self.mem, &self.value_layout, entry, false);
            interceptor.before_record(&mut values);
        }
        self.position(entry);
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn get_by_row_id(&mut self, _row_id: i64) -> Result<&dyn Record> {
        bail!("map records do not support row id access")
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        Arc::new(NoSymbols)
    }
}

forward_record!(MultiMap, |this| this.view());

/// Flyweight over one map entry: key columns, then value columns.
struct MapRecord<'a> {
    mem: &'a MemoryPages,
    key_types: &'a [ColumnType],
    key_offsets: &'a [u64],
    value_layout: &'a RowLayout,
    entry: u64,
}

impl<'a> MapRecord<'a> {
    #[inline]
    fn at(&self, col: usize) -> u64 {
        match self.key_offsets.get(col) {
            Some(&offset) => offset,
            None => self.entry + self.value_layout.offset(col - self.key_types.len()) as u64,
        }
    }

    fn get_str(&self, col: usize) -> Option<&'a str> {
        debug_assert!(col < self.key_types.len(), "value slots hold no strings");
        let at = self.at(col);
        let len = self.mem.read_i32(at);
        if len < 0 {
            return None;
        }
        std::str::from_utf8(self.mem.slice(at + STRING_LENGTH_PREFIX as u64, len as usize)).ok()
    }

    fn get_sym(&self, col: usize) -> Option<&'a str> {
        self.get_str(col)
    }

    fn get_bin(&self, col: usize) -> Option<BinarySequence<'a>> {
        debug_assert!(col < self.key_types.len(), "value slots hold no binaries");
        let at = self.at(col);
        let len = self.mem.read_i64(at);
        if len < 0 {
            return None;
        }
        Some(BinarySequence::contiguous(self.mem.slice(at + 8, len as usize)))
    }
}

impl Record for MapRecord<'_> {
    fn get_bool(&self, col: usize) -> bool {
        self.mem.slice(self.at(col), 1)[0] != 0
    }

    fn get_byte(&self, col: usize) -> i8 {
        self.mem.slice(self.at(col), 1)[0] as i8
    }

    fn get_short(&self, col: usize) -> i16 {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.mem.slice(self.at(col), 2));
        i16::from_le_bytes(buf)
    }

    fn get_int(&self, col: usize) -> i32 {
        self.mem.read_i32(self.at(col))
    }

    fn get_long(&self, col: usize) -> i64 {
        self.mem.read_i64(self.at(col))
    }

    fn get_float(&self, col: usize) -> f32 {
        f32::from_bits(self.mem.read_i32(self.at(col)) as u32)
    }

    fn get_double(&self, col: usize) -> f64 {
        f64::from_bits(self.mem.read_i64(self.at(col)) as u64)
    }

    fn get_date(&self, col: usize) -> i64 {
        self.mem.read_i64(self.at(col))
    }

    fn get_str(&self, col: usize) -> Option<&str> {
        MapRecord::get_str(self, col)
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        MapRecord::get_sym(self, col)
    }

    fn get_bin(&self, col: usize) -> Option<BinarySequence<'_>> {
        MapRecord::get_bin(self, col)
    }

    fn row_id(&self) -> i64 {
        -1
    }
}
