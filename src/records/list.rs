//! # Record List
//!
//! `RecordList` is a write-once, read-many row store that materializes
//! records into a [`MemoryPages`] arena. Hash joins use it to buffer the
//! build side; anything that needs to replay rows or revisit them by row id
//! can use it too.
//!
//! ## Entry Layout
//!
//! ```text
//!            address (row id)
//!                 │
//!                 ▼
//! +-----------+---------------------------+-----------------------+
//! | next: i64 | fixed region (padded to 8)| var header: i64 each  |
//! +-----------+---------------------------+-----------------------+
//!                                                   │
//!                        ┌──────────────────────────┘
//!                        ▼
//!   STRING payload: [len: i32][UTF-8 bytes]     (len = -1 for null)
//!   BINARY payload: [len: i64][bytes, split across pages as needed]
//! ```
//!
//! `append(record, prev)` links the entry at `prev` to the new one, so a list
//! may hold several independent chains (one per join key, for example).
//! Appending with `prev` set to the previously returned address yields the
//! plain sequential list that [`to_top`](RecordList::to_top) replays.
//!
//! ## Limits
//!
//! A string payload must fit in one page; larger strings fail the append.
//! Binary payloads are split across pages and have no such limit.
//!
//! ## Row Identity
//!
//! A row id is the entry's address. It stays valid until `clear()`.

use std::sync::Arc;

use eyre::{bail, Result};
use smallvec::SmallVec;

use super::{
    BinarySequence, NoSymbols, Record, RecordCursor, RecordMetadata, RowLayout, StorageFacade,
};
use crate::config::{BINARY_LENGTH_PREFIX, NULL_LENGTH, RECORD_LINK_SIZE, STRING_LENGTH_PREFIX};
use crate::memory::MemoryPages;
use crate::types::ColumnType;

/// Append-only materialized rows with sequential replay and row-id access.
pub struct RecordList {
    mem: MemoryPages,
    metadata: Arc<RecordMetadata>,
    layout: RowLayout,
    facade: Arc<dyn StorageFacade>,
    first: i64,
    last: i64,
    read_address: i64,
    current: i64,
    size: usize,
}

impl RecordList {
    pub fn new(metadata: Arc<RecordMetadata>, page_size: usize) -> Result<Self> {
        let layout = RowLayout::new(&metadata);
        let row = RECORD_LINK_SIZE + layout.row_size();
        if row > page_size {
            bail!(
                "row of {} bytes does not fit record list page of {} bytes",
                row,
                page_size
            );
        }

        Ok(Self {
            mem: MemoryPages::new(page_size)?,
            metadata,
            layout,
            facade: Arc::new(NoSymbols),
            first: -1,
            last: -1,
            read_address: -1,
            current: -1,
            size: 0,
        })
    }

    pub fn metadata(&self) -> &Arc<RecordMetadata> {
        &self.metadata
    }

    /// Binds the resolver used by SYMBOL getters.
    pub fn set_storage_facade(&mut self, facade: Arc<dyn StorageFacade>) {
        self.facade = facade;
    }

    /// Number of rows appended since creation or the last `clear()`.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Address of the most recently appended row, -1 when empty.
    pub fn last_address(&self) -> i64 {
        self.last
    }

    /// Copies `record` into the list and links the entry at `prev` to it.
    /// Pass -1 to start a new chain.
    pub fn append(&mut self, record: &dyn Record, prev: i64) -> Result<i64> {
        let offset = self.mem.allocate(RECORD_LINK_SIZE + self.layout.row_size())?;
        let address = (offset + RECORD_LINK_SIZE as u64) as i64;

        self.mem.write_i64(offset, -1);
        if prev != -1 {
            self.mem.write_i64(prev as u64 - RECORD_LINK_SIZE as u64, address);
        }

        let base = address as u64;
        let header = base + self.layout.fixed_size() as u64;
        for col in 0..self.layout.column_count() {
            let at = base + self.layout.offset(col) as u64;
            match self.layout.column_type(col) {
                ColumnType::Boolean => {
                    self.mem.slice_mut(at, 1)[0] = record.get_bool(col) as u8;
                }
                ColumnType::Byte => {
                    self.mem.slice_mut(at, 1)[0] = record.get_byte(col) as u8;
                }
                ColumnType::Short => {
                    self.mem
                        .slice_mut(at, 2)
                        .copy_from_slice(&record.get_short(col).to_le_bytes());
                }
                ColumnType::Int | ColumnType::Symbol => {
                    self.mem.write_i32(at, record.get_int(col));
                }
                ColumnType::Float => {
                    self.mem
                        .slice_mut(at, 4)
                        .copy_from_slice(&record.get_float(col).to_le_bytes());
                }
                ColumnType::Long => self.mem.write_i64(at, record.get_long(col)),
                ColumnType::Date => self.mem.write_i64(at, record.get_date(col)),
                ColumnType::Double => {
                    self.mem
                        .slice_mut(at, 8)
                        .copy_from_slice(&record.get_double(col).to_le_bytes());
                }
                ColumnType::String => {
                    let payload = self.write_str(record.get_str(col))?;
                    self.mem.write_i64(header + self.layout.offset(col) as u64, payload as i64);
                }
                ColumnType::Binary => {
                    let payload = self.write_bin(record.get_bin(col))?;
                    self.mem.write_i64(header + self.layout.offset(col) as u64, payload as i64);
                }
            }
        }

        if self.first == -1 {
            self.first = address;
        }
        self.last = address;
        self.size += 1;
        Ok(address)
    }

    /// Rewinds replay to the first appended row.
    pub fn to_top(&mut self) {
        self.read_address = self.first;
    }

    /// Starts replay at `address`, following `next` links from there.
    pub fn of(&mut self, address: i64) {
        self.read_address = address;
    }

    /// Independent flyweight positioned on `row_id`.
    pub fn record_at(&self, row_id: i64) -> ListRecord<'_> {
        ListRecord {
            mem: &self.mem,
            layout: &self.layout,
            facade: self.facade.as_ref(),
            address: row_id,
        }
    }

    /// Drops every row. Row ids handed out earlier become invalid.
    pub fn clear(&mut self) {
        self.mem.clear();
        self.first = -1;
        self.last = -1;
        self.read_address = -1;
        self.current = -1;
        self.size = 0;
    }

    /// Releases the arena pages.
    pub fn close(&mut self) {
        self.clear();
        self.mem.close();
    }

    fn write_str(&mut self, value: Option<&str>) -> Result<u64> {
        let Some(value) = value else {
            let offset = self.mem.allocate(STRING_LENGTH_PREFIX)?;
            self.mem.write_i32(offset, NULL_LENGTH);
            return Ok(offset);
        };

        let len = value.len();
        if STRING_LENGTH_PREFIX + len > self.mem.page_size() {
            bail!(
                "String larger than page size: {} bytes, page size {}",
                len,
                self.mem.page_size()
            );
        }

        let offset = self.mem.allocate(STRING_LENGTH_PREFIX + len)?;
        self.mem.write_i32(offset, len as i32);
        self.mem
            .slice_mut(offset + STRING_LENGTH_PREFIX as u64, len)
            .copy_from_slice(value.as_bytes());
        Ok(offset)
    }

    fn write_bin(&mut self, value: Option<BinarySequence<'_>>) -> Result<u64> {
        let offset = self.mem.allocate(BINARY_LENGTH_PREFIX)?;
        let Some(value) = value else {
            self.mem.write_i64(offset, NULL_LENGTH as i64);
            return Ok(offset);
        };

        self.mem.write_i64(offset, value.len() as i64);
        for chunk in value.chunks() {
            let mut rest: &[u8] = chunk;
            while !rest.is_empty() {
                let n = self.mem.page_remaining(self.mem.cursor()).min(rest.len());
                let at = self.mem.allocate_offset(n)?;
                self.mem.slice_mut(at, n).copy_from_slice(&rest[..n]);
                rest = &rest[n..];
            }
        }
        Ok(offset)
    }

    fn view(&self) -> ListRecord<'_> {
        self.record_at(self.current)
    }
}

impl RecordCursor for RecordList {
    fn has_next(&mut self) -> Result<bool> {
        Ok(self.read_address > -1)
    }

    fn next(&mut self) -> Result<&dyn Record> {
        self.current = self.read_address;
        self.read_address = self
            .mem
            .read_i64(self.current as u64 - RECORD_LINK_SIZE as u64);
        Ok(self)
    }

    fn record(&self) -> &dyn Record {
        self
    }

    fn get_by_row_id(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.current = row_id;
        Ok(self)
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        Arc::clone(&self.facade)
    }
}

forward_record!(RecordList, |this| this.view());

/// Flyweight over one record list entry.
#[derive(Clone, Copy)]
pub struct ListRecord<'a> {
    mem: &'a MemoryPages,
    layout: &'a RowLayout,
    facade: &'a dyn StorageFacade,
    address: i64,
}

impl<'a> ListRecord<'a> {
    #[inline]
    fn fixed(&self, col: usize) -> u64 {
        self.address as u64 + self.layout.offset(col) as u64
    }

    #[inline]
    fn payload(&self, col: usize) -> u64 {
        let slot = self.address as u64 + self.layout.fixed_size() as u64 + self.layout.offset(col) as u64;
        self.mem.read_i64(slot) as u64
    }

    #[inline]
    fn check(&self, col: usize, expected: &[ColumnType]) {
        debug_assert!(
            expected.contains(&self.layout.column_type(col)),
            "column {} is {}, read as {:?}",
            col,
            self.layout.column_type(col),
            expected
        );
    }

    pub fn get_str(&self, col: usize) -> Option<&'a str> {
        self.check(col, &[ColumnType::String]);
        let offset = self.payload(col);
        let len = self.mem.read_i32(offset);
        if len < 0 {
            return None;
        }
        std::str::from_utf8(self.mem.slice(offset + STRING_LENGTH_PREFIX as u64, len as usize)).ok()
    }

    pub fn get_sym(&self, col: usize) -> Option<&'a str> {
        self.check(col, &[ColumnType::Symbol]);
        let key = self.mem.read_i32(self.fixed(col));
        self.facade.symbol_table(col)?.value(key)
    }

    pub fn get_bin(&self, col: usize) -> Option<BinarySequence<'a>> {
        self.check(col, &[ColumnType::Binary]);
        let offset = self.payload(col);
        let len = self.mem.read_i64(offset);
        if len < 0 {
            return None;
        }

        let mut chunks = SmallVec::new();
        let mut at = offset + BINARY_LENGTH_PREFIX as u64;
        let mut left = len as usize;
        while left > 0 {
            let n = self.mem.page_remaining(at).min(left);
            chunks.push(self.mem.slice(at, n));
            at += n as u64;
            left -= n;
        }
        Some(BinarySequence::from_chunks(chunks))
    }
}

impl Record for ListRecord<'_> {
    fn get_bool(&self, col: usize) -> bool {
        self.check(col, &[ColumnType::Boolean]);
        self.mem.slice(self.fixed(col), 1)[0] != 0
    }

    fn get_byte(&self, col: usize) -> i8 {
        self.check(col, &[ColumnType::Byte]);
        self.mem.slice(self.fixed(col), 1)[0] as i8
    }

    fn get_short(&self, col: usize) -> i16 {
        self.check(col, &[ColumnType::Short]);
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.mem.slice(self.fixed(col), 2));
        i16::from_le_bytes(buf)
    }

    fn get_int(&self, col: usize) -> i32 {
        self.check(col, &[ColumnType::Int, ColumnType::Symbol]);
        self.mem.read_i32(self.fixed(col))
    }

    fn get_long(&self, col: usize) -> i64 {
        self.check(col, &[ColumnType::Long, ColumnType::Date]);
        self.mem.read_i64(self.fixed(col))
    }

    fn get_float(&self, col: usize) -> f32 {
        self.check(col, &[ColumnType::Float]);
        f32::from_bits(self.mem.read_i32(self.fixed(col)) as u32)
    }

    fn get_double(&self, col: usize) -> f64 {
        self.check(col, &[ColumnType::Double]);
        f64::from_bits(self.mem.read_i64(self.fixed(col)) as u64)
    }

    fn get_date(&self, col: usize) -> i64 {
        self.check(col, &[ColumnType::Date, ColumnType::Long]);
        self.mem.read_i64(self.fixed(col))
    }

    fn get_str(&self, col: usize) -> Option<&str> {
        ListRecord::get_str(self, col)
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        ListRecord::get_sym(self, col)
    }

    fn get_bin(&self, col: usize) -> Option<BinarySequence<'_>> {
        ListRecord::get_bin(self, col)
    }

    fn row_id(&self) -> i64 {
        self.address
    }
}
