//! # Fixed Record Holder
//!
//! `FixRecordHolder` buffers exactly one row of fixed-width columns. As-of
//! style operators use it to remember "the latest row seen so far" from a
//! slave cursor while the master cursor catches up.
//!
//! ```text
//! write(rec) ──> [fixed region bytes] ──> peek() -> Some(&dyn Record)
//! clear()    ──> held = false        ──> peek() -> None
//! ```

use std::sync::Arc;

use eyre::{ensure, Result};

use super::{BinarySequence, NoSymbols, Record, RecordMetadata, RowLayout, StorageFacade};
use crate::types::ColumnType;

/// Single buffered row of fixed-width columns.
pub struct FixRecordHolder {
    layout: RowLayout,
    buf: Vec<u8>,
    facade: Arc<dyn StorageFacade>,
    row_id: i64,
    held: bool,
}

impl FixRecordHolder {
    pub fn new(metadata: &RecordMetadata) -> Result<Self> {
        let layout = RowLayout::new(metadata);
        ensure!(
            !layout.has_var_columns(),
            "FixRecordHolder accepts fixed-width columns only"
        );

        Ok(Self {
            buf: vec![0u8; layout.fixed_size()],
            layout,
            facade: Arc::new(NoSymbols),
            row_id: -1,
            held: false,
        })
    }

    /// Binds the resolver used by SYMBOL getters on the held row.
    pub fn set_storage_facade(&mut self, facade: Arc<dyn StorageFacade>) {
        self.facade = facade;
    }

    /// Replaces the held row with a copy of `record`.
    pub fn write(&mut self, record: &dyn Record) {
        for col in 0..self.layout.column_count() {
            let at = self.layout.offset(col);
            match self.layout.column_type(col) {
                ColumnType::Boolean => self.buf[at] = record.get_bool(col) as u8,
                ColumnType::Byte => self.buf[at] = record.get_byte(col) as u8,
                ColumnType::Short => {
                    self.buf[at..at + 2].copy_from_slice(&record.get_short(col).to_le_bytes())
                }
                ColumnType::Int | ColumnType::Symbol => {
                    self.buf[at..at + 4].copy_from_slice(&record.get_int(col).to_le_bytes())
                }
                ColumnType::Float => {
                    self.buf[at..at + 4].copy_from_slice(&record.get_float(col).to_le_bytes())
                }
                ColumnType::Long => {
                    self.buf[at..at + 8].copy_from_slice(&record.get_long(col).to_le_bytes())
                }
                ColumnType::Date => {
                    self.buf[at..at + 8].copy_from_slice(&record.get_date(col).to_le_bytes())
                }
                ColumnType::Double => {
                    self.buf[at..at + 8].copy_from_slice(&record.get_double(col).to_le_bytes())
                }
                ColumnType::String | ColumnType::Binary => {}
            }
        }
        self.row_id = record.row_id();
        self.held = true;
    }

    pub fn peek(&self) -> Option<&dyn Record> {
        if self.held {
            Some(self)
        } else {
            None
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn clear(&mut self) {
        self.held = false;
    }

    fn bytes<const N: usize>(&self, col: usize) -> [u8; N] {
        let at = self.layout.offset(col);
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[at..at + N]);
        out
    }
}

impl Record for FixRecordHolder {
    fn get_bool(&self, col: usize) -> bool {
        self.buf[self.layout.offset(col)] != 0
    }

    fn get_byte(&self, col: usize) -> i8 {
        self.buf[self.layout.offset(col)] as i8
    }

    fn get_short(&self, col: usize) -> i16 {
        i16::from_le_bytes(self.bytes(col))
    }

    fn get_int(&self, col: usize) -> i32 {
        i32::from_le_bytes(self.bytes(col))
    }

    fn get_long(&self, col: usize) -> i64 {
        i64::from_le_bytes(self.bytes(col))
    }

    fn get_float(&self, col: usize) -> f32 {
        f32::from_le_bytes(self.bytes(col))
    }

    fn get_double(&self, col: usize) -> f64 {
        f64::from_le_bytes(self.bytes(col))
    }

    fn get_date(&self, col: usize) -> i64 {
        i64::from_le_bytes(self.bytes(col))
    }

    fn get_str(&self, _col: usize) -> Option<&str> {
        debug_assert!(false, "FixRecordHolder holds no STRING columns");
        None
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        debug_assert_eq!(self.layout.column_type(col), ColumnType::Symbol);
        self.facade.symbol_table(col)?.value(self.get_int(col))
    }

    fn get_bin(&self, _col: usize) -> Option<BinarySequence<'_>> {
        debug_assert!(false, "FixRecordHolder holds no BINARY columns");
        None
    }

    fn row_id(&self) -> i64 {
        self.row_id
    }
}
