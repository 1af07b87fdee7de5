//! # Composite Keys
//!
//! Group-by maps and hash joins key rows by a serialized composite of column
//! values. Both build keys through [`write_key`], so a join key and a
//! group-by key over the same columns are byte-identical.
//!
//! ## Encoding
//!
//! | Type | Bytes |
//! |------|-------|
//! | BOOLEAN, BYTE | 1 |
//! | SHORT | 2 LE |
//! | INT, FLOAT | 4 LE |
//! | LONG, DOUBLE, DATE | 8 LE |
//! | STRING, SYMBOL | `[len: i32][UTF-8]`, `len = -1` for null |
//! | BINARY | `[len: i64][bytes]`, `len = -1` for null |
//!
//! SYMBOL keys are written as their resolved string, never as the
//! dictionary key, so symbols from different journals compare by value.

use crate::config::NULL_LENGTH;
use crate::records::{BinarySequence, Record};
use crate::types::ColumnType;

/// Caller-owned scratch buffer that accumulates one composite key.
#[derive(Debug, Clone, Default)]
pub struct KeyWriter {
    buf: Vec<u8>,
}

impl KeyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Starts a new key, keeping the allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn put_byte(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn put_short(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_int(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_long(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_float(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_double(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_date(&mut self, value: i64) {
        self.put_long(value);
    }

    pub fn put_str(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.put_int(s.len() as i32);
                self.buf.extend_from_slice(s.as_bytes());
            }
            None => self.put_int(NULL_LENGTH),
        }
    }

    pub fn put_bin(&mut self, value: Option<BinarySequence<'_>>) {
        match value {
            Some(bin) => {
                self.put_long(bin.len() as i64);
                for chunk in bin.chunks() {
                    self.buf.extend_from_slice(chunk);
                }
            }
            None => self.put_long(NULL_LENGTH as i64),
        }
    }
}

/// Appends column `col` of `record` to `writer`, dispatching on its type.
pub fn write_key(writer: &mut KeyWriter, record: &dyn Record, col: usize, column_type: ColumnType) {
    match column_type {
        ColumnType::Boolean => writer.put_bool(record.get_bool(col)),
        ColumnType::Byte => writer.put_byte(record.get_byte(col)),
        ColumnType::Short => writer.put_short(record.get_short(col)),
        ColumnType::Int => writer.put_int(record.get_int(col)),
        ColumnType::Long => writer.put_long(record.get_long(col)),
        ColumnType::Float => writer.put_float(record.get_float(col)),
        ColumnType::Double => writer.put_double(record.get_double(col)),
        ColumnType::Date => writer.put_date(record.get_date(col)),
        ColumnType::String => writer.put_str(record.get_str(col)),
        ColumnType::Symbol => writer.put_str(record.get_sym(col)),
        ColumnType::Binary => writer.put_bin(record.get_bin(col)),
    }
}

/// Type a key column takes inside a map: symbols become strings.
pub fn key_column_type(column_type: ColumnType) -> ColumnType {
    match column_type {
        ColumnType::Symbol => ColumnType::String,
        other => other,
    }
}

/// Byte length of the encoded value at the start of `bytes`.
pub(crate) fn encoded_len(column_type: ColumnType, bytes: &[u8]) -> usize {
    match column_type {
        ColumnType::String | ColumnType::Symbol => {
            let mut len = [0u8; 4];
            len.copy_from_slice(&bytes[..4]);
            4 + i32::from_le_bytes(len).max(0) as usize
        }
        ColumnType::Binary => {
            let mut len = [0u8; 8];
            len.copy_from_slice(&bytes[..8]);
            8 + i64::from_le_bytes(len).max(0) as usize
        }
        fixed => fixed.size(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_strings_encode_differently() {
        let mut a = KeyWriter::new();
        a.put_str(None);
        let mut b = KeyWriter::new();
        b.put_str(Some(""));
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_eq!(encoded_len(ColumnType::String, a.as_bytes()), 4);
        assert_eq!(encoded_len(ColumnType::String, b.as_bytes()), 4);
    }

    #[test]
    fn composite_key_lengths_walk_columns() {
        let mut key = KeyWriter::new();
        key.put_int(7);
        key.put_str(Some("abc"));
        key.put_long(9);
        let bytes = key.as_bytes();
        assert_eq!(bytes.len(), 4 + 7 + 8);
        assert_eq!(encoded_len(ColumnType::Int, bytes), 4);
        assert_eq!(encoded_len(ColumnType::String, &bytes[4..]), 7);
    }

    #[test]
    fn reset_keeps_nothing_from_previous_key() {
        let mut key = KeyWriter::with_capacity(16);
        key.put_long(1);
        key.reset();
        key.put_bool(true);
        assert_eq!(key.as_bytes(), &[1]);
    }
}
