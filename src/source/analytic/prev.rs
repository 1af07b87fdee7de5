//! # prev()
//!
//! `prev(column) over (partition by keys)` yields, for each row, the value
//! `column` had on the previous row of the same partition. The first row of
//! a partition yields the type's null:
//!
//! | Type | First-row value |
//! |------|-----------------|
//! | BOOLEAN | `false` |
//! | BYTE, SHORT | `0` |
//! | INT | `i32::MIN` |
//! | LONG, DATE | `i64::MIN` |
//! | FLOAT, DOUBLE | NaN |
//! | STRING, SYMBOL | `None` |
//!
//! ## State
//!
//! A [`MultiMap`] keyed by the partition columns holds one LONG slot per
//! partition: the previous value's bits for fixed-width types, or the arena
//! offset of the partition's STRING block. SYMBOL values keep their
//! dictionary key and resolve through the input's storage facade. An empty
//! partition list puts every row in one partition.
//!
//! Each partition owns one string block, rewritten in place on every row:
//!
//! ```text
//! [capacity: i32][len: i32][UTF-8 ... capacity bytes]     len = -1 for null
//! ```
//!
//! The old value is copied out before the block is overwritten. A value that
//! outgrows the block moves to a new block of at least twice the capacity,
//! so the arena grows with the number of partitions and the longest value,
//! not with the number of rows.

use std::sync::Arc;

use eyre::{bail, Result};

use super::AnalyticFunction;
use crate::config::{EngineConfig, NULL_LENGTH, STRING_LENGTH_PREFIX};
use crate::map::{write_key, KeyWriter, MultiMap};
use crate::memory::MemoryPages;
use crate::records::{NoSymbols, Record, RecordMetadata, StorageFacade};
use crate::types::{
    ColumnMetadata, ColumnType, DATE_NULL, INT_NULL, LONG_NULL, SYMBOL_NULL_KEY,
};

const VALUE: usize = 0;
const BLOCK_HEADER: usize = 2 * STRING_LENGTH_PREFIX;
const MIN_BLOCK_CAPACITY: usize = 16;

pub struct PrevRowAnalyticFunction {
    column: String,
    partition_by: Vec<String>,
    alias: Option<String>,
    col: usize,
    column_type: ColumnType,
    keys: Vec<(usize, ColumnType)>,
    map: Option<MultiMap>,
    key: KeyWriter,
    strings: Option<MemoryPages>,
    prev_str: String,
    facade: Arc<dyn StorageFacade>,
    has_prev: bool,
    prev: i64,
}

impl PrevRowAnalyticFunction {
    pub fn new<S: AsRef<str>>(column: &str, partition_by: &[S]) -> Self {
        Self {
            column: column.to_owned(),
            partition_by: partition_by.iter().map(|s| s.as_ref().to_owned()).collect(),
            alias: None,
            col: 0,
            column_type: ColumnType::Long,
            keys: Vec::new(),
            map: None,
            key: KeyWriter::with_capacity(32),
            strings: None,
            prev_str: String::new(),
            facade: Arc::new(NoSymbols),
            has_prev: false,
            prev: 0,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn encode(&self, record: &dyn Record) -> Result<i64> {
        let col = self.col;
        Ok(match self.column_type {
            ColumnType::Boolean => record.get_bool(col) as i64,
            ColumnType::Byte => record.get_byte(col) as i64,
            ColumnType::Short => record.get_short(col) as i64,
            ColumnType::Int | ColumnType::Symbol => record.get_int(col) as i64,
            ColumnType::Long => record.get_long(col),
            ColumnType::Date => record.get_date(col),
            ColumnType::Float => record.get_float(col).to_bits() as i64,
            ColumnType::Double => record.get_double(col).to_bits() as i64,
            // STRING values live in per-partition blocks, see `write_block`.
            ColumnType::String => -1,
            ColumnType::Binary => bail!("prev() does not support BINARY"),
        })
    }
}

/// Copies the value held in `block` into `out`. Returns false for null.
fn read_block(strings: &MemoryPages, block: i64, out: &mut String) -> bool {
    out.clear();
    if block < 0 {
        return false;
    }
    let offset = block as u64;
    let len = strings.read_i32(offset + STRING_LENGTH_PREFIX as u64);
    if len < 0 {
        return false;
    }
    match std::str::from_utf8(strings.slice(offset + BLOCK_HEADER as u64, len as usize)) {
        Ok(value) => {
            out.push_str(value);
            true
        }
        Err(_) => false,
    }
}

/// Stores `value` in `block`, moving to a larger block when it does not fit.
/// Returns the offset of the block now holding the value.
fn write_block(strings: &mut MemoryPages, block: i64, value: Option<&str>) -> Result<i64> {
    let len = value.map_or(0, str::len);
    let max_capacity = strings.page_size().saturating_sub(BLOCK_HEADER);
    if len > max_capacity {
        bail!(
            "String larger than page size: {} bytes, page size {}",
            len,
            strings.page_size()
        );
    }

    let capacity = if block < 0 {
        0
    } else {
        strings.read_i32(block as u64) as usize
    };
    let offset = if block >= 0 && len <= capacity {
        block as u64
    } else {
        let grown = len
            .max(capacity * 2)
            .max(MIN_BLOCK_CAPACITY)
            .min(max_capacity);
        let offset = strings.allocate(BLOCK_HEADER + grown)?;
        strings.write_i32(offset, grown as i32);
        offset
    };

    let len_at = offset + STRING_LENGTH_PREFIX as u64;
    match value {
        Some(value) => {
            strings.write_i32(len_at, len as i32);
            strings
                .slice_mut(offset + BLOCK_HEADER as u64, len)
                .copy_from_slice(value.as_bytes());
        }
        None => strings.write_i32(len_at, NULL_LENGTH),
    }
    Ok(offset as i64)
}

impl AnalyticFunction for PrevRowAnalyticFunction {
    fn prepare(&mut self, metadata: &RecordMetadata, config: &EngineConfig) -> Result<()> {
        let Some(col) = metadata.column_index_quiet(&self.column) else {
            bail!("Invalid column: {}", self.column);
        };
        self.col = col;
        self.column_type = metadata.column_type(col);
        if self.column_type == ColumnType::Binary {
            bail!("prev() does not support BINARY column {}", self.column);
        }

        self.keys.clear();
        let mut key_columns = Vec::with_capacity(self.partition_by.len());
        for name in &self.partition_by {
            let Some(idx) = metadata.column_index_quiet(name) else {
                bail!("Invalid column: {}", name);
            };
            self.keys.push((idx, metadata.column_type(idx)));
            key_columns.push(metadata.column(idx).clone());
        }

        self.map = Some(MultiMap::new(
            key_columns,
            vec![ColumnMetadata::new("prev", ColumnType::Long)],
            Vec::new(),
            config,
        )?);
        if self.column_type == ColumnType::String {
            self.strings = Some(MemoryPages::new(config.map_page_size())?);
        }
        Ok(())
    }

    fn set_storage_facade(&mut self, facade: Arc<dyn StorageFacade>) {
        self.facade = facade;
    }

    fn column(&self) -> ColumnMetadata {
        ColumnMetadata::new(self.alias.clone().unwrap_or_default(), self.column_type)
    }

    fn symbol_source(&self) -> Option<usize> {
        (self.column_type == ColumnType::Symbol).then_some(self.col)
    }

    fn add_record(&mut self, record: &dyn Record) -> Result<()> {
        let current = self.encode(record)?;
        let Some(map) = self.map.as_mut() else {
            bail!("prev({}) used before prepare", self.column);
        };
        self.key.reset();
        for &(col, ty) in &self.keys {
            write_key(&mut self.key, record, col, ty);
        }
        let mut values = map.get_or_create_values(&self.key)?;
        self.has_prev = !values.is_new();

        if self.column_type == ColumnType::String {
            let Some(strings) = self.strings.as_mut() else {
                bail!("prev({}) used before prepare", self.column);
            };
            let block = if self.has_prev { values.get_long(VALUE) } else { -1 };
            self.prev = if read_block(strings, block, &mut self.prev_str) { 0 } else { -1 };
            let block = write_block(strings, block, record.get_str(self.col))?;
            values.put_long(VALUE, block);
            return Ok(());
        }

        if self.has_prev {
            self.prev = values.get_long(VALUE);
        }
        values.put_long(VALUE, current);
        Ok(())
    }

    fn get_bool(&self) -> bool {
        self.has_prev && self.prev != 0
    }

    fn get_byte(&self) -> i8 {
        if self.has_prev {
            self.prev as i8
        } else {
            0
        }
    }

    fn get_short(&self) -> i16 {
        if self.has_prev {
            self.prev as i16
        } else {
            0
        }
    }

    fn get_int(&self) -> i32 {
        match (self.has_prev, self.column_type) {
            (true, _) => self.prev as i32,
            (false, ColumnType::Symbol) => SYMBOL_NULL_KEY,
            (false, _) => INT_NULL,
        }
    }

    fn get_long(&self) -> i64 {
        if self.has_prev {
            self.prev
        } else {
            LONG_NULL
        }
    }

    fn get_float(&self) -> f32 {
        if self.has_prev {
            f32::from_bits(self.prev as u32)
        } else {
            f32::NAN
        }
    }

    fn get_double(&self) -> f64 {
        if self.has_prev {
            f64::from_bits(self.prev as u64)
        } else {
            f64::NAN
        }
    }

    fn get_date(&self) -> i64 {
        if self.has_prev {
            self.prev
        } else {
            DATE_NULL
        }
    }

    fn get_str(&self) -> Option<&str> {
        (self.has_prev && self.prev >= 0).then_some(self.prev_str.as_str())
    }

    fn get_sym(&self) -> Option<&str> {
        if !self.has_prev {
            return None;
        }
        self.facade.symbol_table(self.col)?.value(self.prev as i32)
    }

    fn reset(&mut self) {
        if let Some(map) = self.map.as_mut() {
            map.clear();
        }
        if let Some(strings) = self.strings.as_mut() {
            strings.clear();
        }
        self.prev_str.clear();
        self.has_prev = false;
        self.prev = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> RecordMetadata {
        RecordMetadata::builder()
            .column("i", ColumnType::Int)
            .column("str", ColumnType::String)
            .build()
            .unwrap()
    }

    #[test]
    fn unknown_argument_column_is_rejected() {
        let mut prev = PrevRowAnalyticFunction::new::<&str>("nope", &[]);
        let err = prev.prepare(&metadata(), &EngineConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid column: nope");
    }

    #[test]
    fn unknown_partition_column_is_rejected() {
        let mut prev = PrevRowAnalyticFunction::new("i", &["missing"]);
        let err = prev.prepare(&metadata(), &EngineConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid column: missing");
    }

    /// Row of `(i INT, str STRING)`.
    struct Tick(i32, Option<String>);

    impl Record for Tick {
        fn get_bool(&self, _: usize) -> bool {
            unreachable!()
        }

        fn get_byte(&self, _: usize) -> i8 {
            unreachable!()
        }

        fn get_short(&self, _: usize) -> i16 {
            unreachable!()
        }

        fn get_int(&self, _: usize) -> i32 {
            self.0
        }

        fn get_long(&self, _: usize) -> i64 {
            unreachable!()
        }

        fn get_float(&self, _: usize) -> f32 {
            unreachable!()
        }

        fn get_double(&self, _: usize) -> f64 {
            unreachable!()
        }

        fn get_date(&self, _: usize) -> i64 {
            unreachable!()
        }

        fn get_str(&self, _: usize) -> Option<&str> {
            self.1.as_deref()
        }

        fn get_sym(&self, _: usize) -> Option<&str> {
            unreachable!()
        }

        fn get_bin(&self, _: usize) -> Option<crate::records::BinarySequence<'_>> {
            unreachable!()
        }

        fn row_id(&self) -> i64 {
            -1
        }
    }

    fn prev_str(prev: &PrevRowAnalyticFunction) -> Option<String> {
        prev.get_str().map(str::to_owned)
    }

    #[test]
    fn string_arena_stays_flat_within_a_partition() {
        let mut prev = PrevRowAnalyticFunction::new("str", &["i"]);
        prev.prepare(&metadata(), &EngineConfig::default()).unwrap();

        for i in 0..20_000 {
            prev.add_record(&Tick(1, Some(format!("value-{}", i)))).unwrap();
            if i > 0 {
                assert_eq!(prev_str(&prev), Some(format!("value-{}", i - 1)));
            }
        }
        let strings = prev.strings.as_ref().unwrap();
        assert_eq!(strings.page_count(), 1);
        assert!(strings.size() < 64);
    }

    #[test]
    fn string_blocks_grow_and_keep_nulls() {
        let mut prev = PrevRowAnalyticFunction::new("str", &["i"]);
        prev.prepare(&metadata(), &EngineConfig::default()).unwrap();

        let long = "x".repeat(100);
        let rows = [
            Tick(1, Some("a".to_owned())),
            Tick(2, None),
            Tick(1, Some(long.clone())),
            Tick(2, Some("b".to_owned())),
            Tick(1, None),
            Tick(1, Some("c".to_owned())),
            Tick(2, Some("d".to_owned())),
        ];
        let mut seen = Vec::new();
        for row in &rows {
            prev.add_record(row).unwrap();
            seen.push(prev_str(&prev));
        }
        assert_eq!(
            seen,
            vec![
                None,
                None,
                Some("a".to_owned()),
                None,
                Some(long),
                None,
                Some("b".to_owned()),
            ]
        );

        prev.reset();
        prev.add_record(&Tick(1, Some("e".to_owned()))).unwrap();
        assert_eq!(prev_str(&prev), None);
    }

    #[test]
    fn oversized_string_is_rejected() {
        let config = EngineConfig::builder().map_page_size(1024).build().unwrap();
        let mut prev = PrevRowAnalyticFunction::new::<&str>("str", &[]);
        prev.prepare(&metadata(), &config).unwrap();
        let err = prev.add_record(&Tick(0, Some("y".repeat(2000)))).unwrap_err();
        assert!(err.to_string().starts_with("String larger than page size"));
    }

    #[test]
    fn unaliased_column_asks_for_a_generated_name() {
        let mut prev = PrevRowAnalyticFunction::new("i", &["str"]);
        prev.prepare(&metadata(), &EngineConfig::default()).unwrap();
        assert_eq!(prev.column().name(), "");
        assert_eq!(prev.column().column_type(), ColumnType::Int);
        let prev = prev.alias("p");
        assert_eq!(prev.column().name(), "p");
    }
}
