//! # Partitions
//!
//! A partition is a contiguous time-bounded slice of a journal. Each one
//! stores its rows column by column:
//!
//! ```text
//! fixed column:    [v0][v1][v2]...                  (width = type size, LE)
//! STRING column:   offsets: [o0][o1]...  data: [len: i32][UTF-8]...
//! BINARY column:   offsets: [o0][o1]...  data: [len: i64][bytes]...
//! ```
//!
//! ## Time Bounds
//!
//! [`PartitionBy`] decides which partition a timestamp lands in. Bounds are
//! half-open `[lo, hi)` in epoch milliseconds, computed with proleptic
//! Gregorian calendar arithmetic (UTC).
//!
//! | Variant | Bounds | Name |
//! |---------|--------|------|
//! | `None` | whole timeline | `default` |
//! | `Day` | midnight to midnight | `2014-03-15` |
//! | `Month` | first of month to first of next | `2014-03` |
//! | `Year` | Jan 1 to Jan 1 | `2014` |

use std::sync::Arc;

use crate::config::NULL_LENGTH;
use crate::records::{BinarySequence, Record, StorageFacade};
use crate::types::{ColumnType, OwnedValue, DATE_NULL, INT_NULL, LONG_NULL, SYMBOL_NULL_KEY};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Time granularity of journal partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionBy {
    None,
    Day,
    Month,
    Year,
}

impl PartitionBy {
    /// Parses `NONE`, `DAY`, `MONTH` or `YEAR`, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<PartitionBy> {
        [
            PartitionBy::None,
            PartitionBy::Day,
            PartitionBy::Month,
            PartitionBy::Year,
        ]
        .into_iter()
        .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            PartitionBy::None => "NONE",
            PartitionBy::Day => "DAY",
            PartitionBy::Month => "MONTH",
            PartitionBy::Year => "YEAR",
        }
    }

    /// Half-open `[lo, hi)` bounds of the partition holding `ts`.
    ///
    /// Bounds that fall outside the i64 range clamp to `i64::MIN` and
    /// `i64::MAX`; see [`Partition::contains`] for the upper edge.
    pub fn interval_of(self, ts: i64) -> (i64, i64) {
        let days = ts.div_euclid(MILLIS_PER_DAY);
        match self {
            PartitionBy::None => (i64::MIN, i64::MAX),
            PartitionBy::Day => (day_start(days), day_start(days + 1)),
            PartitionBy::Month => {
                let (year, month, _) = days_to_date(days);
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                (
                    day_start(date_to_days(year, month, 1)),
                    day_start(date_to_days(next_year, next_month, 1)),
                )
            }
            PartitionBy::Year => {
                let (year, _, _) = days_to_date(days);
                (
                    day_start(date_to_days(year, 1, 1)),
                    day_start(date_to_days(year + 1, 1, 1)),
                )
            }
        }
    }

    /// Directory-style name of the partition starting at `lo`.
    pub fn partition_name(self, lo: i64) -> String {
        let (year, month, day) = days_to_date(lo.div_euclid(MILLIS_PER_DAY));
        match self {
            PartitionBy::None => "default".to_owned(),
            PartitionBy::Day => format!("{:04}-{:02}-{:02}", year, month, day),
            PartitionBy::Month => format!("{:04}-{:02}", year, month),
            PartitionBy::Year => format!("{:04}", year),
        }
    }
}

impl std::fmt::Display for PartitionBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Epoch millisecond at which a day starts, saturating at the i64 range.
#[inline]
fn day_start(days: i64) -> i64 {
    days.saturating_mul(MILLIS_PER_DAY)
}

/// Days since 1970-01-01 of a civil date.
pub(crate) fn date_to_days(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let m = if month <= 2 { month + 12 } else { month } as i64;
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let doy = (153 * (m - 3) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date of a day count since 1970-01-01.
pub(crate) fn days_to_date(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

#[derive(Debug, Clone)]
pub(crate) enum ColumnData {
    Fixed { width: usize, bytes: Vec<u8> },
    Var { offsets: Vec<usize>, data: Vec<u8> },
}

impl ColumnData {
    fn new(column_type: ColumnType) -> Self {
        if column_type.is_fixed() {
            ColumnData::Fixed {
                width: column_type.size(),
                bytes: Vec::new(),
            }
        } else {
            ColumnData::Var {
                offsets: Vec::new(),
                data: Vec::new(),
            }
        }
    }

    #[inline]
    fn fixed<const N: usize>(&self, row: usize) -> [u8; N] {
        let mut out = [0u8; N];
        if let ColumnData::Fixed { width, bytes } = self {
            debug_assert_eq!(*width, N);
            out.copy_from_slice(&bytes[row * N..row * N + N]);
        }
        out
    }

    fn var(&self, row: usize) -> Option<&[u8]> {
        match self {
            ColumnData::Var { offsets, data } => Some(&data[offsets[row]..]),
            ColumnData::Fixed { .. } => None,
        }
    }
}

/// Rows of one time slice, stored column-wise.
#[derive(Debug, Clone)]
pub struct Partition {
    index: usize,
    name: String,
    lo: i64,
    hi: i64,
    types: Vec<ColumnType>,
    columns: Vec<ColumnData>,
    row_count: usize,
}

impl Partition {
    pub(crate) fn new(index: usize, partition_by: PartitionBy, ts: i64, types: Vec<ColumnType>) -> Self {
        let (lo, hi) = partition_by.interval_of(ts);
        Self {
            index,
            name: partition_by.partition_name(lo),
            lo,
            hi,
            columns: types.iter().map(|t| ColumnData::new(*t)).collect(),
            types,
            row_count: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Half-open time bounds.
    pub fn interval(&self) -> (i64, i64) {
        (self.lo, self.hi)
    }

    /// `hi` is exclusive except when clamped to `i64::MAX`, so the last
    /// representable timestamp still has a partition.
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.lo && (ts < self.hi || self.hi == i64::MAX)
    }

    pub fn size(&self) -> usize {
        self.row_count
    }

    /// Appends one row; `values[col]` of `None` stores the column's null.
    /// SYMBOL values arrive as dictionary keys (`OwnedValue::Int`).
    pub(crate) fn append(&mut self, values: &[Option<OwnedValue>]) {
        for (col, column) in self.columns.iter_mut().enumerate() {
            let value = values.get(col).and_then(Option::as_ref);
            match column {
                ColumnData::Fixed { bytes, .. } => {
                    encode_fixed(self.types[col], value, bytes);
                }
                ColumnData::Var { offsets, data } => {
                    offsets.push(data.len());
                    match value {
                        Some(OwnedValue::Str(Some(s))) => {
                            data.extend_from_slice(&(s.len() as i32).to_le_bytes());
                            data.extend_from_slice(s.as_bytes());
                        }
                        Some(OwnedValue::Bin(Some(b))) => {
                            data.extend_from_slice(&(b.len() as i64).to_le_bytes());
                            data.extend_from_slice(b);
                        }
                        _ if self.types[col] == ColumnType::Binary => {
                            data.extend_from_slice(&(NULL_LENGTH as i64).to_le_bytes());
                        }
                        _ => data.extend_from_slice(&NULL_LENGTH.to_le_bytes()),
                    }
                }
            }
        }
        self.row_count += 1;
    }
}

fn encode_fixed(column_type: ColumnType, value: Option<&OwnedValue>, out: &mut Vec<u8>) {
    match (column_type, value) {
        (ColumnType::Boolean, Some(OwnedValue::Boolean(v))) => out.push(*v as u8),
        (ColumnType::Boolean, _) => out.push(0),
        (ColumnType::Byte, Some(OwnedValue::Byte(v))) => out.push(*v as u8),
        (ColumnType::Byte, _) => out.push(0),
        (ColumnType::Short, Some(OwnedValue::Short(v))) => out.extend_from_slice(&v.to_le_bytes()),
        (ColumnType::Short, _) => out.extend_from_slice(&0i16.to_le_bytes()),
        (ColumnType::Int, Some(OwnedValue::Int(v))) => out.extend_from_slice(&v.to_le_bytes()),
        (ColumnType::Int, _) => out.extend_from_slice(&INT_NULL.to_le_bytes()),
        (ColumnType::Symbol, Some(OwnedValue::Int(v))) => out.extend_from_slice(&v.to_le_bytes()),
        (ColumnType::Symbol, _) => out.extend_from_slice(&SYMBOL_NULL_KEY.to_le_bytes()),
        (ColumnType::Float, Some(OwnedValue::Float(v))) => out.extend_from_slice(&v.to_le_bytes()),
        (ColumnType::Float, _) => out.extend_from_slice(&f32::NAN.to_le_bytes()),
        (ColumnType::Long, Some(OwnedValue::Long(v))) => out.extend_from_slice(&v.to_le_bytes()),
        (ColumnType::Long, _) => out.extend_from_slice(&LONG_NULL.to_le_bytes()),
        (ColumnType::Double, Some(OwnedValue::Double(v))) => out.extend_from_slice(&v.to_le_bytes()),
        (ColumnType::Double, _) => out.extend_from_slice(&f64::NAN.to_le_bytes()),
        (ColumnType::Date, Some(OwnedValue::Date(v))) => out.extend_from_slice(&v.to_le_bytes()),
        (ColumnType::Date, _) => out.extend_from_slice(&DATE_NULL.to_le_bytes()),
        (ColumnType::String | ColumnType::Binary, _) => {}
    }
}

/// Flyweight over one partition row.
pub struct PartitionRecord {
    partition: Option<Arc<Partition>>,
    facade: Arc<dyn StorageFacade>,
    row: usize,
    row_id: i64,
}

impl PartitionRecord {
    pub fn new(facade: Arc<dyn StorageFacade>) -> Self {
        Self {
            partition: None,
            facade,
            row: 0,
            row_id: -1,
        }
    }

    /// Positions the record on `row` of `partition`.
    pub fn of(&mut self, partition: &Arc<Partition>, row: usize, row_id: i64) {
        if !self
            .partition
            .as_ref()
            .is_some_and(|p| Arc::ptr_eq(p, partition))
        {
            self.partition = Some(Arc::clone(partition));
        }
        self.row = row;
        self.row_id = row_id;
    }

    pub fn set_storage_facade(&mut self, facade: Arc<dyn StorageFacade>) {
        self.facade = facade;
    }

    /// Drops the held partition so its memory can be reclaimed.
    pub fn release(&mut self) {
        self.partition = None;
        self.row_id = -1;
    }

    #[inline]
    fn column(&self, col: usize) -> &ColumnData {
        match &self.partition {
            Some(p) => &p.columns[col],
            None => panic!("partition record read before positioning"),
        }
    }

    #[inline]
    fn check(&self, col: usize, expected: &[ColumnType]) {
        debug_assert!(
            self.partition
                .as_ref()
                .map_or(true, |p| expected.contains(&p.types[col])),
            "column {} read as {:?}",
            col,
            expected
        );
    }
}

impl Record for PartitionRecord {
    fn get_bool(&self, col: usize) -> bool {
        self.check(col, &[ColumnType::Boolean]);
        self.column(col).fixed::<1>(self.row)[0] != 0
    }

    fn get_byte(&self, col: usize) -> i8 {
        self.check(col, &[ColumnType::Byte]);
        self.column(col).fixed::<1>(self.row)[0] as i8
    }

    fn get_short(&self, col: usize) -> i16 {
        self.check(col, &[ColumnType::Short]);
        i16::from_le_bytes(self.column(col).fixed(self.row))
    }

    fn get_int(&self, col: usize) -> i32 {
        self.check(col, &[ColumnType::Int, ColumnType::Symbol]);
        i32::from_le_bytes(self.column(col).fixed(self.row))
    }

    fn get_long(&self, col: usize) -> i64 {
        self.check(col, &[ColumnType::Long, ColumnType::Date]);
        i64::from_le_bytes(self.column(col).fixed(self.row))
    }

    fn get_float(&self, col: usize) -> f32 {
        self.check(col, &[ColumnType::Float]);
        f32::from_le_bytes(self.column(col).fixed(self.row))
    }

    fn get_double(&self, col: usize) -> f64 {
        self.check(col, &[ColumnType::Double]);
        f64::from_le_bytes(self.column(col).fixed(self.row))
    }

    fn get_date(&self, col: usize) -> i64 {
        self.check(col, &[ColumnType::Date, ColumnType::Long]);
        i64::from_le_bytes(self.column(col).fixed(self.row))
    }

    fn get_str(&self, col: usize) -> Option<&str> {
        self.check(col, &[ColumnType::String]);
        let bytes = self.column(col).var(self.row)?;
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[..4]);
        let len = i32::from_le_bytes(len);
        if len < 0 {
            return None;
        }
        std::str::from_utf8(&bytes[4..4 + len as usize]).ok()
    }

    fn get_sym(&self, col: usize) -> Option<&str> {
        self.check(col, &[ColumnType::Symbol]);
        let key = i32::from_le_bytes(self.column(col).fixed(self.row));
        self.facade.symbol_table(col)?.value(key)
    }

    fn get_bin(&self, col: usize) -> Option<BinarySequence<'_>> {
        self.check(col, &[ColumnType::Binary]);
        let bytes = self.column(col).var(self.row)?;
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[..8]);
        let len = i64::from_le_bytes(len);
        if len < 0 {
            return None;
        }
        Some(BinarySequence::contiguous(&bytes[8..8 + len as usize]))
    }

    fn row_id(&self) -> i64 {
        self.row_id
    }
}
