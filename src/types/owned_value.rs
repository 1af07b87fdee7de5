//! # Heap-Owned Values
//!
//! Getters on flyweight records borrow from arena pages or partition columns
//! and stop being valid once the cursor moves. `OwnedValue` copies a single
//! column value out so it can outlive the row it came from.
//!
//! ## Display
//!
//! `Display` renders values the way row printers expect: null fixed-width
//! sentinels print as `NaN` (numbers) or nothing (dates), missing strings and
//! symbols print as an empty string.
//!
//! ```ignore
//! let genre = OwnedValue::read(record, 2, ColumnType::Symbol);
//! assert_eq!(genre.to_string(), "pop");
//! ```

use std::io::Read;

use super::{ColumnType, DATE_NULL, INT_NULL, LONG_NULL};
use crate::records::Record;

/// Owned copy of one column value.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Date(i64),
    Str(Option<String>),
    Sym(Option<String>),
    Bin(Option<Vec<u8>>),
}

impl OwnedValue {
    /// Copies column `col` of `record`, reading it as `column_type`.
    pub fn read(record: &dyn Record, col: usize, column_type: ColumnType) -> OwnedValue {
        match column_type {
            ColumnType::Boolean => OwnedValue::Boolean(record.get_bool(col)),
            ColumnType::Byte => OwnedValue::Byte(record.get_byte(col)),
            ColumnType::Short => OwnedValue::Short(record.get_short(col)),
            ColumnType::Int => OwnedValue::Int(record.get_int(col)),
            ColumnType::Long => OwnedValue::Long(record.get_long(col)),
            ColumnType::Float => OwnedValue::Float(record.get_float(col)),
            ColumnType::Double => OwnedValue::Double(record.get_double(col)),
            ColumnType::Date => OwnedValue::Date(record.get_date(col)),
            ColumnType::String => OwnedValue::Str(record.get_str(col).map(str::to_owned)),
            ColumnType::Symbol => OwnedValue::Sym(record.get_sym(col).map(str::to_owned)),
            ColumnType::Binary => OwnedValue::Bin(record.get_bin(col).map(|mut bin| {
                let mut bytes = Vec::with_capacity(bin.len());
                // reading from in-memory chunks cannot fail
                let _ = bin.read_to_end(&mut bytes);
                bytes
            })),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            OwnedValue::Boolean(_) => ColumnType::Boolean,
            OwnedValue::Byte(_) => ColumnType::Byte,
            OwnedValue::Short(_) => ColumnType::Short,
            OwnedValue::Int(_) => ColumnType::Int,
            OwnedValue::Long(_) => ColumnType::Long,
            OwnedValue::Float(_) => ColumnType::Float,
            OwnedValue::Double(_) => ColumnType::Double,
            OwnedValue::Date(_) => ColumnType::Date,
            OwnedValue::Str(_) => ColumnType::String,
            OwnedValue::Sym(_) => ColumnType::Symbol,
            OwnedValue::Bin(_) => ColumnType::Binary,
        }
    }

    /// True for the type's null sentinel (NaN counts as null for floats).
    pub fn is_null(&self) -> bool {
        match self {
            OwnedValue::Boolean(_) | OwnedValue::Byte(_) | OwnedValue::Short(_) => false,
            OwnedValue::Int(v) => *v == INT_NULL,
            OwnedValue::Long(v) => *v == LONG_NULL,
            OwnedValue::Date(v) => *v == DATE_NULL,
            OwnedValue::Float(v) => v.is_nan(),
            OwnedValue::Double(v) => v.is_nan(),
            OwnedValue::Str(v) | OwnedValue::Sym(v) => v.is_none(),
            OwnedValue::Bin(v) => v.is_none(),
        }
    }
}

impl std::fmt::Display for OwnedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnedValue::Boolean(v) => write!(f, "{}", v),
            OwnedValue::Byte(v) => write!(f, "{}", v),
            OwnedValue::Short(v) => write!(f, "{}", v),
            OwnedValue::Int(v) if *v == INT_NULL => f.write_str("NaN"),
            OwnedValue::Int(v) => write!(f, "{}", v),
            OwnedValue::Long(v) if *v == LONG_NULL => f.write_str("NaN"),
            OwnedValue::Long(v) => write!(f, "{}", v),
            OwnedValue::Float(v) => write!(f, "{}", v),
            OwnedValue::Double(v) => write!(f, "{}", v),
            OwnedValue::Date(v) if *v == DATE_NULL => Ok(()),
            OwnedValue::Date(v) => write!(f, "{}", v),
            OwnedValue::Str(v) | OwnedValue::Sym(v) => f.write_str(v.as_deref().unwrap_or("")),
            OwnedValue::Bin(Some(v)) => write!(f, "<{} bytes>", v.len()),
            OwnedValue::Bin(None) => Ok(()),
        }
    }
}
