//! # Column Types
//!
//! `ColumnType` is the storage-level discriminant shared by metadata, record
//! layouts, map keys and the query parser.
//!
//! ## Type Categories
//!
//! | Category | Types | Fixed Size |
//! |----------|-------|------------|
//! | **Boolean** | Boolean | 1 byte |
//! | **Integer** | Byte, Short, Int, Long | 1, 2, 4, 8 bytes |
//! | **Float** | Float, Double | 4, 8 bytes |
//! | **Time** | Date (epoch millis) | 8 bytes |
//! | **Dictionary** | Symbol (int key into a symbol table) | 4 bytes |
//! | **Variable** | String, Binary | stored indirectly |
//!
//! ## Null Sentinels
//!
//! Fixed-width columns have no null bitmap; a reserved value stands in for
//! null instead. Readers that need to synthesize a missing row (outer joins,
//! the first row seen by `prev()`) return these values.

/// Null value of INT columns.
pub const INT_NULL: i32 = i32::MIN;

/// Null value of LONG columns.
pub const LONG_NULL: i64 = i64::MIN;

/// Null value of DATE columns.
pub const DATE_NULL: i64 = i64::MIN;

/// Symbol table key of a null symbol.
pub const SYMBOL_NULL_KEY: i32 = -1;

/// Storage type of a column.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Boolean = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    Date = 7,
    String = 8,
    Symbol = 9,
    Binary = 10,
}

impl ColumnType {
    /// Byte width in fixed-width storage, 0 for indirectly stored types.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            ColumnType::Boolean | ColumnType::Byte => 1,
            ColumnType::Short => 2,
            ColumnType::Int | ColumnType::Symbol | ColumnType::Float => 4,
            ColumnType::Long | ColumnType::Double | ColumnType::Date => 8,
            ColumnType::String | ColumnType::Binary => 0,
        }
    }

    #[inline]
    pub const fn is_fixed(self) -> bool {
        self.size() != 0
    }

    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnType::Byte
                | ColumnType::Short
                | ColumnType::Int
                | ColumnType::Long
                | ColumnType::Float
                | ColumnType::Double
                | ColumnType::Date
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Byte => "BYTE",
            ColumnType::Short => "SHORT",
            ColumnType::Int => "INT",
            ColumnType::Long => "LONG",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Date => "DATE",
            ColumnType::String => "STRING",
            ColumnType::Symbol => "SYMBOL",
            ColumnType::Binary => "BINARY",
        }
    }

    /// Parses a type name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<ColumnType> {
        const ALL: [ColumnType; 11] = [
            ColumnType::Boolean,
            ColumnType::Byte,
            ColumnType::Short,
            ColumnType::Int,
            ColumnType::Long,
            ColumnType::Float,
            ColumnType::Double,
            ColumnType::Date,
            ColumnType::String,
            ColumnType::Symbol,
            ColumnType::Binary,
        ];
        ALL.into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_widths() {
        assert_eq!(ColumnType::Boolean.size(), 1);
        assert_eq!(ColumnType::Short.size(), 2);
        assert_eq!(ColumnType::Symbol.size(), 4);
        assert_eq!(ColumnType::Date.size(), 8);
        assert_eq!(ColumnType::String.size(), 0);
        assert!(!ColumnType::Binary.is_fixed());
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(ColumnType::from_name("symbol"), Some(ColumnType::Symbol));
        assert_eq!(ColumnType::from_name("Double"), Some(ColumnType::Double));
        assert_eq!(ColumnType::from_name("VARCHAR"), None);
    }
}
