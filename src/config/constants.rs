//! # journaldb Configuration Constants
//!
//! This module centralizes the engine's numeric defaults, grouping values that
//! depend on each other and documenting their relationships. Operators read
//! their sizing from [`EngineConfig`](super::EngineConfig), which is seeded
//! from these constants.
//!
//! ## Dependency Graph
//!
//! ```text
//! MIN_PAGE_SIZE (1 KiB)
//!       │
//!       └─> DEFAULT_PAGE_SIZE (64 KiB, must be >= and a power of two)
//!             │
//!             ├─> DEFAULT_RECORD_LIST_PAGE_SIZE
//!             │     Bounds the longest string a RecordList can hold:
//!             │     STRING_LENGTH_PREFIX + bytes <= page size
//!             │
//!             └─> DEFAULT_MAP_PAGE_SIZE
//!                   One MultiMap entry (values + key) must fit in a page
//!
//! DEFAULT_RECORD_COUNT_HINT (100,000)
//!       │
//!       ├─> SYMBOL distinct count hint  = ceil_pow2(hint * 0.2) - 1
//!       └─> INDEXED distinct count hint = ceil_pow2(max(2, hint * 0.01)) - 1
//!
//! ROW_ID_PARTITION_SHIFT (44)
//!       └─> journal row id = partition_index << 44 | local_row
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{DEFAULT_PAGE_SIZE, MAX_ORDER_BY_COLUMNS};
//! ```

// ============================================================================
// ARENA PAGE SIZES
// Every arena-backed structure carves its memory out of fixed-size pages
// ============================================================================

/// Smallest page size accepted by [`EngineConfig`](super::EngineConfig).
pub const MIN_PAGE_SIZE: usize = 1024;

/// Default arena page size in bytes (64 KiB).
pub const DEFAULT_PAGE_SIZE: usize = 64 * 1024;

/// Page size used by record lists (join build side, buffered rows).
pub const DEFAULT_RECORD_LIST_PAGE_SIZE: usize = DEFAULT_PAGE_SIZE;

/// Page size used by group-by maps and analytic partition state.
pub const DEFAULT_MAP_PAGE_SIZE: usize = DEFAULT_PAGE_SIZE;

const _: () = assert!(
    DEFAULT_PAGE_SIZE.is_power_of_two() && MIN_PAGE_SIZE.is_power_of_two(),
    "arena page sizes must be powers of two"
);

const _: () = assert!(
    DEFAULT_PAGE_SIZE >= MIN_PAGE_SIZE,
    "DEFAULT_PAGE_SIZE must not be below MIN_PAGE_SIZE"
);

// ============================================================================
// RECORD LAYOUT
// ============================================================================

/// Size of the forward link at the head of each record list entry.
pub const RECORD_LINK_SIZE: usize = 8;

/// Width of one slot in the variable-column header.
pub const VAR_HEADER_SLOT_SIZE: usize = 8;

/// Length prefix written before string payloads.
pub const STRING_LENGTH_PREFIX: usize = 4;

/// Length prefix written before binary payloads.
pub const BINARY_LENGTH_PREFIX: usize = 8;

/// Length value marking a null string or binary payload.
pub const NULL_LENGTH: i32 = -1;

const _: () = assert!(
    RECORD_LINK_SIZE % 8 == 0 && VAR_HEADER_SLOT_SIZE == 8,
    "record list entries must stay 8-byte aligned"
);

// ============================================================================
// GROUP-BY MAP
// ============================================================================

/// Initial number of slots reserved in a MultiMap's hash table.
pub const DEFAULT_MAP_CAPACITY: usize = 64;

// ============================================================================
// METADATA HINTS
// ============================================================================

/// Expected rows per journal when the caller gives no hint.
pub const DEFAULT_RECORD_COUNT_HINT: usize = 100_000;

/// Average string size assumed for STRING columns without an explicit hint.
pub const DEFAULT_STRING_AVG_SIZE: usize = 12;

/// Average payload size assumed for BINARY columns declared without a hint.
pub const DEFAULT_BINARY_AVG_SIZE: usize = 64;

/// Buckets given to an indexed column lacking a usable distinct count hint.
pub const MIN_INDEX_BUCKETS: usize = 2;

// ============================================================================
// JOURNAL STORAGE
// ============================================================================

/// Bits reserved for the local row number inside a journal row id.
pub const ROW_ID_PARTITION_SHIFT: u32 = 44;

/// Mask selecting the local row number from a journal row id.
pub const ROW_ID_LOCAL_MASK: i64 = (1i64 << ROW_ID_PARTITION_SHIFT) - 1;

// ============================================================================
// QUERY PARSER LIMITS
// ============================================================================

/// Hard cap on order-by entries in a single query model.
pub const MAX_ORDER_BY_COLUMNS: usize = 1560;

/// Deepest nesting of expressions and sub-queries the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 128;
