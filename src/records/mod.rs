//! # Records, Cursors and Materialized Rows
//!
//! This module defines how rows are described, read and buffered:
//!
//! - [`RecordMetadata`]: ordered column list plus the designated timestamp
//! - [`Record`] / [`RecordCursor`]: typed flyweight accessor and the pull
//!   iterator every operator implements
//! - [`StorageFacade`] / [`SymbolTable`]: per-cursor SYMBOL resolution
//! - [`RecordList`]: arena-backed append-only row store with row-id access
//! - [`FixRecordHolder`]: a single buffered row of fixed-width columns
//!
//! ## Storage Classes
//!
//! | Class | Types | Materialized as |
//! |-------|-------|-----------------|
//! | **Fixed** | BOOLEAN .. DATE, SYMBOL key | direct bytes at a pre-computed offset |
//! | **Variable** | STRING, BINARY | header slot -> length-prefixed arena payload |
//!
//! ## Module Structure
//!
//! - `metadata`: `RecordMetadata` and its hint-deriving builder
//! - `layout`: `RowLayout` pre-computed offsets
//! - `record`: `Record` and `RecordCursor` traits
//! - `binary`: `BinarySequence` lazy byte stream
//! - `symbol`: symbol tables and storage facades
//! - `list`: `RecordList`
//! - `holder`: `FixRecordHolder`

pub mod binary;
pub mod holder;
pub mod layout;
pub mod list;
pub mod metadata;
pub mod record;
pub mod symbol;


pub use binary::BinarySequence;
pub use holder::FixRecordHolder;
pub use layout::RowLayout;
pub use list::{ListRecord, RecordList};
pub use metadata::{RecordMetadata, RecordMetadataBuilder};
pub use record::{Record, RecordCursor};
pub use symbol::{NoSymbols, RemappedStorageFacade, StorageFacade, SymbolTable};
