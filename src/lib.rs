//! # journaldb - Embedded Columnar Time-Series Engine
//!
//! journaldb stores append-only journals of typed columns and answers
//! queries by composing pull-based record sources. It is built around:
//!
//! - **Paged arenas**: rows and variable-width values live in fixed-size
//!   pages, addressed by 64-bit offsets and never split across pages
//! - **Cursors as records**: sources expose the current row through typed
//!   getters instead of materializing values
//! - **Snapshot reads**: one writer per journal, readers see the last commit
//!
//! ## Quick Start
//!
//! ```ignore
//! use journaldb::storage::{JournalFactory, PartitionBy};
//! use journaldb::records::RecordMetadata;
//! use journaldb::source::{JournalRecordSource, NeverCancelled, RecordSource};
//! use journaldb::types::ColumnType;
//!
//! let factory = JournalFactory::new();
//! let metadata = RecordMetadata::builder()
//!     .column("sym", ColumnType::Symbol)
//!     .column("price", ColumnType::Double)
//!     .column("ts", ColumnType::Date)
//!     .timestamp("ts")
//!     .build()?;
//! let journal = factory.create("quotes", metadata, PartitionBy::Day)?;
//!
//! let mut writer = journal.writer()?;
//! writer.row(1_000)?.put_sym(0, "AAPL").put_double(1, 101.5).append()?;
//! writer.commit();
//!
//! let mut source = JournalRecordSource::new(&factory, "quotes")?;
//! let cursor = source.prepare_cursor(&factory, &NeverCancelled::handler())?;
//! while cursor.has_next()? {
//!     let record = cursor.next()?;
//!     println!("{:?} {}", record.get_sym(0), record.get_double(1));
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        sql: Lexer ──> Parser ──> Statement    │
//! ├──────────────────────────────────────────────┤
//! │  source: journal │ interval │ join │ select   │
//! │          aggregation │ analytic               │
//! ├──────────────────────────────────────────────┤
//! │   records: Record, RecordCursor, RecordList  │
//! │   map: MultiMap (composite-key group map)    │
//! ├──────────────────────────────────────────────┤
//! │   storage: Journal, partitions, snapshots    │
//! ├──────────────────────────────────────────────┤
//! │   memory: MemoryPages (paged arena)          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: constants and [`EngineConfig`]
//! - [`memory`]: paged off-heap arena
//! - [`types`]: column types, null sentinels, column metadata
//! - [`records`]: record/cursor traits, record metadata, `RecordList`
//! - [`map`]: `MultiMap` with pluggable value interceptors
//! - [`storage`]: in-memory partitioned journals
//! - [`source`]: composable record sources and cancellation
//! - [`sql`]: query lexer, parser and query model

#[macro_use]
mod macros;

pub mod config;
pub mod map;
pub mod memory;
pub mod records;
pub mod source;
pub mod sql;
pub mod storage;
pub mod types;

pub use config::EngineConfig;
pub use records::{Record, RecordCursor, RecordList, RecordMetadata};
pub use source::{CancellationHandler, RecordSource};
pub use sql::{ParseError, Parser, Statement};
pub use storage::{Journal, JournalFactory, JournalReaderFactory};
pub use types::{ColumnMetadata, ColumnType};
