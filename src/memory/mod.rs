//! # Memory Management
//!
//! Raw memory for materialized rows, group-by state and analytic buffers is
//! owned by [`MemoryPages`], a paged append-only arena addressed by logical
//! offsets. Each arena belongs to exactly one structure (a `RecordList`, a
//! `MultiMap`, an analytic function); nothing shares an arena.
//!
//! ```text
//! RecordList ─┐
//! MultiMap  ──┼──> MemoryPages ──> [page 0][page 1][page 2] ...
//! prev()    ──┘
//! ```

pub mod pages;

pub use pages::{AllocationTooLarge, MemoryPages};
