//! # Paged Arena
//!
//! `MemoryPages` is the append-only allocator underneath every materializing
//! structure in the engine (record lists, group-by maps, analytic state).
//! Memory is carved out of fixed-size pages and addressed by logical `u64`
//! offsets rather than pointers, so handles stay valid while the page list
//! grows.
//!
//! ## Layout
//!
//! ```text
//! logical offset:  0            page_size        2*page_size
//!                  │            │                │
//!                  ▼            ▼                ▼
//!                  ┌────────────┬────────────────┬──────────
//!                  │  page 0    │  page 1        │  page 2 ...
//!                  └────────────┴────────────────┴──────────
//!
//! page  = offset >> log2(page_size)
//! local = offset &  (page_size - 1)
//! ```
//!
//! ## Allocation Rules
//!
//! - `allocate(n)` never returns a region that straddles two pages. When the
//!   current page lacks room the cursor jumps to the next page boundary and
//!   the tail of the current page is wasted.
//! - `allocate_offset(n)` continues exactly at the cursor. It serves
//!   incremental writers (binary payloads) that ask `page_remaining` how much
//!   fits before each chunk.
//! - A single request larger than one page fails with [`AllocationTooLarge`].
//!
//! ## Lifecycle
//!
//! `clear()` rewinds the cursor to zero and keeps the pages for reuse, so
//! offsets handed out before a clear must not be read afterwards. `close()`
//! drops the pages; the arena remains usable and regrows on demand.

use eyre::{bail, ensure, Result};
use tracing::trace;

/// A single allocation request exceeded the arena's page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationTooLarge {
    pub requested: usize,
    pub page_size: usize,
}

impl std::fmt::Display for AllocationTooLarge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "allocation of {} bytes exceeds page size {}",
            self.requested, self.page_size
        )
    }
}

impl std::error::Error for AllocationTooLarge {}

/// Append-only arena of fixed-size pages addressed by logical offsets.
pub struct MemoryPages {
    pages: Vec<Box<[u8]>>,
    page_size: usize,
    bits: u32,
    mask: u64,
    cursor: u64,
}

impl std::fmt::Debug for MemoryPages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPages")
            .field("page_size", &self.page_size)
            .field("pages", &self.pages.len())
            .field("size", &self.cursor)
            .finish()
    }
}

impl MemoryPages {
    /// Creates an empty arena. `page_size` must be a power of two.
    pub fn new(page_size: usize) -> Result<Self> {
        ensure!(
            page_size.is_power_of_two() && page_size >= 8,
            "arena page size must be a power of two >= 8, got {}",
            page_size
        );

        Ok(Self {
            pages: Vec::new(),
            page_size,
            bits: page_size.trailing_zeros(),
            mask: (page_size - 1) as u64,
            cursor: 0,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total logical bytes handed out, including skipped page tails.
    pub fn size(&self) -> u64 {
        self.cursor
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Reserves `size` contiguous bytes that never cross a page boundary.
    pub fn allocate(&mut self, size: usize) -> Result<u64> {
        if size > self.page_size {
            bail!(AllocationTooLarge {
                requested: size,
                page_size: self.page_size,
            });
        }

        let remaining = self.page_remaining(self.cursor);
        if size > remaining {
            self.cursor += remaining as u64;
        }

        let offset = self.cursor;
        self.cursor += size as u64;
        self.ensure_pages(self.cursor);
        Ok(offset)
    }

    /// Reserves `size` bytes exactly at the cursor, without skipping to the
    /// next page. Callers bound `size` by [`page_remaining`](Self::page_remaining).
    pub fn allocate_offset(&mut self, size: usize) -> Result<u64> {
        let remaining = self.page_remaining(self.cursor);
        if size > remaining {
            bail!(AllocationTooLarge {
                requested: size,
                page_size: remaining,
            });
        }

        let offset = self.cursor;
        self.cursor += size as u64;
        self.ensure_pages(self.cursor.max(offset + 1));
        Ok(offset)
    }

    /// Bytes left in the page containing `offset`, counted from `offset`.
    #[inline]
    pub fn page_remaining(&self, offset: u64) -> usize {
        self.page_size - (offset & self.mask) as usize
    }

    /// Offset the next [`allocate_offset`](Self::allocate_offset) call returns.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// In-page view of `len` bytes at `offset`.
    #[inline]
    pub fn slice(&self, offset: u64, len: usize) -> &[u8] {
        if len == 0 {
            return &[];
        }
        let page = (offset >> self.bits) as usize;
        let local = (offset & self.mask) as usize;
        debug_assert!(local + len <= self.page_size, "read spans a page boundary");
        &self.pages[page][local..local + len]
    }

    #[inline]
    pub fn slice_mut(&mut self, offset: u64, len: usize) -> &mut [u8] {
        if len == 0 {
            return &mut [];
        }
        let page = (offset >> self.bits) as usize;
        let local = (offset & self.mask) as usize;
        debug_assert!(local + len <= self.page_size, "write spans a page boundary");
        &mut self.pages[page][local..local + len]
    }

    #[inline]
    pub fn read_i32(&self, offset: u64) -> i32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.slice(offset, 4));
        i32::from_le_bytes(buf)
    }

    #[inline]
    pub fn read_i64(&self, offset: u64) -> i64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.slice(offset, 8));
        i64::from_le_bytes(buf)
    }

    #[inline]
    pub fn write_i32(&mut self, offset: u64, value: i32) {
        self.slice_mut(offset, 4).copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn write_i64(&mut self, offset: u64, value: i64) {
        self.slice_mut(offset, 8).copy_from_slice(&value.to_le_bytes());
    }

    /// Rewinds the cursor. Pages are kept and reused by later allocations.
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Releases every page.
    pub fn close(&mut self) {
        self.pages = Vec::new();
        self.cursor = 0;
    }

    fn ensure_pages(&mut self, end: u64) {
        let needed = ((end + self.mask) >> self.bits) as usize;
        while self.pages.len() < needed {
            trace!(page = self.pages.len(), page_size = self.page_size, "arena page allocated");
            self.pages.push(vec![0u8; self.page_size].into_boxed_slice());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_monotonic_within_a_page() {
        let mut mem = MemoryPages::new(64).unwrap();
        assert_eq!(mem.allocate(8).unwrap(), 0);
        assert_eq!(mem.allocate(16).unwrap(), 8);
        assert_eq!(mem.allocate(4).unwrap(), 24);
        assert_eq!(mem.page_count(), 1);
    }

    #[test]
    fn allocation_skips_to_next_page_when_tail_is_short() {
        let mut mem = MemoryPages::new(64).unwrap();
        mem.allocate(60).unwrap();
        let offset = mem.allocate(8).unwrap();
        assert_eq!(offset, 64);
        assert_eq!(mem.page_count(), 2);
    }

    #[test]
    fn exact_page_fill_does_not_skip() {
        let mut mem = MemoryPages::new(64).unwrap();
        mem.allocate(32).unwrap();
        assert_eq!(mem.allocate(32).unwrap(), 32);
        assert_eq!(mem.allocate(1).unwrap(), 64);
    }

    #[test]
    fn oversized_allocation_is_rejected() {
        let mut mem = MemoryPages::new(64).unwrap();
        let err = mem.allocate(65).unwrap_err();
        let too_large = err.downcast_ref::<AllocationTooLarge>().unwrap();
        assert_eq!(too_large.requested, 65);
        assert_eq!(too_large.page_size, 64);
    }

    #[test]
    fn page_remaining_counts_from_offset() {
        let mem = MemoryPages::new(64).unwrap();
        assert_eq!(mem.page_remaining(0), 64);
        assert_eq!(mem.page_remaining(10), 54);
        assert_eq!(mem.page_remaining(64), 64);
        assert_eq!(mem.page_remaining(127), 1);
    }

    #[test]
    fn allocate_offset_continues_across_page_boundary() {
        let mut mem = MemoryPages::new(64).unwrap();
        mem.allocate(60).unwrap();
        let first = mem.allocate_offset(4).unwrap();
        assert_eq!(first, 60);
        let second = mem.allocate_offset(64).unwrap();
        assert_eq!(second, 64);
        assert_eq!(mem.page_count(), 2);
        assert!(mem.allocate_offset(65).is_err());
    }

    #[test]
    fn clear_rewinds_and_reuses_pages() {
        let mut mem = MemoryPages::new(64).unwrap();
        let offset = mem.allocate(8).unwrap();
        mem.write_i64(offset, 42);
        mem.allocate(64).unwrap();
        assert_eq!(mem.page_count(), 2);

        mem.clear();
        assert_eq!(mem.size(), 0);
        assert_eq!(mem.allocate(8).unwrap(), 0);
        assert_eq!(mem.page_count(), 2);
    }

    #[test]
    fn close_releases_pages_and_allows_reuse() {
        let mut mem = MemoryPages::new(64).unwrap();
        mem.allocate(64).unwrap();
        mem.close();
        assert_eq!(mem.page_count(), 0);
        let offset = mem.allocate(4).unwrap();
        mem.write_i32(offset, -7);
        assert_eq!(mem.read_i32(offset), -7);
    }

    #[test]
    fn rejects_non_power_of_two_page_size() {
        assert!(MemoryPages::new(100).is_err());
    }
}
