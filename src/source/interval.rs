//! # Interval Filter
//!
//! `IntervalRecordSource` keeps the rows of a timestamp-ordered source whose
//! timestamp falls inside any of a list of ordered, non-overlapping
//! intervals. Both inputs are walked once, merge style:
//!
//! ```text
//! intervals:  [4 ........ 10]            [20 .. 30]
//! records:  1     5     9      14   18      25
//!           │     │     │      │    │       │
//!         skip  emit  emit  next-int skip  emit
//! ```
//!
//! | Comparison | Action |
//! |------------|--------|
//! | `interval.hi < ts` | fetch the next interval, keep the record |
//! | `interval.lo > ts` | fetch the next record |
//! | otherwise | emit the record |
//!
//! Interval bounds are inclusive. Neither input is checked for order; an
//! unsorted input produces an incomplete result rather than an error.

use std::sync::Arc;

use eyre::{bail, Result};

use super::{CancellationHandler, RecordSource};
use crate::records::{Record, RecordCursor, RecordMetadata, StorageFacade};
use crate::storage::JournalReaderFactory;

/// Closed time range `[lo, hi]` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lo: i64,
    pub hi: i64,
}

impl Interval {
    pub fn new(lo: i64, hi: i64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.lo && ts <= self.hi
    }
}

/// Restartable stream of intervals in ascending order.
pub trait IntervalSource {
    fn next_interval(&mut self) -> Option<Interval>;

    fn reset(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct ListIntervalSource {
    intervals: Vec<Interval>,
    pos: usize,
}

impl ListIntervalSource {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self { intervals, pos: 0 }
    }
}

impl IntervalSource for ListIntervalSource {
    fn next_interval(&mut self) -> Option<Interval> {
        let interval = self.intervals.get(self.pos).copied();
        if interval.is_some() {
            self.pos += 1;
        }
        interval
    }

    fn reset(&mut self) {
        self.pos = 0;
    }
}

pub struct IntervalRecordSource {
    delegate: Box<dyn RecordSource>,
    intervals: Box<dyn IntervalSource>,
    timestamp_index: usize,
    interval: Interval,
    need_interval: bool,
    need_record: bool,
    ready: bool,
}

impl IntervalRecordSource {
    pub fn new(delegate: Box<dyn RecordSource>, intervals: Box<dyn IntervalSource>) -> Result<Self> {
        let Some(timestamp_index) = delegate.metadata().timestamp_index() else {
            bail!("Source has no timestamp column");
        };
        Ok(Self {
            delegate,
            intervals,
            timestamp_index,
            interval: Interval::new(i64::MIN, i64::MIN),
            need_interval: true,
            need_record: true,
            ready: false,
        })
    }

    fn rewind(&mut self) {
        self.intervals.reset();
        self.need_interval = true;
        self.need_record = true;
        self.ready = false;
    }
}

impl RecordCursor for IntervalRecordSource {
    fn has_next(&mut self) -> Result<bool> {
        if self.ready {
            return Ok(true);
        }
        loop {
            if self.need_interval {
                match self.intervals.next_interval() {
                    Some(interval) => {
                        self.interval = interval;
                        self.need_interval = false;
                    }
                    None => return Ok(false),
                }
            }

            if self.need_record {
                if !self.delegate.has_next()? {
                    return Ok(false);
                }
                self.delegate.next()?;
                self.need_record = false;
            }

            let ts = self.delegate.record().get_date(self.timestamp_index);
            if self.interval.hi < ts {
                self.need_interval = true;
                continue;
            }
            if self.interval.lo > ts {
                self.need_record = true;
                continue;
            }

            self.need_record = true;
            self.ready = true;
            return Ok(true);
        }
    }

    fn next(&mut self) -> Result<&dyn Record> {
        if !self.has_next()? {
            bail!("Interval source has no more records");
        }
        self.ready = false;
        Ok(self.delegate.record())
    }

    fn record(&self) -> &dyn Record {
        self.delegate.record()
    }

    fn get_by_row_id(&mut self, row_id: i64) -> Result<&dyn Record> {
        self.delegate.get_by_row_id(row_id)
    }

    fn storage_facade(&self) -> Arc<dyn StorageFacade> {
        self.delegate.storage_facade()
    }
}

impl RecordSource for IntervalRecordSource {
    fn metadata(&self) -> &Arc<RecordMetadata> {
        self.delegate.metadata()
    }

    fn prepare_cursor(
        &mut self,
        factory: &dyn JournalReaderFactory,
        cancel: &Arc<dyn CancellationHandler>,
    ) -> Result<&mut dyn RecordCursor> {
        self.delegate.prepare_cursor(factory, cancel)?;
        self.rewind();
        Ok(self)
    }

    fn reset(&mut self) -> Result<()> {
        self.delegate.reset()?;
        self.rewind();
        Ok(())
    }

    fn supports_row_id_access(&self) -> bool {
        self.delegate.supports_row_id_access()
    }
}
