//! Per-cycle timing budget
//!
//! A capture cycle has `max_loop_period` before the next ramp flag. After
//! the transfer the board needs `buffer_fill_time` to refill the capture
//! buffer; with less slack than that, the next capture mixes old and new
//! samples. A cycle longer than the period may have slept through flags.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingBudget {
    max_loop_period: Duration,
    buffer_fill_time: Duration,
}

impl TimingBudget {
    pub fn new(max_loop_period: Duration, buffer_fill_time: Duration) -> Self {
        Self {
            max_loop_period,
            buffer_fill_time,
        }
    }

    pub fn max_loop_period(&self) -> Duration {
        self.max_loop_period
    }

    pub fn buffer_fill_time(&self) -> Duration {
        self.buffer_fill_time
    }

    /// `max_loop_period - transfer < buffer_fill_time`
    ///
    /// A transfer longer than the whole period leaves no slack at all.
    pub fn is_corrupt(&self, transfer: Duration) -> bool {
        match self.max_loop_period.checked_sub(transfer) {
            Some(slack) => slack < self.buffer_fill_time,
            None => true,
        }
    }

    /// Flags possibly missed by a cycle of `loop_duration`:
    /// `floor(loop_duration / max_loop_period)` when over budget, else 0
    pub fn missed_ramps(&self, loop_duration: Duration) -> u64 {
        if loop_duration > self.max_loop_period && !self.max_loop_period.is_zero() {
            (loop_duration.as_nanos() / self.max_loop_period.as_nanos()) as u64
        } else {
            0
        }
    }
}
