//! Time source for the capture loop

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time as seen by the capture loop
pub trait Clock {
    /// Time since an arbitrary fixed origin
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Clock replaying a fixed list of timestamps
///
/// Each `now` returns the next scripted value; once the script is used up
/// the last value repeats. `sleep` only records the requested time.
#[derive(Debug, Default)]
pub struct ScriptedClock {
    script: Mutex<VecDeque<Duration>>,
    last: Mutex<Duration>,
    slept: Mutex<Vec<Duration>>,
}

impl ScriptedClock {
    pub fn new(times: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            script: Mutex::new(times.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Script for capture cycles given as `(transfer, loop)` durations
    ///
    /// The loop reads the clock three times per cycle: at the start, after
    /// the transfer and at the end. Cycles start `spacing` apart.
    pub fn from_cycles(cycles: &[(Duration, Duration)], spacing: Duration) -> Self {
        let mut times = Vec::with_capacity(cycles.len() * 3);
        for (i, &(transfer, total)) in cycles.iter().enumerate() {
            let start = spacing * i as u32;
            times.extend([start, start + transfer, start + total]);
        }
        Self::new(times)
    }

    /// Scripted timestamps not consumed yet
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    /// Every duration passed to `sleep`
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> Duration {
        let mut last = self.last.lock();
        if let Some(next) = self.script.lock().pop_front() {
            *last = next;
        }
        *last
    }

    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}
