//! Real-time capture loop
//!
//! Two states:
//!
//! - **Armed**: busy-poll the trigger source until it reads zero (capture
//!   complete). No sleeping here; the flag-to-transfer latency is the whole
//!   point. `poll_yield` adds a `yield_now` per poll on shared machines.
//! - **Draining**: transfer both channels, restart sampling, check the
//!   timing budget, persist the samples, re-arm the external trigger and
//!   check the cycle length.
//!
//! The loop ends when `flags_detected` reaches the target; there is no
//! other exit besides an error.

use super::backend::{AcquisitionBackend, Channel, TriggerSource};
use super::budget::TimingBudget;
use super::clock::Clock;
use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::sink::ChannelSink;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::thread;
use std::time::Duration;

/// Destination of the transferred samples
pub trait SampleSink {
    fn append(&mut self, channel: Channel, samples: &[i16]) -> Result<()>;
}

/// The two channel files
pub struct ChannelSinks<W: Write = BufWriter<File>> {
    pub ch1: ChannelSink<W>,
    pub ch2: ChannelSink<W>,
}

impl<W: Write> ChannelSinks<W> {
    /// Flush both files, returning the total bytes written
    pub fn finish(&mut self) -> Result<u64> {
        Ok(self.ch1.finish()? + self.ch2.finish()?)
    }
}

impl<W: Write> SampleSink for ChannelSinks<W> {
    fn append(&mut self, channel: Channel, samples: &[i16]) -> Result<()> {
        match channel {
            Channel::Ch1 => self.ch1.write_samples(samples),
            Channel::Ch2 => self.ch2.write_samples(samples),
        }
    }
}

/// Run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Ramp flags seen; never decreases
    pub flags_detected: u64,
    /// Cycles without enough slack to refill the buffer
    pub corrupt_count: u64,
    /// Flags estimated lost to overlong cycles; never decreases
    pub missed_count: u64,
}

/// Timing extremes, for the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTiming {
    pub longest_transfer: Duration,
    pub longest_loop: Duration,
    /// Trigger polls issued while armed
    pub polls: u64,
}

/// Loop parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub target_ramp_count: u64,
    pub budget: TimingBudget,
    pub ext_buffer_samples: usize,
    pub ref_buffer_samples: usize,
    pub refill_wait: bool,
    pub poll_yield: bool,
}

impl LoopSettings {
    pub fn from_experiment(config: &ExperimentConfig) -> Self {
        Self {
            target_ramp_count: config.target_ramp_count,
            budget: TimingBudget::new(config.max_loop_period(), config.buffer_fill_time()),
            ext_buffer_samples: config.ext_buffer_samples,
            ref_buffer_samples: config.ref_buffer_samples,
            refill_wait: config.refill_wait,
            poll_yield: config.poll_yield,
        }
    }
}

/// Capture loop state
pub struct AcquisitionLoop {
    settings: LoopSettings,
    counters: Counters,
    timing: CycleTiming,
    ext_buffer: Vec<i16>,
    ref_buffer: Vec<i16>,
}

impl AcquisitionLoop {
    pub fn new(settings: LoopSettings) -> Self {
        Self {
            ext_buffer: vec![0; settings.ext_buffer_samples],
            ref_buffer: vec![0; settings.ref_buffer_samples],
            settings,
            counters: Counters::default(),
            timing: CycleTiming::default(),
        }
    }

    /// Poll and drain until the target ramp count is reached
    pub fn run<B, C, S>(&mut self, backend: &mut B, clock: &C, sink: &mut S) -> Result<Counters>
    where
        B: AcquisitionBackend + ?Sized,
        C: Clock + ?Sized,
        S: SampleSink + ?Sized,
    {
        log::info!(
            "Capturing {} ramps (budget {} us, fill {:.1} us)",
            self.settings.target_ramp_count,
            self.settings.budget.max_loop_period().as_micros(),
            self.settings.budget.buffer_fill_time().as_secs_f64() * 1e6
        );

        while self.counters.flags_detected < self.settings.target_ramp_count {
            self.timing.polls += 1;
            if !backend.trigger_source()?.is_complete() {
                if self.settings.poll_yield {
                    thread::yield_now();
                }
                continue;
            }
            self.drain(backend, clock, sink)?;
        }

        Ok(self.counters)
    }

    fn drain<B, C, S>(&mut self, backend: &mut B, clock: &C, sink: &mut S) -> Result<()>
    where
        B: AcquisitionBackend + ?Sized,
        C: Clock + ?Sized,
        S: SampleSink + ?Sized,
    {
        let budget = self.settings.budget;
        let start = clock.now();
        self.counters.flags_detected += 1;

        let ext = backend.transfer_latest(Channel::Ch1, &mut self.ext_buffer)?;
        let reference = backend.transfer_latest(Channel::Ch2, &mut self.ref_buffer)?;
        backend.start_sampling()?;

        let transfer = clock.now().saturating_sub(start);
        self.timing.longest_transfer = self.timing.longest_transfer.max(transfer);
        if budget.is_corrupt(transfer) {
            self.counters.corrupt_count += 1;
            log::warn!("Data transfer took {:.2} us", transfer.as_secs_f64() * 1e6);
        } else if self.settings.refill_wait {
            clock.sleep(budget.buffer_fill_time());
        }

        sink.append(Channel::Ch1, &self.ext_buffer[..ext.min(self.ext_buffer.len())])?;
        sink.append(Channel::Ch2, &self.ref_buffer[..reference.min(self.ref_buffer.len())])?;

        backend.set_trigger_source(TriggerSource::ExternalRising)?;

        let loop_duration = clock.now().saturating_sub(start);
        self.timing.longest_loop = self.timing.longest_loop.max(loop_duration);
        let missed = budget.missed_ramps(loop_duration);
        if missed > 0 {
            self.counters.missed_count += missed;
            log::warn!("Loop took {:.2} us", loop_duration.as_secs_f64() * 1e6);
        }
        Ok(())
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn timing(&self) -> CycleTiming {
        self.timing
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }
}
