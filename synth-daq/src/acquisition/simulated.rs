//! Software acquisition board
//!
//! Completes an armed capture once `trigger_period` has elapsed since the
//! trigger was armed, standing in for the synthesizer ramp flag. Channel 1
//! carries a noisy beat tone, channel 2 a clean sawtooth at the ramp rate.

use super::backend::{AcquisitionBackend, Channel, TriggerSource};
use crate::config::{AcquisitionConfig, ADC_BUFFER_SIZE, ADC_SAMPLE_RATE_HZ, VALID_DECIMATIONS};
use crate::error::{Error, Result};
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

/// Gaussian noise source
///
/// Seed 0 draws from entropy; anything else is reproducible.
struct Noise {
    rng: SmallRng,
}

impl Noise {
    fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    #[inline]
    fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        n * stddev
    }
}

/// Calls issued against the simulated board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub sampling_starts: u64,
    pub trigger_polls: u64,
    pub arms: u64,
    pub transfers: u64,
    pub samples: u64,
}

pub struct SimulatedBackend {
    config: AcquisitionConfig,
    trigger_period: Duration,
    noise: Noise,
    decimation: u32,
    trigger_delay: i32,
    trigger: TriggerSource,
    armed_at: Option<Instant>,
    sampling: bool,
    /// Absolute sample index of the next transferred sample
    position: u64,
    stats: BackendStats,
}

impl SimulatedBackend {
    pub fn new(config: &AcquisitionConfig) -> Self {
        Self {
            trigger_period: Duration::from_micros(config.trigger_period_us),
            noise: Noise::new(config.seed),
            config: config.clone(),
            decimation: 1,
            trigger_delay: 0,
            trigger: TriggerSource::Disabled,
            armed_at: None,
            sampling: false,
            position: 0,
            stats: BackendStats::default(),
        }
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    pub fn decimation(&self) -> u32 {
        self.decimation
    }

    pub fn trigger_delay(&self) -> i32 {
        self.trigger_delay
    }

    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    fn sample_rate(&self) -> f64 {
        ADC_SAMPLE_RATE_HZ / f64::from(self.decimation)
    }

    fn sample(&mut self, channel: Channel, index: u64) -> i16 {
        let t = index as f64 / self.sample_rate();
        let amplitude = f64::from(self.config.amplitude);
        let clean = match channel {
            Channel::Ch1 => amplitude * (TAU * self.config.beat_frequency_hz * t).sin(),
            Channel::Ch2 => {
                let period = self.trigger_period.as_secs_f64();
                if period > 0.0 {
                    amplitude * (2.0 * (t / period).fract() - 1.0)
                } else {
                    0.0
                }
            }
        };
        let noisy = match channel {
            Channel::Ch1 => clean + f64::from(self.noise.gaussian(self.config.noise_stddev)),
            Channel::Ch2 => clean,
        };
        noisy.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
    }
}

impl AcquisitionBackend for SimulatedBackend {
    fn start_sampling(&mut self) -> Result<()> {
        self.stats.sampling_starts += 1;
        self.sampling = true;
        Ok(())
    }

    fn set_decimation(&mut self, decimation: u32) -> Result<()> {
        if !VALID_DECIMATIONS.contains(&decimation) {
            return Err(Error::Backend(format!("unsupported decimation {}", decimation)));
        }
        self.decimation = decimation;
        Ok(())
    }

    fn set_trigger_delay(&mut self, delay: i32) -> Result<()> {
        self.trigger_delay = delay;
        Ok(())
    }

    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<()> {
        self.trigger = source;
        self.armed_at = match source {
            TriggerSource::Disabled => None,
            _ => {
                self.stats.arms += 1;
                Some(Instant::now())
            }
        };
        Ok(())
    }

    fn trigger_source(&mut self) -> Result<TriggerSource> {
        self.stats.trigger_polls += 1;
        if let Some(armed_at) = self.armed_at {
            if self.sampling && armed_at.elapsed() >= self.trigger_period {
                self.trigger = TriggerSource::Disabled;
                self.armed_at = None;
                // Next capture starts one ramp later
                self.position += (self.trigger_period.as_secs_f64() * self.sample_rate()) as u64;
            }
        }
        Ok(self.trigger)
    }

    fn transfer_latest(&mut self, channel: Channel, buffer: &mut [i16]) -> Result<usize> {
        if !self.sampling {
            return Err(Error::Backend("transfer before sampling started".into()));
        }
        let count = buffer.len().min(ADC_BUFFER_SIZE);
        let start = self.position;
        for (i, slot) in buffer[..count].iter_mut().enumerate() {
            *slot = self.sample(channel, start + i as u64);
        }
        self.stats.transfers += 1;
        self.stats.samples += count as u64;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> AcquisitionConfig {
        AcquisitionConfig {
            trigger_period_us: 0,
            seed,
            ..AcquisitionConfig::default()
        }
    }

    #[test]
    fn test_capture_completes_after_period() {
        let mut backend = SimulatedBackend::new(&config(7));
        backend.set_decimation(8).unwrap();
        backend.start_sampling().unwrap();

        assert_eq!(backend.trigger_source().unwrap(), TriggerSource::Disabled);
        backend.set_trigger_source(TriggerSource::ExternalRising).unwrap();
        assert!(backend.trigger_source().unwrap().is_complete());

        let mut slow = SimulatedBackend::new(&AcquisitionConfig {
            trigger_period_us: 60_000_000,
            ..config(7)
        });
        slow.start_sampling().unwrap();
        slow.set_trigger_source(TriggerSource::ExternalRising).unwrap();
        assert_eq!(slow.trigger_source().unwrap(), TriggerSource::ExternalRising);
        assert_eq!(slow.stats().trigger_polls, 1);
    }

    #[test]
    fn test_seeded_samples_repeat() {
        let mut a = SimulatedBackend::new(&config(42));
        let mut b = SimulatedBackend::new(&config(42));
        let (mut buf_a, mut buf_b) = (vec![0i16; 256], vec![0i16; 256]);
        for backend in [&mut a, &mut b] {
            backend.set_decimation(8).unwrap();
            backend.start_sampling().unwrap();
        }
        assert_eq!(a.transfer_latest(Channel::Ch1, &mut buf_a).unwrap(), 256);
        b.transfer_latest(Channel::Ch1, &mut buf_b).unwrap();
        assert_eq!(buf_a, buf_b);
        assert!(buf_a.iter().any(|&s| s != 0));
        assert_eq!(a.stats().samples, 256);
    }

    #[test]
    fn test_transfer_clamped_to_board_buffer() {
        let mut backend = SimulatedBackend::new(&config(1));
        backend.start_sampling().unwrap();
        let mut big = vec![0i16; ADC_BUFFER_SIZE + 10];
        assert_eq!(
            backend.transfer_latest(Channel::Ch2, &mut big).unwrap(),
            ADC_BUFFER_SIZE
        );
    }

    #[test]
    fn test_rejects_bad_decimation_and_early_transfer() {
        let mut backend = SimulatedBackend::new(&config(1));
        assert!(matches!(backend.set_decimation(3), Err(Error::Backend(_))));
        let mut buf = [0i16; 4];
        assert!(backend.transfer_latest(Channel::Ch1, &mut buf).is_err());
    }
}
