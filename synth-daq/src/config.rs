//! Configuration for synth-daq
//!
//! Loads the experiment, sensor, acquisition and synthesizer parameters
//! from a TOML file. Every section except `[synth]` has defaults matching
//! the bench setup, so a minimal file only describes the ramps.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ADC sample clock of the acquisition board
pub const ADC_SAMPLE_RATE_HZ: f64 = 125e6;
/// Samples held by one channel's capture buffer
pub const ADC_BUFFER_SIZE: usize = 16384;
/// Decimation factors accepted by the acquisition board
pub const VALID_DECIMATIONS: [u32; 6] = [1, 8, 64, 1024, 8192, 65536];
/// Ramps per synthesizer
pub const MAX_RAMPS: usize = 8;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    pub synth: SynthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Capture timing and output
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of ramps to capture before the session ends
    pub target_ramp_count: u64,
    /// Time budget of one capture cycle, microseconds
    pub max_loop_period_us: u64,
    /// ADC decimation factor
    pub decimation: u32,
    /// Samples transferred per cycle from the beat-signal channel
    pub ext_buffer_samples: usize,
    /// Samples transferred per cycle from the reference channel
    pub ref_buffer_samples: usize,
    /// Trigger delay in samples (negative: capture before the trigger)
    pub trigger_delay: i32,
    /// Override for the computed buffer fill time, microseconds
    pub buffer_fill_us: Option<u64>,
    /// Sleep out the remaining fill time after a fast transfer
    pub refill_wait: bool,
    /// Yield the CPU between trigger polls
    pub poll_yield: bool,
    /// Directory receiving ch1.bin, ch2.bin and imu.bin
    pub storage_dir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            target_ramp_count: 1000,
            max_loop_period_us: 950,
            decimation: 8,
            ext_buffer_samples: 1280,
            ref_buffer_samples: 100,
            trigger_delay: -(ADC_BUFFER_SIZE as i32 / 2),
            buffer_fill_us: None,
            refill_wait: false,
            poll_yield: false,
            storage_dir: PathBuf::from("./data"),
        }
    }
}

impl ExperimentConfig {
    /// Time the board needs to fill one capture buffer
    ///
    /// `1.1 × ext_buffer_samples × decimation / 125 MHz` unless overridden.
    pub fn buffer_fill_time(&self) -> Duration {
        match self.buffer_fill_us {
            Some(us) => Duration::from_micros(us),
            None => Duration::from_secs_f64(
                1.1 * self.ext_buffer_samples as f64 * self.decimation as f64
                    / ADC_SAMPLE_RATE_HZ,
            ),
        }
    }

    pub fn max_loop_period(&self) -> Duration {
        Duration::from_micros(self.max_loop_period_us)
    }

    pub fn channel1_path(&self) -> PathBuf {
        self.storage_dir.join("ch1.bin")
    }

    pub fn channel2_path(&self) -> PathBuf {
        self.storage_dir.join("ch2.bin")
    }

    pub fn sensor_path(&self) -> PathBuf {
        self.storage_dir.join("imu.bin")
    }
}

/// What the sensor reader writes to imu.bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// 12 native-endian f32 per all-processed batch
    #[default]
    Processed,
    /// The byte stream as received
    Raw,
}

/// UM7 attitude sensor
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Run the sensor bring-up and reader thread
    pub enabled: bool,
    /// Serial port device
    pub port: String,
    pub baud_rate: u32,
    pub mode: SensorMode,
    /// All-processed broadcast rate (CREG_COM_RATES4 byte 3, 255 = max)
    pub all_proc_rate: u8,
    /// Health packet rate code (CREG_COM_RATES6 bits 16..19, 0 = off)
    pub health_rate: u8,
    /// Bytes to scan for the first health packet during bring-up
    pub heartbeat_timeout_bytes: usize,
    /// Transport reads per register reply window
    pub response_polls: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: "/dev/ttyPS1".to_string(),
            baud_rate: 115_200,
            mode: SensorMode::Processed,
            all_proc_rate: 255,
            health_rate: 4,
            heartbeat_timeout_bytes: 8192,
            response_polls: 40,
        }
    }
}

/// Simulated acquisition board (used when no vendor backend is linked)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Interval between simulated trigger events, microseconds
    pub trigger_period_us: u64,
    /// Beat tone frequency on channel 1, Hz
    pub beat_frequency_hz: f64,
    /// Tone amplitude in ADC counts
    pub amplitude: f32,
    /// Gaussian noise in ADC counts
    pub noise_stddev: f32,
    /// Noise seed (0 = random)
    pub seed: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            trigger_period_us: 1000,
            beat_frequency_hz: 250e3,
            amplitude: 4000.0,
            noise_stddev: 40.0,
            seed: 0,
        }
    }
}

/// Synthesizer pair
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthConfig {
    /// Phase detector frequency, Hz
    pub phase_detector_hz: f64,
    /// Integer part of the feedback divider
    pub integer_n: u32,
    /// Register template seeding every device's image
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default)]
    pub devices: Vec<SynthDeviceConfig>,
}

/// One synthesizer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthDeviceConfig {
    /// Device number (1 or 2)
    pub number: u8,
    /// Fractional numerator of the start frequency (24 bits)
    #[serde(default)]
    pub frac_num: u32,
    #[serde(default)]
    pub ramps: Vec<RampConfig>,
}

/// One ramp segment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RampConfig {
    /// Frequency sweep of the segment, Hz (negative sweeps down)
    pub bandwidth_hz: f64,
    /// Segment duration, seconds
    pub duration_s: f64,
    /// Ramp to continue with (0..7)
    #[serde(default)]
    pub next: u8,
    /// Trigger selecting the transition (0..3)
    #[serde(default)]
    pub trigger: u8,
    /// Reset the accumulator at the segment start
    #[serde(default)]
    pub reset: bool,
    /// Raise the ramp flag output during this segment
    #[serde(default)]
    pub flag: bool,
    /// Double each step's duration
    #[serde(default)]
    pub doubler: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Example
    /// ```no_run
    /// use synth_daq::config::Config;
    ///
    /// let config = Config::load("synth-daq.toml")?;
    /// # Ok::<(), synth_daq::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges the hardware depends on
    pub fn validate(&self) -> Result<()> {
        let exp = &self.experiment;
        if exp.target_ramp_count == 0 {
            return Err(invalid("experiment.target_ramp_count", "must be at least 1"));
        }
        if exp.max_loop_period_us == 0 {
            return Err(invalid("experiment.max_loop_period_us", "must be positive"));
        }
        if !VALID_DECIMATIONS.contains(&exp.decimation) {
            return Err(invalid(
                "experiment.decimation",
                &format!("{} is not one of {:?}", exp.decimation, VALID_DECIMATIONS),
            ));
        }
        for (key, samples) in [
            ("experiment.ext_buffer_samples", exp.ext_buffer_samples),
            ("experiment.ref_buffer_samples", exp.ref_buffer_samples),
        ] {
            if samples == 0 || samples > ADC_BUFFER_SIZE {
                return Err(invalid(
                    key,
                    &format!("must be within 1..={}", ADC_BUFFER_SIZE),
                ));
            }
        }

        if self.sensor.health_rate > 0x0F {
            return Err(invalid("sensor.health_rate", "rate code is 4 bits"));
        }
        if self.sensor.response_polls == 0 {
            return Err(invalid("sensor.response_polls", "must be at least 1"));
        }

        if self.acquisition.trigger_period_us == 0 {
            return Err(invalid("acquisition.trigger_period_us", "must be positive"));
        }

        let synth = &self.synth;
        if !(synth.phase_detector_hz > 0.0) {
            return Err(invalid("synth.phase_detector_hz", "must be positive"));
        }
        if synth.devices.len() > 2 {
            return Err(invalid("synth.devices", "at most two synthesizers"));
        }
        for device in &synth.devices {
            if !(1..=2).contains(&device.number) {
                return Err(invalid("synth.devices.number", "must be 1 or 2"));
            }
            if synth.devices.iter().filter(|d| d.number == device.number).count() > 1 {
                return Err(invalid(
                    "synth.devices.number",
                    &format!("synthesizer {} listed twice", device.number),
                ));
            }
            if device.frac_num >= 1 << 24 {
                return Err(invalid("synth.devices.frac_num", "fractional numerator is 24 bits"));
            }
            if device.ramps.len() > MAX_RAMPS {
                return Err(invalid(
                    "synth.devices.ramps",
                    &format!("at most {} ramps per synthesizer", MAX_RAMPS),
                ));
            }
            for ramp in &device.ramps {
                if ramp.next > 7 {
                    return Err(invalid("synth.devices.ramps.next", "must be within 0..=7"));
                }
                if ramp.trigger > 3 {
                    return Err(invalid("synth.devices.ramps.trigger", "must be within 0..=3"));
                }
                if !(ramp.duration_s > 0.0) {
                    return Err(invalid("synth.devices.ramps.duration_s", "must be positive"));
                }
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::InvalidParameter(format!("{}: {}", key, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[synth]
phase_detector_hz = 100e6
integer_n = 60

[[synth.devices]]
number = 1

[[synth.devices.ramps]]
bandwidth_hz = 150e6
duration_s = 500e-6
next = 1

[[synth.devices.ramps]]
bandwidth_hz = -150e6
duration_s = 500e-6
reset = true
"#;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.experiment.target_ramp_count, 1000);
        assert_eq!(config.experiment.max_loop_period_us, 950);
        assert_eq!(config.experiment.ext_buffer_samples, 1280);
        assert_eq!(config.experiment.ref_buffer_samples, 100);
        assert_eq!(config.experiment.trigger_delay, -8192);
        assert!(!config.experiment.refill_wait);
        assert_eq!(config.sensor.mode, SensorMode::Processed);
        assert_eq!(config.logging.level, "info");

        let device = &config.synth.devices[0];
        assert_eq!(device.ramps.len(), 2);
        assert_eq!(device.ramps[0].next, 1);
        assert!(device.ramps[1].reset);
        assert!(!device.ramps[1].doubler);
    }

    #[test]
    fn test_buffer_fill_time() {
        let mut exp = ExperimentConfig::default();
        // 1.1 * 1280 * 8 / 125e6 = 90.112 us
        approx::assert_relative_eq!(
            exp.buffer_fill_time().as_secs_f64(),
            90.112e-6,
            max_relative = 1e-6
        );

        exp.buffer_fill_us = Some(800);
        assert_eq!(exp.buffer_fill_time(), Duration::from_micros(800));
    }

    #[test]
    fn test_sections_override() {
        let text = format!(
            "{}\n[experiment]\ntarget_ramp_count = 3\ndecimation = 64\nstorage_dir = \"/tmp/run\"\n\n[sensor]\nmode = \"raw\"\nenabled = false\n",
            MINIMAL
        );
        let config = Config::from_toml(&text).unwrap();
        assert_eq!(config.experiment.target_ramp_count, 3);
        assert_eq!(config.experiment.decimation, 64);
        assert_eq!(config.experiment.channel1_path(), PathBuf::from("/tmp/run/ch1.bin"));
        assert_eq!(config.sensor.mode, SensorMode::Raw);
        assert!(!config.sensor.enabled);
    }

    #[test]
    fn test_validation_names_the_key() {
        let text = format!("{}\n[experiment]\ndecimation = 3\n", MINIMAL);
        match Config::from_toml(&text) {
            Err(Error::InvalidParameter(msg)) => assert!(msg.starts_with("experiment.decimation")),
            other => panic!("unexpected result: {:?}", other),
        }

        let text = MINIMAL.replace("next = 1", "next = 9");
        assert!(matches!(
            Config::from_toml(&text),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_synth_section_is_a_parse_error() {
        assert!(matches!(Config::from_toml(""), Err(Error::Config(_))));
    }
}
