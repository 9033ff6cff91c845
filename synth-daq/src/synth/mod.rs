//! Frequency-ramp synthesizers
//!
//! Ramp parameters from the configuration are turned into increment/length
//! pairs (`ramp`), encoded as width-tagged fields (`bits`) and inserted into
//! a per-device register image (`image`) according to the register map
//! (`layout`). The finished image is shifted out over a `SynthBus`.

pub mod bits;
pub mod bus;
pub mod image;
pub mod layout;
pub mod ramp;
pub mod template;

pub use bits::BitField;
pub use bus::{BusEvent, RecordingBus, SynthBus};
pub use image::RegisterImage;
pub use layout::{RegisterLayout, NUM_REGISTERS};
pub use ramp::{bnw_out, vco_out, Ramp, RampFields};
pub use template::{load_template, parse_template};

use crate::config::{SynthConfig, SynthDeviceConfig, MAX_RAMPS};
use crate::error::{Error, Result};
use layout::{RAMP_CONTROL_REGISTER, RESET_REGISTER, RESET_VALUE};
use ramp::FRAC_NUM_WIDTH;

/// One synthesizer with its finished register image
#[derive(Debug, Clone)]
pub struct Synthesizer {
    number: u8,
    ramps: Vec<Ramp>,
    frac_num: BitField,
    image: RegisterImage,
    f_pd: f64,
    integer_n: u32,
}

impl Synthesizer {
    /// Derive ramps and build the image on top of `template`
    pub fn new(device: &SynthDeviceConfig, synth: &SynthConfig, template: &RegisterImage) -> Result<Self> {
        if device.ramps.len() > MAX_RAMPS {
            return Err(Error::InvalidParameter(format!(
                "synth {}: {} ramps, at most {}",
                device.number,
                device.ramps.len(),
                MAX_RAMPS
            )));
        }

        let ramps = device
            .ramps
            .iter()
            .enumerate()
            .map(|(i, config)| Ramp::from_config(i, config, synth.phase_detector_hz))
            .collect::<Result<Vec<_>>>()?;
        let frac_num = BitField::unsigned("frac_num", device.frac_num as u64, FRAC_NUM_WIDTH)?;

        let mut image = template.clone();
        for ramp in &ramps {
            image.insert(ramp.index, &ramp.encode()?)?;
        }
        image.insert_frac_num(&frac_num)?;

        Ok(Self {
            number: device.number,
            ramps,
            frac_num,
            image,
            f_pd: synth.phase_detector_hz,
            integer_n: synth.integer_n,
        })
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn ramps(&self) -> &[Ramp] {
        &self.ramps
    }

    pub fn image(&self) -> &RegisterImage {
        &self.image
    }

    /// Start frequency, Hz
    pub fn start_frequency(&self) -> f64 {
        vco_out(self.f_pd, self.integer_n, self.frac_num.raw())
    }

    /// Software reset, then every register from the highest address down
    pub fn program<B: SynthBus + ?Sized>(&self, bus: &mut B) -> Result<()> {
        bus.write_register(self.number, RESET_REGISTER, RESET_VALUE)?;
        for (address, value) in self.image.write_order() {
            bus.write_register(self.number, address, value)?;
        }
        log::info!(
            "Synth {} programmed: {} ramps, start {:.6} GHz",
            self.number,
            self.ramps.len(),
            self.start_frequency() / 1e9
        );
        Ok(())
    }

    /// Toggle RAMP_EN in the image and on the device
    pub fn set_ramping<B: SynthBus + ?Sized>(&mut self, bus: &mut B, enabled: bool) -> Result<()> {
        let value = self.image.set_ramp_enable(enabled);
        bus.write_register(self.number, RAMP_CONTROL_REGISTER, value)
    }

    /// Log the derived ramp parameters
    pub fn log_ramps(&self) {
        for ramp in &self.ramps {
            log::info!(
                "Synth {} ramp {}: {:.3} MHz over {:.1} us -> inc {} x len {} ({:.3} MHz), next {}",
                self.number,
                ramp.index,
                ramp.bandwidth / 1e6,
                ramp.duration * 1e6,
                ramp.increment(),
                ramp.length(),
                ramp.programmed_bandwidth(self.f_pd) / 1e6,
                ramp.next
            );
        }
    }
}

/// Both synthesizers and the bus they hang off
pub struct SynthRig<B: SynthBus> {
    synths: Vec<Synthesizer>,
    bus: B,
}

impl<B: SynthBus> SynthRig<B> {
    pub fn new(synths: Vec<Synthesizer>, bus: B) -> Self {
        Self { synths, bus }
    }

    /// Build every configured synthesizer
    ///
    /// Each image starts from the template, or from all zeros when no
    /// template is configured.
    pub fn from_config(config: &SynthConfig, bus: B) -> Result<Self> {
        let template = match &config.template {
            Some(path) => load_template(path)?,
            None => {
                log::warn!("No register template configured, starting from an empty image");
                RegisterImage::new()
            }
        };
        let synths = config
            .devices
            .iter()
            .map(|device| Synthesizer::new(device, config, &template))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(synths, bus))
    }

    /// Reset and write the full image of every synthesizer
    pub fn program(&mut self) -> Result<()> {
        for synth in &self.synths {
            synth.log_ramps();
            synth.program(&mut self.bus)?;
        }
        Ok(())
    }

    /// Enable ramping; the devices then wait on ramp 0 for the trigger
    pub fn enable_ramping(&mut self) -> Result<()> {
        self.set_ramping(true)
    }

    pub fn disable_ramping(&mut self) -> Result<()> {
        self.set_ramping(false)
    }

    /// Trigger all synthesizers together
    pub fn trigger(&mut self) -> Result<()> {
        let numbers: Vec<u8> = self.synths.iter().map(|s| s.number()).collect();
        if numbers.is_empty() {
            return Ok(());
        }
        self.bus.trigger(&numbers)
    }

    pub fn synths(&self) -> &[Synthesizer] {
        &self.synths
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn set_ramping(&mut self, enabled: bool) -> Result<()> {
        for synth in &mut self.synths {
            synth.set_ramping(&mut self.bus, enabled)?;
        }
        log::info!("Ramping {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }
}
