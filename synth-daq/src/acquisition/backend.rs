//! Acquisition board interface
//!
//! Mirrors the vendor acquisition API the capture loop depends on. The
//! trigger source doubles as the capture state: the board resets it to
//! `Disabled` once a triggered capture has completed.

use crate::error::Result;

/// Trigger source register values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TriggerSource {
    /// Capture complete (or never armed)
    Disabled = 0,
    Now = 1,
    ChannelARising = 2,
    ChannelAFalling = 3,
    ChannelBRising = 4,
    ChannelBFalling = 5,
    /// External trigger pin, rising edge (the synthesizer ramp flag)
    ExternalRising = 6,
    ExternalFalling = 7,
    AwgRising = 8,
    AwgFalling = 9,
}

impl TriggerSource {
    pub fn from_raw(raw: u8) -> Option<Self> {
        use TriggerSource::*;
        Some(match raw {
            0 => Disabled,
            1 => Now,
            2 => ChannelARising,
            3 => ChannelAFalling,
            4 => ChannelBRising,
            5 => ChannelBFalling,
            6 => ExternalRising,
            7 => ExternalFalling,
            8 => AwgRising,
            9 => AwgFalling,
            _ => return None,
        })
    }

    #[inline]
    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Zero means the capture has completed
    #[inline]
    pub fn is_complete(self) -> bool {
        self == TriggerSource::Disabled
    }
}

/// ADC input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Beat signal
    Ch1,
    /// Reference
    Ch2,
}

/// Acquisition board operations used by the capture loop
pub trait AcquisitionBackend {
    /// Start (or restart) filling the capture buffer
    fn start_sampling(&mut self) -> Result<()>;

    fn set_decimation(&mut self, decimation: u32) -> Result<()>;

    /// Samples recorded relative to the trigger (negative: before)
    fn set_trigger_delay(&mut self, delay: i32) -> Result<()>;

    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<()>;

    fn trigger_source(&mut self) -> Result<TriggerSource>;

    /// Copy the newest samples of `channel` into `buffer`, returning how
    /// many were written
    fn transfer_latest(&mut self, channel: Channel, buffer: &mut [i16]) -> Result<usize>;
}

impl<B: AcquisitionBackend + ?Sized> AcquisitionBackend for Box<B> {
    fn start_sampling(&mut self) -> Result<()> {
        (**self).start_sampling()
    }

    fn set_decimation(&mut self, decimation: u32) -> Result<()> {
        (**self).set_decimation(decimation)
    }

    fn set_trigger_delay(&mut self, delay: i32) -> Result<()> {
        (**self).set_trigger_delay(delay)
    }

    fn set_trigger_source(&mut self, source: TriggerSource) -> Result<()> {
        (**self).set_trigger_source(source)
    }

    fn trigger_source(&mut self) -> Result<TriggerSource> {
        (**self).trigger_source()
    }

    fn transfer_latest(&mut self, channel: Channel, buffer: &mut [i16]) -> Result<usize> {
        (**self).transfer_latest(channel, buffer)
    }
}
