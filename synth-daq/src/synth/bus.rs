//! Register bus to the synthesizers
//!
//! The bit-banged GPIO shift interface lives outside this crate; it plugs
//! in through `SynthBus`. `RecordingBus` keeps every operation for
//! inspection and is what the binary uses when no hardware bus is present.

use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Register write and trigger access to the synthesizers
pub trait SynthBus: Send {
    /// Shift `value` into register `address` of synthesizer `synth`
    fn write_register(&mut self, synth: u8, address: usize, value: u8) -> Result<()>;

    /// Pulse the trigger line of every listed synthesizer at once
    fn trigger(&mut self, synths: &[u8]) -> Result<()>;
}

impl<B: SynthBus + ?Sized> SynthBus for Box<B> {
    fn write_register(&mut self, synth: u8, address: usize, value: u8) -> Result<()> {
        (**self).write_register(synth, address, value)
    }

    fn trigger(&mut self, synths: &[u8]) -> Result<()> {
        (**self).trigger(synths)
    }
}

/// One bus operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Write { synth: u8, address: usize, value: u8 },
    Trigger(Vec<u8>),
}

/// Bus that records operations
///
/// Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingBus {
    events: Arc<Mutex<Vec<BusEvent>>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far
    pub fn events(&self) -> Vec<BusEvent> {
        self.events.lock().clone()
    }

    /// Register writes to `synth`, in order
    pub fn writes_to(&self, synth: u8) -> Vec<(usize, u8)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BusEvent::Write {
                    synth: s,
                    address,
                    value,
                } if *s == synth => Some((*address, *value)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl SynthBus for RecordingBus {
    fn write_register(&mut self, synth: u8, address: usize, value: u8) -> Result<()> {
        log::trace!("Synth {} R{} <- {:#010b}", synth, address, value);
        self.events.lock().push(BusEvent::Write {
            synth,
            address,
            value,
        });
        Ok(())
    }

    fn trigger(&mut self, synths: &[u8]) -> Result<()> {
        log::debug!("Triggering synthesizers {:?}", synths);
        self.events.lock().push(BusEvent::Trigger(synths.to_vec()));
        Ok(())
    }
}
