//! Shared fakes for the synth-daq integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use synth_daq::acquisition::{AcquisitionBackend, Channel, TriggerSource};
use synth_daq::transport::MockTransport;
use synth_daq::um7::constants::{DREG_ALL_PROC, DREG_HEALTH, GET_FW_REVISION};
use synth_daq::um7::{decode, encode, Packet};
use synth_daq::{Config, Error, Result};

/// Board whose trigger readings come from a script
///
/// Polling past the end of the script is an error, so a loop that keeps
/// going after its last expected capture fails instead of hanging.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    pub script: VecDeque<TriggerSource>,
    /// Every call in order
    pub calls: Vec<&'static str>,
    pub transfers: usize,
    pub decimation: Option<u32>,
    pub trigger_delay: Option<i32>,
    /// Value written into every sample of the next transfer
    pub fill: i16,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = TriggerSource>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// `captures` completed captures, each preceded by `armed_polls` polls
    /// that still see the trigger armed
    pub fn with_captures(captures: usize, armed_polls: usize) -> Self {
        let mut script = Vec::new();
        for _ in 0..captures {
            script.extend(std::iter::repeat(TriggerSource::ExternalRising).take(armed_polls));
            script.push(TriggerSource::Disabled);
        }
        Self::new(script)
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl AcquisitionBackend for ScriptedBackend {
    fn start_sampling(&mut self) -> Result<()> {
        self.calls.push("start_sampling");
        Ok(())
    }

    fn set_decimation(&mut self, decimation: u32) -> Result<()> {
        self.calls.push("set_decimation");
        self.decimation = Some(decimation);
        Ok(())
    }

    fn set_trigger_delay(&mut self, delay: i32) -> Result<()> {
        self.calls.push("set_trigger_delay");
        self.trigger_delay = Some(delay);
        Ok(())
    }

    fn set_trigger_source(&mut self, _source: TriggerSource) -> Result<()> {
        self.calls.push("set_trigger_source");
        Ok(())
    }

    fn trigger_source(&mut self) -> Result<TriggerSource> {
        self.script
            .pop_front()
            .ok_or_else(|| Error::Backend("trigger script exhausted".to_string()))
    }

    fn transfer_latest(&mut self, _channel: Channel, buffer: &mut [i16]) -> Result<usize> {
        self.calls.push("transfer_latest");
        self.transfers += 1;
        buffer.fill(self.fill);
        Ok(buffer.len())
    }
}

pub fn health_frame(word: u32) -> Vec<u8> {
    encode(&Packet::write(DREG_HEALTH, &word.to_be_bytes()).unwrap())
}

/// UM7 model: acknowledges every request, answers the firmware read and
/// follows each reply with a health broadcast
pub fn um7_sensor(health_word: u32) -> MockTransport {
    MockTransport::new().with_responder(move |frame| {
        let request = decode(frame).unwrap();
        let reply = if request.address() == GET_FW_REVISION {
            Packet::write(GET_FW_REVISION, b"U2C1").unwrap()
        } else {
            Packet::write(request.address(), &[]).unwrap()
        };
        let mut bytes = encode(&reply);
        bytes.extend(health_frame(health_word));
        bytes
    })
}

/// All-processed batch of 12 registers holding `values`
pub fn all_proc_frame(values: &[f32; 12]) -> Vec<u8> {
    let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    encode(&Packet::write(DREG_ALL_PROC, &data).unwrap())
}

/// Two-ramp configuration recording into `storage`
pub fn test_config(storage: &Path, target_ramp_count: u64) -> Config {
    let text = format!(
        r#"
[experiment]
target_ramp_count = {target}
max_loop_period_us = 950
ext_buffer_samples = 64
ref_buffer_samples = 8
buffer_fill_us = 800
storage_dir = "{dir}"

[sensor]
heartbeat_timeout_bytes = 4096

[synth]
phase_detector_hz = 100e6
integer_n = 60

[[synth.devices]]
number = 1

[[synth.devices.ramps]]
bandwidth_hz = 150e6
duration_s = 500e-6
flag = true
next = 1

[[synth.devices.ramps]]
bandwidth_hz = -150e6
duration_s = 500e-6
reset = true

[[synth.devices]]
number = 2

[[synth.devices.ramps]]
bandwidth_hz = 150e6
duration_s = 500e-6
"#,
        target = target_ramp_count,
        dir = storage.display().to_string().replace('\\', "/"),
    );
    Config::from_toml(&text).unwrap()
}
