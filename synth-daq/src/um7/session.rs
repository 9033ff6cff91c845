//! UM7 bring-up sequence
//!
//! Configures the broadcast rates, reads the firmware revision, resets the
//! EKF, zeroes the gyros, waits for the first health packet and then sets
//! the magnetic reference and home position. Any protocol error aborts the
//! bring-up.

use super::constants::{
    CREG_COM_RATES1, CREG_COM_RATES2, CREG_COM_RATES3, CREG_COM_RATES4, CREG_COM_RATES5,
    CREG_COM_RATES6, CREG_COM_RATES7, DREG_HEALTH, GET_FW_REVISION, RESET_EKF,
    SET_HOME_POSITION, SET_MAG_REFERENCE, ZERO_GYROS,
};
use super::health::{Heartbeat, SharedHeartbeat};
use super::protocol::PacketReader;
use super::register::RegisterClient;
use crate::config::SensorConfig;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Consecutive reads without new bytes before `await_heartbeat` gives up
const DEFAULT_IDLE_POLL_LIMIT: u32 = 1000;

/// Health rate code position inside CREG_COM_RATES6
const HEALTH_RATE_SHIFT: u32 = 16;

/// Register writes making up the rate configuration
pub fn rate_registers(config: &SensorConfig) -> [(u8, [u8; 4]); 7] {
    let zero = [0u8; 4];
    let health = ((config.health_rate as u32 & 0x0F) << HEALTH_RATE_SHIFT).to_be_bytes();
    [
        (CREG_COM_RATES1, zero), // raw accel, gyro, mag
        (CREG_COM_RATES2, zero), // temperature, all raw
        (CREG_COM_RATES3, zero), // processed accel, gyro, mag
        (CREG_COM_RATES4, [0, 0, 0, config.all_proc_rate]),
        (CREG_COM_RATES5, zero), // quaternion, euler, position, velocity
        (CREG_COM_RATES6, health),
        (CREG_COM_RATES7, zero), // NMEA
    ]
}

/// Sensor connection during bring-up
pub struct SensorSession<T: Transport> {
    client: RegisterClient<T>,
    heartbeat: SharedHeartbeat,
    idle_poll_limit: u32,
    firmware: Option<String>,
}

impl<T: Transport> SensorSession<T> {
    pub fn new(client: RegisterClient<T>, heartbeat: SharedHeartbeat) -> Self {
        Self {
            client,
            heartbeat,
            idle_poll_limit: DEFAULT_IDLE_POLL_LIMIT,
            firmware: None,
        }
    }

    /// Bound on consecutive empty reads in `await_heartbeat`
    pub fn with_idle_poll_limit(mut self, limit: u32) -> Self {
        self.idle_poll_limit = limit.max(1);
        self
    }

    /// Run the full configuration sequence
    pub fn bring_up(&mut self, config: &SensorConfig) -> Result<()> {
        log::info!("Configuring UM7 broadcast rates");
        for (address, data) in rate_registers(config) {
            self.client.write(address, &data)?;
            log::trace!("UM7 R{:#04x} <- {:02x?}", address, data);
        }

        let firmware = self.read_firmware()?;
        log::debug!("UM7 firmware revision: {}", firmware);

        self.client.command(RESET_EKF)?;
        log::info!("UM7 EKF reset");
        self.client.command(ZERO_GYROS)?;
        log::info!("UM7 gyros zeroed");

        let heartbeat = self.await_heartbeat(config.heartbeat_timeout_bytes)?;
        heartbeat.log();

        self.client.command(SET_MAG_REFERENCE)?;
        log::info!("UM7 magnetic reference set");
        self.client.command(SET_HOME_POSITION)?;
        log::info!("UM7 home position set");
        Ok(())
    }

    /// Read the four-character firmware revision
    pub fn read_firmware(&mut self) -> Result<String> {
        let data = self.client.read(GET_FW_REVISION)?;
        let firmware = String::from_utf8_lossy(&data).trim_end_matches('\0').to_string();
        self.firmware = Some(firmware.clone());
        Ok(firmware)
    }

    /// Decode inbound packets until a health packet arrives
    ///
    /// Gives up with `NoHeartbeat` after `timeout_bytes` bytes have been
    /// consumed, or when the stream stays silent for the idle poll limit.
    pub fn await_heartbeat(&mut self, timeout_bytes: usize) -> Result<Heartbeat> {
        let start = self.client.reader().stats().bytes;
        let mut idle_polls = 0;

        loop {
            let before = self.client.reader().stats().bytes;
            let mut next = self.client.poll_packet()?;
            while let Some(packet) = next {
                if packet.address() == DREG_HEALTH {
                    if let Some(heartbeat) = Heartbeat::from_packet(&packet) {
                        self.heartbeat.publish(heartbeat);
                        return Ok(heartbeat);
                    }
                }
                next = self.client.next_buffered();
            }

            let consumed = self.client.reader().stats().bytes;
            if consumed.saturating_sub(start) >= timeout_bytes as u64 {
                break;
            }
            if consumed == before {
                idle_polls += 1;
                if idle_polls >= self.idle_poll_limit {
                    break;
                }
            } else {
                idle_polls = 0;
            }
        }

        log::error!("No UM7 health packet within {} bytes", timeout_bytes);
        Err(Error::NoHeartbeat(timeout_bytes))
    }

    /// Firmware revision read during bring-up
    pub fn firmware(&self) -> Option<&str> {
        self.firmware.as_deref()
    }

    pub fn heartbeat(&self) -> &SharedHeartbeat {
        &self.heartbeat
    }

    /// Hand the stream over to the background reader
    pub fn into_parts(self) -> (T, PacketReader) {
        self.client.into_parts()
    }
}
