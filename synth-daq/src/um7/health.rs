//! UM7 health word decoding and the shared heartbeat snapshot
//!
//! The reader thread publishes a whole `Heartbeat` value at a time; readers
//! always get a complete copy of one health packet, never a mix of two.

use super::constants::{
    HEALTH_ACC, HEALTH_ACC_N, HEALTH_GPS, HEALTH_GYRO, HEALTH_MAG, HEALTH_MG_N, HEALTH_OVF,
    HEALTH_SATS_IN_VIEW_SHIFT, HEALTH_SATS_MASK, HEALTH_SATS_USED_SHIFT,
};
use super::packet::Packet;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Decoded health packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    /// Raw health word
    pub raw: u32,
    /// No GPS data for two seconds
    pub gps_fail: bool,
    pub mag_init_fail: bool,
    pub gyro_init_fail: bool,
    pub accel_init_fail: bool,
    /// Aggressive acceleration detected
    pub accel_norm_exceeded: bool,
    /// Magnetometer calibration is off
    pub mag_norm_exceeded: bool,
    /// Broadcast rates exceed the UART bandwidth
    pub uart_overflow: bool,
    pub satellites_in_view: u8,
    pub satellites_used: u8,
}

impl Heartbeat {
    /// Decode a health word
    pub fn from_word(raw: u32) -> Self {
        Self {
            raw,
            gps_fail: raw & HEALTH_GPS != 0,
            mag_init_fail: raw & HEALTH_MAG != 0,
            gyro_init_fail: raw & HEALTH_GYRO != 0,
            accel_init_fail: raw & HEALTH_ACC != 0,
            accel_norm_exceeded: raw & HEALTH_ACC_N != 0,
            mag_norm_exceeded: raw & HEALTH_MG_N != 0,
            uart_overflow: raw & HEALTH_OVF != 0,
            satellites_in_view: ((raw >> HEALTH_SATS_IN_VIEW_SHIFT) & HEALTH_SATS_MASK) as u8,
            satellites_used: ((raw >> HEALTH_SATS_USED_SHIFT) & HEALTH_SATS_MASK) as u8,
        }
    }

    /// Decode the health register carried by `packet`
    pub fn from_packet(packet: &Packet) -> Option<Self> {
        packet.register_u32(0).map(Self::from_word)
    }

    /// Human-readable descriptions of every raised fault
    pub fn faults(&self) -> Vec<&'static str> {
        let mut faults = Vec::new();
        if self.gps_fail {
            faults.push("no GPS data for 2 seconds");
        }
        if self.mag_init_fail {
            faults.push("magnetometer failed to init");
        }
        if self.gyro_init_fail {
            faults.push("gyro failed to init");
        }
        if self.accel_init_fail {
            faults.push("accelerometer failed to init");
        }
        if self.accel_norm_exceeded {
            faults.push("accel norm exceeded - aggressive acceleration");
        }
        if self.mag_norm_exceeded {
            faults.push("mag norm exceeded - bad calibration");
        }
        if self.uart_overflow {
            faults.push("UART overflow - reduce broadcast rates");
        }
        faults
    }

    /// Log faults and satellite counts
    pub fn log(&self) {
        for fault in self.faults() {
            log::warn!("UM7 health: {}", fault);
        }
        log::info!(
            "UM7 satellites: {} in view, {} used",
            self.satellites_in_view,
            self.satellites_used
        );
    }
}

#[derive(Debug, Clone, Copy)]
struct Stamped {
    heartbeat: Heartbeat,
    received_at: Instant,
    sequence: u64,
}

/// Last-writer-wins heartbeat slot shared between the reader thread and
/// reporting
#[derive(Debug, Clone, Default)]
pub struct SharedHeartbeat {
    slot: Arc<Mutex<Option<Stamped>>>,
}

impl SharedHeartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot
    pub fn publish(&self, heartbeat: Heartbeat) {
        let mut slot = self.slot.lock();
        let sequence = slot.map_or(1, |s| s.sequence + 1);
        *slot = Some(Stamped {
            heartbeat,
            received_at: Instant::now(),
            sequence,
        });
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Option<Heartbeat> {
        self.slot.lock().map(|s| s.heartbeat)
    }

    /// Time since the most recent snapshot
    pub fn age(&self) -> Option<std::time::Duration> {
        self.slot.lock().map(|s| s.received_at.elapsed())
    }

    /// Number of snapshots published so far
    pub fn count(&self) -> u64 {
        self.slot.lock().map_or(0, |s| s.sequence)
    }
}
