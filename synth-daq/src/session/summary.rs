//! End-of-run report

use crate::acquisition::{Counters, CycleTiming};
use crate::um7::{Heartbeat, ReaderStats};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub target_ramp_count: u64,
    pub counters: Counters,
    pub timing: CycleTiming,
    /// Bytes in ch1.bin, ch2.bin and imu.bin together
    pub bytes_written: u64,
    pub storage_dir: PathBuf,
    pub heartbeat: Option<Heartbeat>,
    /// Present when the sensor reader ran
    pub reader: Option<ReaderStats>,
}

impl Summary {
    /// Ramps captured without a timing anomaly
    pub fn is_clean(&self) -> bool {
        self.counters.corrupt_count == 0 && self.counters.missed_count == 0
    }

    pub fn log(&self) {
        log::info!(
            "Captured {} of {} ramps",
            self.counters.flags_detected,
            self.target_ramp_count
        );
        if self.counters.corrupt_count > 0 {
            log::warn!(
                "{} ramps may be corrupt (transfer left too little refill time, longest {:.2} us)",
                self.counters.corrupt_count,
                self.timing.longest_transfer.as_secs_f64() * 1e6
            );
        }
        if self.counters.missed_count > 0 {
            log::warn!(
                "{} ramps may have been missed (longest loop {:.2} us)",
                self.counters.missed_count,
                self.timing.longest_loop.as_secs_f64() * 1e6
            );
        }
        log::info!(
            "Wrote {:.2} MB to {}",
            self.bytes_written as f64 / 1e6,
            self.storage_dir.display()
        );

        if let Some(reader) = &self.reader {
            log::info!(
                "UM7: {} packets, {} batches, {} checksum errors, {} bytes discarded",
                reader.stream.packets,
                reader.batches,
                reader.stream.checksum_errors,
                reader.stream.discarded_bytes
            );
        }
        match &self.heartbeat {
            Some(heartbeat) => heartbeat.log(),
            None if self.reader.is_some() => log::warn!("No UM7 heartbeat received"),
            None => {}
        }
    }
}
