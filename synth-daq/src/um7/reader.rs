//! Background reader thread for the UM7 stream
//!
//! Runs beside the acquisition loop until the active flag clears. Health
//! packets replace the shared heartbeat; all-processed batches go to the
//! sensor file. Nothing here touches the acquisition counters.

use super::constants::{ALL_PROC_REGISTERS, DREG_ALL_PROC, DREG_HEALTH};
use super::health::{Heartbeat, SharedHeartbeat};
use super::packet::Packet;
use super::protocol::{PacketReader, StreamStats};
use crate::error::Result;
use crate::sink::SensorSink;
use crate::transport::Transport;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Bytes requested from the transport per iteration
const READ_CHUNK: usize = 256;

/// Sleep when a read returned nothing
const IDLE_SLEEP: Duration = Duration::from_millis(2);

/// Sleep after a transport error
const ERROR_SLEEP: Duration = Duration::from_millis(10);

/// Totals reported when the reader thread is joined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub stream: StreamStats,
    /// Health packets decoded
    pub heartbeats: u64,
    /// All-processed batches decoded
    pub batches: u64,
    /// Bytes written to the sensor file
    pub bytes_written: u64,
    /// Transport read errors
    pub read_errors: u64,
}

/// Reader loop
///
/// Framing failures are counted and skipped. A sensor file write failure
/// ends the thread with an error; transport errors are logged and retried.
pub fn background_task<T, W>(
    mut transport: T,
    mut reader: PacketReader,
    mut sink: SensorSink<W>,
    active: Arc<AtomicBool>,
    heartbeat: SharedHeartbeat,
) -> Result<ReaderStats>
where
    T: Transport,
    W: Write,
{
    let mut stats = ReaderStats::default();
    let mut chunk = [0u8; READ_CHUNK];
    let mut last_faults: Vec<&'static str> = Vec::new();

    log::info!("UM7 reader started ({:?} mode)", sink.mode());

    while active.load(Ordering::Relaxed) {
        let n = match transport.read(&mut chunk) {
            Ok(n) => n,
            Err(e) => {
                log::error!("UM7 read error: {}", e);
                stats.read_errors += 1;
                thread::sleep(ERROR_SLEEP);
                continue;
            }
        };

        if n == 0 {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        sink.write_raw(&chunk[..n])?;
        reader.push(&chunk[..n]);

        while let Some(packet) = reader.next_packet() {
            handle_packet(&packet, &mut sink, &heartbeat, &mut last_faults, &mut stats)?;
        }
    }

    stats.stream = reader.stats();
    stats.bytes_written = sink.finish()?;
    log::info!(
        "UM7 reader exiting: {} packets, {} heartbeats, {} checksum errors",
        stats.stream.packets,
        stats.heartbeats,
        stats.stream.checksum_errors
    );
    Ok(stats)
}

fn handle_packet<W: Write>(
    packet: &Packet,
    sink: &mut SensorSink<W>,
    heartbeat: &SharedHeartbeat,
    last_faults: &mut Vec<&'static str>,
    stats: &mut ReaderStats,
) -> Result<()> {
    match packet.address() {
        DREG_HEALTH => {
            let Some(hb) = Heartbeat::from_packet(packet) else {
                return Ok(());
            };
            let faults = hb.faults();
            for fault in faults.iter().filter(|f| !last_faults.contains(*f)) {
                log::warn!("UM7 health: {}", fault);
            }
            *last_faults = faults;
            heartbeat.publish(hb);
            stats.heartbeats += 1;
        }
        DREG_ALL_PROC
            if packet.packet_type().is_batch()
                && packet.register_count() == ALL_PROC_REGISTERS =>
        {
            let mut values = [0f32; ALL_PROC_REGISTERS];
            for (i, value) in values.iter_mut().enumerate() {
                *value = packet.register_f32(i).unwrap_or(f32::NAN);
            }
            sink.write_values(&values)?;
            stats.batches += 1;
        }
        address => {
            log::debug!("UM7 packet R{:#04x} ignored", address);
        }
    }
    Ok(())
}
