//! UM7 stream monitor
//!
//! Opens the sensor port and prints every decoded packet for ten seconds,
//! with health packets expanded. Optionally runs the bring-up sequence
//! first (`--bring-up`).
//!
//! Usage: cargo run --example um7_monitor -- /dev/ttyPS1 [--bring-up]

use synth_daq::config::SensorConfig;
use synth_daq::transport::{SerialTransport, Transport};
use synth_daq::um7::constants::{DREG_ALL_PROC, DREG_HEALTH};
use synth_daq::um7::{Heartbeat, PacketReader, RegisterClient, SensorSession, SharedHeartbeat};
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .cloned()
        .unwrap_or_else(|| "/dev/ttyPS1".to_string());
    let bring_up = args.iter().any(|a| a == "--bring-up");

    log::info!("=== UM7 Monitor ===");
    let config = SensorConfig {
        port,
        ..SensorConfig::default()
    };
    let transport = SerialTransport::open(&config.port, config.baud_rate)?;

    let (mut transport, mut reader) = if bring_up {
        let client = RegisterClient::new(transport).with_response_polls(config.response_polls);
        let mut session = SensorSession::new(client, SharedHeartbeat::new());
        session.bring_up(&config)?;
        log::info!("Firmware: {}", session.firmware().unwrap_or("?"));
        session.into_parts()
    } else {
        (transport, PacketReader::new())
    };

    let start = Instant::now();
    let mut chunk = [0u8; 256];
    while start.elapsed() < Duration::from_secs(10) {
        let n = transport.read(&mut chunk)?;
        if n == 0 {
            continue;
        }
        reader.push(&chunk[..n]);
        while let Some(packet) = reader.next_packet() {
            match packet.address() {
                DREG_HEALTH => {
                    if let Some(hb) = Heartbeat::from_packet(&packet) {
                        println!(
                            "[{:8.3}] HEALTH {:#010x} sats {}/{} faults {:?}",
                            start.elapsed().as_secs_f64(),
                            hb.raw,
                            hb.satellites_used,
                            hb.satellites_in_view,
                            hb.faults()
                        );
                    }
                }
                DREG_ALL_PROC => {
                    let values: Vec<String> = (0..packet.register_count())
                        .filter_map(|i| packet.register_f32(i))
                        .map(|v| format!("{:.3}", v))
                        .collect();
                    println!(
                        "[{:8.3}] ALL_PROC {}",
                        start.elapsed().as_secs_f64(),
                        values.join(" ")
                    );
                }
                address => println!(
                    "[{:8.3}] R{:#04x} type {:#010b} {} bytes",
                    start.elapsed().as_secs_f64(),
                    address,
                    packet.packet_type().bits(),
                    packet.data().len()
                ),
            }
        }
    }

    let stats = reader.stats();
    log::info!(
        "{} bytes, {} packets, {} checksum errors, {} discarded",
        stats.bytes,
        stats.packets,
        stats.checksum_errors,
        stats.discarded_bytes
    );
    Ok(())
}
