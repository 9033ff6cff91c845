//! synth-daq - Ramp synthesizer acquisition daemon
//!
//! Programs the two synthesizers, captures one channel-pair buffer per ramp
//! flag into `ch1.bin`/`ch2.bin` and logs the UM7 attitude sensor into
//! `imu.bin` until the configured ramp count is reached.

use std::env;
use synth_daq::acquisition::{MonotonicClock, SimulatedBackend};
use synth_daq::session::SessionCoordinator;
use synth_daq::synth::RecordingBus;
use synth_daq::transport::SerialTransport;
use synth_daq::{Config, Result};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `synth-daq <path>` (positional)
/// - `synth-daq --config <path>` (flag-based)
/// - `synth-daq -c <path>` (short flag)
///
/// Defaults to `/etc/synth-daq.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/synth-daq.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = Config::load(&config_path);

    // RUST_LOG wins over the config file
    let level = config
        .as_ref()
        .map_or("info", |config| config.logging.level.as_str());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("synth-daq v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);
    let config = config?;

    let sensor = if config.sensor.enabled {
        Some(SerialTransport::open(
            &config.sensor.port,
            config.sensor.baud_rate,
        )?)
    } else {
        None
    };

    log::warn!("No vendor acquisition library linked, using the simulated board");
    let backend = SimulatedBackend::new(&config.acquisition);
    let bus = RecordingBus::new();

    let mut session = SessionCoordinator::new(config, backend, bus, MonotonicClock::new())?;
    let summary = session.run(sensor)?;

    if !summary.is_clean() {
        log::warn!("Recording finished with timing anomalies");
    }
    log::info!("synth-daq stopped");
    Ok(())
}
