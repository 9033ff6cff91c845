//! synth-daq - Ramp synthesizer acquisition library
//!
//! Building blocks of a two-synthesizer FMCW recording rig:
//!
//! - `um7`: attitude sensor protocol, bring-up and background reader
//! - `synth`: ramp parameter encoding into synthesizer register images
//! - `acquisition`: the trigger-driven capture loop and its timing budget
//! - `session`: start/stop orchestration of one recording
//! - `sink`: the flat binary output files

pub mod acquisition;
pub mod config;
pub mod error;
pub mod session;
pub mod sink;
pub mod synth;
pub mod transport;
pub mod um7;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
