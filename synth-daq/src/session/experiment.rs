//! Per-run experiment parameters

use crate::acquisition::LoopSettings;
use crate::config::ExperimentConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved parameters of one recording
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub decimation: u32,
    pub trigger_delay: i32,
    pub settings: LoopSettings,
    pub storage_dir: PathBuf,
    pub channel1_path: PathBuf,
    pub channel2_path: PathBuf,
    pub sensor_path: PathBuf,
}

impl Experiment {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            decimation: config.decimation,
            trigger_delay: config.trigger_delay,
            settings: LoopSettings::from_experiment(config),
            storage_dir: config.storage_dir.clone(),
            channel1_path: config.channel1_path(),
            channel2_path: config.channel2_path(),
            sensor_path: config.sensor_path(),
        }
    }

    /// Create the storage directory if it does not exist yet
    pub fn prepare_storage(&self) -> Result<&Path> {
        fs::create_dir_all(&self.storage_dir).map_err(|source| Error::Output {
            path: self.storage_dir.clone(),
            source,
        })?;
        Ok(&self.storage_dir)
    }
}
