//! Configuracion de la maquina. Se lee de un JSON; lo que falte toma el valor por defecto.
use std::{fs::File, io::BufReader, path::Path};

use log::LevelFilter;
use serde::Deserialize;

use crate::{constants::*, errors::ConfigError};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub scale_oz_factor: f64,
    pub safety_margin_oz: f64,
    pub min_cup_weight: f64,
    pub cup_removal_threshold: f64,
    pub motor_timeout_ms: u64,
    pub calibration_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub countdown_secs: u64,
    pub calibrate_on_boot: bool,
    /// Sin uso por ahora: no hay autenticacion
    pub auth_cocktail: bool,
    /// Sin uso por ahora: no hay autenticacion
    pub auth_shots: bool,
    pub store_path: String,
    pub import_path: Option<String>,
    pub status_enabled: bool,
    pub status_topic: String,
    pub bottle_update_topic: String,
    pub command_topic: String,
    pub log_level: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            scale_oz_factor: SCALE_OZ_FACTOR,
            safety_margin_oz: SAFETY_MARGIN_OZ,
            min_cup_weight: MIN_CUP_WEIGHT,
            cup_removal_threshold: CUP_REMOVAL_THRESHOLD,
            motor_timeout_ms: MOTOR_TIMEOUT_MS,
            calibration_wait_ms: CALIBRATION_WAIT_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
            countdown_secs: COUNTDOWN_SECS,
            calibrate_on_boot: true,
            auth_cocktail: false,
            auth_shots: false,
            store_path: DEFAULT_STORE_PATH.to_string(),
            import_path: None,
            status_enabled: true,
            status_topic: STATUS_TOPIC.to_string(),
            bottle_update_topic: BOTTLE_UPDATE_TOPIC.to_string(),
            command_topic: COMMAND_TOPIC.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl MachineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<MachineConfig, ConfigError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}
