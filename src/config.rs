//! Configuration for the scheduling simulator

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level simulator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Power lookup table parameters
    #[serde(default)]
    pub power: PowerConfig,

    /// Thermal model parameters
    #[serde(default)]
    pub thermal: ThermalConfig,

    /// Admission / partitioning parameters
    #[serde(default)]
    pub partition: PartitionConfig,
}

/// Power lookup table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerConfig {
    /// Number of power-folder slices in the lookup table
    #[serde(default = "default_power_folders")]
    pub num_power_folders: u32,

    /// Supported frequencies, in GHz, ascending
    #[serde(default = "default_frequencies_ghz")]
    pub frequencies_ghz: Vec<f64>,

    /// Power drawn while idle (not executing, not asleep), in watts
    #[serde(default = "default_idle_power")]
    pub idle_power_watts: f64,

    /// Optional path to a tab-separated power lookup table file.
    /// When absent, a synthetic analytic table is used.
    #[serde(default)]
    pub power_table_path: Option<String>,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            num_power_folders: default_power_folders(),
            frequencies_ghz: default_frequencies_ghz(),
            idle_power_watts: default_idle_power(),
            power_table_path: None,
        }
    }
}

/// Thermal model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalConfig {
    /// Per-core thermal resistance (K/W)
    #[serde(default = "default_thermal_resistance")]
    pub resistance: f64,

    /// Per-core thermal capacitance (J/K)
    #[serde(default = "default_thermal_capacitance")]
    pub capacitance: f64,

    /// Ambient temperature, in Kelvin
    #[serde(default = "default_ambient_temperature")]
    pub ambient_temperature_k: f64,

    /// Initial core temperature, in Kelvin
    #[serde(default = "default_initial_temperature")]
    pub initial_temperature_k: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            resistance: default_thermal_resistance(),
            capacitance: default_thermal_capacitance(),
            ambient_temperature_k: default_ambient_temperature(),
            initial_temperature_k: default_initial_temperature(),
        }
    }
}

/// Worst-fit-decreasing partitioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Per-core utilization ceiling; admission requires strictly less than this
    #[serde(default = "default_target_utilization")]
    pub target_utilization: f64,

    /// Base forced-sleep duration, in ticks, before any per-core halving
    #[serde(default = "default_sleep_time_ticks")]
    pub sleep_time_ticks: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            target_utilization: default_target_utilization(),
            sleep_time_ticks: default_sleep_time_ticks(),
        }
    }
}

// Default value functions

fn default_power_folders() -> u32 {
    11
}

fn default_frequencies_ghz() -> Vec<f64> {
    vec![1.2, 1.5, 1.8, 2.1, 2.4, 2.66]
}

fn default_idle_power() -> f64 {
    2.0
}

fn default_thermal_resistance() -> f64 {
    0.5
}

fn default_thermal_capacitance() -> f64 {
    140.0
}

fn default_ambient_temperature() -> f64 {
    300.0
}

fn default_initial_temperature() -> f64 {
    330.0
}

fn default_target_utilization() -> f64 {
    0.4
}

fn default_sleep_time_ticks() -> u64 {
    1500
}

impl SimConfig {
    /// Load configuration from a YAML file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_six_frequencies() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.power.frequencies_ghz.len(), 6);
        assert_eq!(cfg.partition.target_utilization, 0.4);
    }

    #[test]
    fn load_missing_file_falls_back_to_default() {
        let cfg = SimConfig::load(Path::new("/nonexistent/path/to/config.yaml")).unwrap();
        assert_eq!(cfg.power.num_power_folders, 11);
    }
}
