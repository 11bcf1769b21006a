//! Power lookup table: (power_folder, frequency, temperature) -> watts
//!
//! Populated either from a tab-separated file (`core_power\tl3_power` per
//! line, iterated power-folder outermost, then frequency, then
//! temperature bucket) or from a synthetic analytic fallback so the
//! simulator never depends on an external cycle-accurate power model.

use crate::config::PowerConfig;
use crate::error::{Result, SimError};
use std::path::Path;

const TEMPERATURE_BUCKETS: usize = 11;

/// A populated power lookup table
#[derive(Debug, Clone)]
pub struct PowerTable {
    num_power_folders: usize,
    num_frequencies: usize,
    core_power: Vec<f64>,
    l3_power: Vec<f64>,
}

impl PowerTable {
    /// Build the table from a tab-separated file, or synthesize one when
    /// `config.power_table_path` is absent.
    pub fn build(config: &PowerConfig) -> Result<Self> {
        match &config.power_table_path {
            Some(path) => Self::from_file(Path::new(path), config),
            None => Ok(Self::synthetic(config)),
        }
    }

    /// Parse a tab-separated LUT file in `power_folder, frequency,
    /// temperature` row-major order.
    pub fn from_file(path: &Path, config: &PowerConfig) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let num_power_folders = config.num_power_folders as usize;
        let num_frequencies = config.frequencies_ghz.len();
        let expected = num_power_folders * num_frequencies * TEMPERATURE_BUCKETS;

        let mut core_power = Vec::with_capacity(expected);
        let mut l3_power = Vec::with_capacity(expected);
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let cp: f64 = parts
                .next()
                .ok_or_else(|| SimError::ParseShort(format!("missing core power in {line}")))?
                .parse()
                .map_err(|_| SimError::ParseShort(format!("bad core power in {line}")))?;
            let l3: f64 = parts
                .next()
                .ok_or_else(|| SimError::ParseShort(format!("missing l3 power in {line}")))?
                .parse()
                .map_err(|_| SimError::ParseShort(format!("bad l3 power in {line}")))?;
            core_power.push(cp);
            l3_power.push(l3);
        }
        if core_power.len() != expected {
            return Err(SimError::ParseShort(format!(
                "power table {} has {} rows, expected {}",
                path.display(),
                core_power.len(),
                expected
            )));
        }

        Ok(Self {
            num_power_folders,
            num_frequencies,
            core_power,
            l3_power,
        })
    }

    /// Build a smooth analytic stand-in: power rises with power folder,
    /// frequency, and temperature.
    pub fn synthetic(config: &PowerConfig) -> Self {
        let num_power_folders = config.num_power_folders as usize;
        let num_frequencies = config.frequencies_ghz.len();
        let mut core_power = Vec::with_capacity(num_power_folders * num_frequencies * TEMPERATURE_BUCKETS);
        let mut l3_power = Vec::with_capacity(core_power.capacity());

        for folder in 1..=num_power_folders {
            for freq_idx in 0..num_frequencies {
                let freq_ghz = config.frequencies_ghz[freq_idx];
                for temp_idx in 0..TEMPERATURE_BUCKETS {
                    let temp_k = 300.0 + 10.0 * temp_idx as f64;
                    let base = 0.4 * folder as f64 * freq_ghz * freq_ghz;
                    let thermal_factor = 1.0 + 0.002 * (temp_k - 300.0);
                    let cp = base * thermal_factor;
                    core_power.push(cp);
                    l3_power.push(cp * 0.2);
                }
            }
        }

        Self {
            num_power_folders,
            num_frequencies,
            core_power,
            l3_power,
        }
    }

    fn index(&self, power_folder: u32, frequency_index: usize, temperature_index: usize) -> usize {
        let folder_idx = (power_folder as usize).saturating_sub(1);
        (folder_idx * self.num_frequencies + frequency_index) * TEMPERATURE_BUCKETS + temperature_index
    }

    /// Look up `(core_power_watts, l3_power_watts)` for the given
    /// power-folder/frequency/temperature-bucket coordinates.
    pub fn lookup(&self, power_folder: u32, frequency_index: usize, temperature_index: usize) -> (f64, f64) {
        let i = self.index(power_folder, frequency_index, temperature_index);
        (self.core_power[i], self.l3_power[i])
    }
}

/// Map a temperature in Kelvin to one of 11 lookup-table buckets, per the
/// original `((int)(temperature-1)/10 + 1)*10` rounding rule, clamped to
/// the table's [300, 400] K range.
pub fn temperature_index(temperature_k: f64) -> usize {
    let mut mcpat_temperature = (((temperature_k - 1.0) as i64) / 10 + 1) * 10;
    if mcpat_temperature < 300 {
        mcpat_temperature = 300;
    } else if mcpat_temperature > 400 {
        mcpat_temperature = 400;
    }
    ((mcpat_temperature - 300) / 10) as usize
}

/// Find the index of `frequency_ghz` in the ascending supported-frequency
/// table, falling back to the highest frequency if not an exact match.
pub fn frequency_index(frequency_ghz: f64, frequencies_ghz: &[f64]) -> usize {
    frequencies_ghz
        .iter()
        .position(|&f| (f - frequency_ghz).abs() < 1e-6)
        .unwrap_or(frequencies_ghz.len() - 1)
}
