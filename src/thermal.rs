//! Thermal solver interface and its default reference implementation

use crate::config::ThermalConfig;
use crate::error::Result;
use std::path::Path;

/// External collaborator that turns per-core power into per-core
/// temperature. `init`/`step`/`exit` mirror the floorplan-driven thermal
/// tools this simulator was built to sit alongside; only the shape of the
/// interface is load-bearing here.
pub trait ThermalSolver {
    /// Load floorplan and initial-condition files, if applicable
    fn init(&mut self, flp_file: Option<&Path>, init_file: Option<&Path>, steady_file: Option<&Path>) -> Result<()>;

    /// Advance the model by `dt_seconds`, given this tick's per-core power
    /// in watts; updates `temperature` (Kelvin) in place.
    fn step(&mut self, dt_seconds: f64, power: &[f64], temperature: &mut [f64]) -> Result<()>;

    /// Flush steady-state temperature, if applicable
    fn exit(&mut self) -> Result<()>;
}

/// A lumped first-order RC thermal model: each core is an independent
/// thermal node with resistance `r` and capacitance `c` against a shared
/// ambient temperature, integrated with forward Euler.
#[derive(Debug, Clone)]
pub struct RcThermalModel {
    resistance: f64,
    capacitance: f64,
    ambient_temperature_k: f64,
}

impl RcThermalModel {
    /// Build a model from thermal configuration
    pub fn new(config: &ThermalConfig) -> Self {
        Self {
            resistance: config.resistance,
            capacitance: config.capacitance,
            ambient_temperature_k: config.ambient_temperature_k,
        }
    }
}

impl ThermalSolver for RcThermalModel {
    fn init(&mut self, _flp_file: Option<&Path>, _init_file: Option<&Path>, _steady_file: Option<&Path>) -> Result<()> {
        Ok(())
    }

    fn step(&mut self, dt_seconds: f64, power: &[f64], temperature: &mut [f64]) -> Result<()> {
        for (t, &p) in temperature.iter_mut().zip(power) {
            let d_temp = (p * self.resistance - (*t - self.ambient_temperature_k)) / (self.resistance * self.capacitance);
            *t += dt_seconds * d_temp;
        }
        Ok(())
    }

    fn exit(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_rises_toward_equilibrium_under_constant_power() {
        let config = ThermalConfig {
            resistance: 0.5,
            capacitance: 140.0,
            ambient_temperature_k: 300.0,
            initial_temperature_k: 300.0,
        };
        let mut model = RcThermalModel::new(&config);
        let mut temp = vec![300.0];
        let power = vec![10.0];
        for _ in 0..1000 {
            model.step(0.001, &power, &mut temp).unwrap();
        }
        assert!(temp[0] > 300.0);
        assert!(temp[0] < 300.0 + 10.0 * 0.5); // below equilibrium P*R
    }

    #[test]
    fn temperature_decays_to_ambient_under_zero_power() {
        let config = ThermalConfig {
            resistance: 0.5,
            capacitance: 140.0,
            ambient_temperature_k: 300.0,
            initial_temperature_k: 330.0,
        };
        let mut model = RcThermalModel::new(&config);
        let mut temp = vec![330.0];
        let power = vec![0.0];
        for _ in 0..5000 {
            model.step(0.001, &power, &mut temp).unwrap();
        }
        assert!(temp[0] < 330.0);
        assert!(temp[0] >= 300.0);
    }
}
