//! Glue between the scheduling engine and the thermal solver

use crate::error::Result;
use crate::thermal::ThermalSolver;

/// Owns the thermal solver and the live per-core temperature vector the
/// engine reads when indexing the power table.
pub struct PowerTempBridge {
    solver: Box<dyn ThermalSolver>,
    temperature: Vec<f64>,
}

impl PowerTempBridge {
    /// Build a bridge over `solver`, with every core starting at
    /// `initial_temperature_k`.
    pub fn new(solver: Box<dyn ThermalSolver>, num_cores: usize, initial_temperature_k: f64) -> Self {
        Self {
            solver,
            temperature: vec![initial_temperature_k; num_cores],
        }
    }

    /// Load floorplan/initial-condition files, if the underlying solver uses them
    pub fn init(&mut self) -> Result<()> {
        self.solver.init(None, None, None)
    }

    /// Current per-core temperature, in Kelvin
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// Advance the thermal model by one tick given this tick's per-core power
    pub fn step(&mut self, dt_seconds: f64, power: &[f64]) -> Result<()> {
        self.solver.step(dt_seconds, power, &mut self.temperature)
    }

    /// Flush steady-state temperature, if the underlying solver uses it
    pub fn exit(&mut self) -> Result<()> {
        self.solver.exit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThermalConfig;
    use crate::thermal::RcThermalModel;

    #[test]
    fn step_advances_temperature_vector() {
        let config = ThermalConfig {
            resistance: 0.5,
            capacitance: 140.0,
            ambient_temperature_k: 300.0,
            initial_temperature_k: 300.0,
        };
        let model = RcThermalModel::new(&config);
        let mut bridge = PowerTempBridge::new(Box::new(model), 2, 300.0);
        bridge.step(0.001, &[5.0, 0.0]).unwrap();
        assert!(bridge.temperature()[0] > bridge.temperature()[1]);
    }
}
