//! Summary statistics over a completed run's power/temperature trace

use crate::engine::RunTrace;
use serde::Serialize;

/// Mean, variance, min, and max of one per-core series
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SeriesStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    /// Minimum observed value
    pub min: f64,
    /// Maximum observed value
    pub max: f64,
}

impl SeriesStats {
    fn of(series: &[f64]) -> Self {
        if series.is_empty() {
            return Self {
                mean: 0.0,
                variance: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let n = series.len() as f64;
        let mean = series.iter().sum::<f64>() / n;
        let variance = series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { mean, variance, min, max }
    }
}

/// Per-core power and temperature summary, plus the run's deadline-miss count
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Power statistics, one entry per core
    pub power: Vec<SeriesStats>,
    /// Temperature statistics, one entry per core
    pub temperature: Vec<SeriesStats>,
    /// Total deadline misses observed during the run
    pub deadline_misses: u64,
}

/// Reduce a run's per-tick per-core trace into summary statistics
pub fn compute_stats(trace: &RunTrace) -> RunStats {
    RunStats {
        power: trace.power.iter().map(|s| SeriesStats::of(s)).collect(),
        temperature: trace.temperature.iter().map(|s| SeriesStats::of(s)).collect(),
        deadline_misses: trace.deadline_misses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_stats_of_constant_series_has_zero_variance() {
        let s = SeriesStats::of(&[3.0, 3.0, 3.0]);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.variance, 0.0);
        assert_eq!(s.min, 3.0);
        assert_eq!(s.max, 3.0);
    }

    #[test]
    fn compute_stats_reduces_each_core_independently() {
        let trace = RunTrace {
            power: vec![vec![1.0, 2.0, 3.0], vec![0.0, 0.0, 0.0]],
            temperature: vec![vec![300.0, 301.0, 302.0], vec![300.0, 300.0, 300.0]],
            deadline_misses: 2,
        };
        let stats = compute_stats(&trace);
        assert_eq!(stats.power.len(), 2);
        assert_eq!(stats.power[0].mean, 2.0);
        assert_eq!(stats.power[1].mean, 0.0);
        assert_eq!(stats.deadline_misses, 2);
    }

    #[test]
    fn series_stats_of_empty_series_is_zeroed() {
        let s = SeriesStats::of(&[]);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.max, 0.0);
    }
}
