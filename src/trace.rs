//! Per-tick trace and run-summary output

use crate::engine::RunTrace;
use crate::error::Result;
use crate::stats::RunStats;
use std::io::Write;
use std::path::Path;

/// Write a run's full per-tick, per-core power and temperature trace as
/// tab-separated columns, one row per tick: `power_0 ... power_{n-1}
/// temp_0 ... temp_{n-1}`.
pub fn write_trace(path: &Path, trace: &RunTrace) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    let num_cores = trace.power.len();
    let num_ticks = trace.power.first().map_or(0, Vec::len);

    for tick in 0..num_ticks {
        let mut cols: Vec<String> = Vec::with_capacity(num_cores * 2);
        for c in 0..num_cores {
            cols.push(format!("{:.4}", trace.power[c][tick]));
        }
        for c in 0..num_cores {
            cols.push(format!("{:.4}", trace.temperature[c][tick]));
        }
        writeln!(file, "{}", cols.join("\t"))?;
    }
    Ok(())
}

/// Appends one summary line per (taskset, policy) run to a results file,
/// creating it with a header on first write.
pub struct ResultsWriter {
    file: std::fs::File,
}

impl ResultsWriter {
    /// Open `path` for appending, writing a header if the file is new
    pub fn open(path: &Path) -> Result<Self> {
        let is_new = !path.exists();
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        if is_new {
            writeln!(file, "taskset_id\tpolicy\tdeadline_misses\tmean_power\tmean_temperature")?;
        }
        Ok(Self { file })
    }

    /// Append one run's summary line
    pub fn write_run(&mut self, taskset_id: u32, policy: &str, stats: &RunStats) -> Result<()> {
        let mean_power = if stats.power.is_empty() {
            0.0
        } else {
            stats.power.iter().map(|s| s.mean).sum::<f64>() / stats.power.len() as f64
        };
        let mean_temperature = if stats.temperature.is_empty() {
            0.0
        } else {
            stats.temperature.iter().map(|s| s.mean).sum::<f64>() / stats.temperature.len() as f64
        };
        writeln!(
            self.file,
            "{}\t{}\t{}\t{:.4}\t{:.4}",
            taskset_id, policy, stats.deadline_misses, mean_power, mean_temperature
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_trace_emits_one_row_per_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.tsv");
        let trace = RunTrace {
            power: vec![vec![1.0, 2.0], vec![0.0, 0.0]],
            temperature: vec![vec![300.0, 301.0], vec![300.0, 300.0]],
            deadline_misses: 0,
        };
        write_trace(&path, &trace).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains('\t'));
    }

    #[test]
    fn results_writer_creates_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.tsv");
        let stats = RunStats {
            power: vec![],
            temperature: vec![],
            deadline_misses: 1,
        };
        {
            let mut w = ResultsWriter::open(&path).unwrap();
            w.write_run(1, "rms", &stats).unwrap();
        }
        {
            let mut w = ResultsWriter::open(&path).unwrap();
            w.write_run(2, "sysclock", &stats).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("taskset_id"));
    }
}
