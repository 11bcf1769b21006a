//! Task and per-core sleeper state

/// Stable identifier for a task, unique within one simulation run
pub type TaskId = u32;

/// A periodic real-time task
#[derive(Debug, Clone)]
pub struct Task {
    /// Stable identifier
    pub pid: TaskId,
    /// Worst-case execution time, in ticks
    pub c: u64,
    /// Period (and relative deadline), in ticks
    pub t: u64,
    /// Utilization recorded at admission (c / t)
    pub utilization: f64,
    /// Next release tick
    pub arrival_time: u64,
    /// Ticks already executed in the current period
    pub time_executed: u64,
    /// Power-folder slice selecting a power profile, in [1, num_power_folders]
    pub power_folder: u32,
    /// Core this task is pinned to after admission; -1 before admission
    pub cpuid: i32,
}

impl Task {
    /// Construct an unadmitted task (cpuid = -1, arrival_time = 0)
    pub fn new(pid: TaskId, c: u64, t: u64, power_folder: u32) -> Self {
        Self {
            pid,
            c,
            t,
            utilization: c as f64 / t as f64,
            arrival_time: 0,
            time_executed: 0,
            power_folder,
            cpuid: -1,
        }
    }

    /// True once this task has been assigned to a core
    pub fn is_admitted(&self) -> bool {
        self.cpuid >= 0
    }
}

/// Per-core forced-sleep state
#[derive(Debug, Clone, Default)]
pub struct Sleeper {
    /// Period of the forced-sleep window, in ticks
    pub sleep_period: u64,
    /// Phase offset of the forced-sleep window within its period, in ticks
    pub sleep_phase: u64,
    /// Duration of the forced-sleep window, in ticks (C_sleep)
    pub sleeping_time: u64,
    /// Ticks elapsed within the current sleep window
    pub time_slept: u64,
    /// Whether the core is currently within a sleep window
    pub sleeping_flag: bool,
    /// ES-RMS only: remaining ticks in the current idle gap
    pub extra_sleep: i64,
    /// ES-RMS only: whether the current idle gap is classified as deep sleep
    pub deep_sleep_flag: bool,
}

impl Sleeper {
    /// A sleeper with no forced-sleep window configured (used before admission finalizes it)
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_unadmitted() {
        let t = Task::new(1, 2, 5, 1);
        assert!(!t.is_admitted());
        assert!((t.utilization - 0.4).abs() < 1e-9);
    }
}
