//! Tick-by-tick scheduling engine: the four policy state machines share a
//! common release/execute/complete core and differ only in their
//! idle/sleep decision and their effective-WCET/frequency choice.

use crate::bridge::PowerTempBridge;
use crate::power::{frequency_index, temperature_index, PowerTable};
use crate::queues::QueueSet;
use crate::sysclock::CorePlan;
use crate::task::{Sleeper, Task, TaskId};
use tracing::warn;

/// Which of the four scheduling policies drives the tick loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Plain rate-monotonic scheduling
    Rms,
    /// Energy-saving RMS with idle-vs-deep-sleep classification
    EsRms,
    /// Energy-saving rate-harmonic scheduler plus, scheduled sleep windows
    EsRhsp,
    /// Frequency-scaled RMS
    Sysclock,
}

/// What a core does for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Exec(TaskId),
    Idle,
    Sleep,
}

/// Per-core trace plus the reduced statistics a completed run exposes
#[derive(Debug, Clone)]
pub struct RunTrace {
    /// Per-core power, one row per tick, watts
    pub power: Vec<Vec<f64>>,
    /// Per-core temperature, one row per tick, Kelvin
    pub temperature: Vec<Vec<f64>>,
    /// Number of deadline misses observed during the run
    pub deadline_misses: u64,
}

/// Owns the fleet of tasks, the queues, the sleepers, the power table and
/// thermal bridge for one (taskset, policy) run.
pub struct SchedulerEngine {
    tasks: Vec<Task>,
    queues: QueueSet,
    sleepers: Vec<Sleeper>,
    global_sleep_time: u64,
    syncsleep: bool,
    plans: Vec<CorePlan>,
    power_table: PowerTable,
    bridge: PowerTempBridge,
    frequencies_ghz: Vec<f64>,
    policy: Policy,
    idle_power_watts: f64,
    sim_step_size_secs: f64,
    num_cores: usize,
}

impl SchedulerEngine {
    /// Build an engine ready to run. `tasks` must already carry their
    /// admitted `cpuid`; `sleepers` is the per-core forced-sleep state
    /// from [`crate::partition::derive_sleepers`] (unused by plain RMS).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: Vec<Task>,
        num_cores: usize,
        policy: Policy,
        sleepers: Vec<Sleeper>,
        global_sleep_time: u64,
        syncsleep: bool,
        plans: Vec<CorePlan>,
        power_table: PowerTable,
        bridge: PowerTempBridge,
        frequencies_ghz: Vec<f64>,
        idle_power_watts: f64,
        sim_step_size_secs: f64,
    ) -> Self {
        let mut queues = QueueSet::new(num_cores);
        for task in &tasks {
            if task.is_admitted() {
                queues.push_wait(&tasks, task.pid);
            }
        }
        Self {
            tasks,
            queues,
            sleepers,
            global_sleep_time,
            syncsleep,
            plans,
            power_table,
            bridge,
            frequencies_ghz,
            policy,
            idle_power_watts,
            sim_step_size_secs,
            num_cores,
        }
    }

    /// Run the simulation for `num_ticks` ticks, returning the per-core
    /// power/temperature trace.
    pub fn run(&mut self, num_ticks: u64) -> RunTrace {
        let mut power_trace = vec![Vec::with_capacity(num_ticks as usize); self.num_cores];
        let mut temp_trace = vec![Vec::with_capacity(num_ticks as usize); self.num_cores];
        let mut deadline_misses = 0u64;

        for tick in 0..num_ticks {
            self.queues.release_ready(&self.tasks, tick);

            let mut power = vec![0.0_f64; self.num_cores];
            for c in 0..self.num_cores {
                let decision = self.decide(c, tick);
                power[c] = self.apply_decision(c, tick, decision, &mut deadline_misses);
            }

            if self.syncsleep {
                apply_syncsleep(&mut power, self.idle_power_watts);
            }

            for c in 0..self.num_cores {
                power_trace[c].push(power[c]);
                temp_trace[c].push(self.bridge.temperature()[c]);
            }

            let _ = self.bridge.step(self.sim_step_size_secs, &power);
        }

        RunTrace {
            power: power_trace,
            temperature: temp_trace,
            deadline_misses,
        }
    }

    /// Restore all tasks to the wait queue and reset per-core sleep state,
    /// so the engine could be reused for another run (the CLI driver
    /// instead builds a fresh engine per run, but this mirrors the
    /// source's between-taskset reset discipline).
    pub fn reset(&mut self) {
        self.queues.return_all_to_wait(&mut self.tasks);
        for s in &mut self.sleepers {
            s.sleeping_flag = false;
            s.time_slept = 0;
            s.extra_sleep = 0;
            s.deep_sleep_flag = false;
        }
    }

    fn effective_c(&self, task: &Task, c: usize) -> u64 {
        match self.policy {
            Policy::Sysclock => {
                let scale = self.plans[c].scale;
                ((task.c as f64) / scale).ceil() as u64
            }
            _ => task.c,
        }
    }

    fn frequency_index(&self, c: usize) -> usize {
        match self.policy {
            Policy::Sysclock => frequency_index(self.plans[c].frequency_ghz, &self.frequencies_ghz),
            _ => self.frequencies_ghz.len() - 1,
        }
    }

    fn decide(&mut self, c: usize, now: u64) -> Decision {
        match self.policy {
            Policy::Rms | Policy::Sysclock => self.decide_rms(c, now),
            Policy::EsRhsp => self.decide_es_rhsp(c, now),
            Policy::EsRms => self.decide_es_rms(c, now),
        }
    }

    fn decide_rms(&mut self, c: usize, now: u64) -> Decision {
        if let Some(task) = self.queues.ready(c).first() {
            return Decision::Exec(task);
        }
        let sleeper = &mut self.sleepers[c];
        if !sleeper.sleeping_flag {
            let next_arrival = self
                .queues
                .wait()
                .iter()
                .filter(|&t| self.tasks[t as usize].cpuid == c as i32)
                .map(|t| self.tasks[t as usize].arrival_time)
                .min();
            let horizon = next_arrival.map(|a| a.saturating_sub(now)).unwrap_or(0);
            sleeper.sleeping_time = horizon;
            sleeper.time_slept = 0;
            sleeper.sleeping_flag = true;
        }
        let sleeper = &mut self.sleepers[c];
        let decision = if sleeper.sleeping_time >= self.global_sleep_time {
            Decision::Sleep
        } else {
            Decision::Idle
        };
        sleeper.time_slept += 1;
        if sleeper.time_slept >= sleeper.sleeping_time {
            sleeper.sleeping_flag = false;
        }
        decision
    }

    fn decide_es_rhsp(&mut self, c: usize, now: u64) -> Decision {
        let sleeper = &self.sleepers[c];
        if sleeper.sleep_period == 0 {
            return if let Some(task) = self.queues.ready(c).first() {
                Decision::Exec(task)
            } else {
                Decision::Sleep
            };
        }

        let in_window = (now % sleeper.sleep_period) == sleeper.sleep_phase;
        let sleeping = self.sleepers[c].sleeping_flag;
        let ready_task = self.queues.ready(c).first();

        if let Some(task) = ready_task {
            if !in_window && !sleeping {
                return Decision::Exec(task);
            }
        }

        // Not executing this tick, for whatever reason (no ready task,
        // inside the scheduled window, or already mid-sleep): RHS+ treats
        // all of it as forced sleep and keeps the sleep-window bookkeeping
        // moving regardless of which condition caused it.
        let sleeper = &mut self.sleepers[c];
        sleeper.sleeping_flag = true;
        if in_window {
            sleeper.time_slept = 1;
        } else {
            sleeper.time_slept += 1;
        }
        if sleeper.time_slept == sleeper.sleeping_time {
            sleeper.sleeping_flag = false;
            sleeper.time_slept = 0;
        }
        Decision::Sleep
    }

    fn decide_es_rms(&mut self, c: usize, now: u64) -> Decision {
        let sleeper = &self.sleepers[c];
        if sleeper.sleep_period == 0 {
            return if let Some(task) = self.queues.ready(c).first() {
                Decision::Exec(task)
            } else {
                Decision::Sleep
            };
        }

        let in_window = (now % sleeper.sleep_period) == sleeper.sleep_phase;
        let sleeping = self.sleepers[c].sleeping_flag;

        if in_window {
            let sleeper = &mut self.sleepers[c];
            sleeper.time_slept = 1;
            sleeper.sleeping_flag = true;
            if sleeper.extra_sleep > 0 {
                sleeper.extra_sleep -= 1;
            }
            return Decision::Sleep;
        }
        if sleeping {
            let sleeper = &mut self.sleepers[c];
            sleeper.time_slept += 1;
            if sleeper.time_slept == sleeper.sleeping_time {
                sleeper.sleeping_flag = false;
                sleeper.time_slept = 0;
                if sleeper.extra_sleep == 0 {
                    sleeper.deep_sleep_flag = false;
                }
            }
            if sleeper.extra_sleep > 0 {
                sleeper.extra_sleep -= 1;
            }
            return Decision::Sleep;
        }

        if let Some(task) = self.queues.ready(c).first() {
            return Decision::Exec(task);
        }

        // Idle, outside any scheduled sleep window.
        let sleeper = &mut self.sleepers[c];
        if sleeper.extra_sleep == 0 {
            let next = self
                .queues
                .wait()
                .iter()
                .filter(|&t| self.tasks[t as usize].cpuid == c as i32)
                .map(|t| self.tasks[t as usize].arrival_time)
                .min();
            if let Some(next_arrival) = next {
                let sleeper = &mut self.sleepers[c];
                sleeper.extra_sleep = next_arrival as i64 - now as i64;
                // Cast to i64 before subtracting: `now` can be earlier than
                // `sleep_phase` (e.g. tick 0 under phased sleep staggering),
                // which would underflow a straight unsigned subtraction.
                // Plain truncating division, matching the source's C `/`.
                let phase = sleeper.sleep_phase as i64;
                let period = sleeper.sleep_period as i64;
                let next_sleep_instant = ((now as i64 - phase) / period + 1) * period + phase;
                sleeper.deep_sleep_flag =
                    sleeper.extra_sleep >= self.global_sleep_time as i64 || next_sleep_instant <= next_arrival as i64;
            }
        }
        let sleeper = &mut self.sleepers[c];
        if sleeper.extra_sleep > 0 {
            sleeper.extra_sleep -= 1;
        }
        if sleeper.deep_sleep_flag {
            Decision::Sleep
        } else {
            Decision::Idle
        }
    }

    fn apply_decision(&mut self, c: usize, now: u64, decision: Decision, deadline_misses: &mut u64) -> f64 {
        match decision {
            Decision::Idle => self.idle_power_watts,
            Decision::Sleep => 0.0,
            Decision::Exec(task_id) => {
                let effective_c = self.effective_c(&self.tasks[task_id as usize], c);
                let task = &mut self.tasks[task_id as usize];
                task.time_executed += 1;

                // Fires every tick the task remains past its deadline, not
                // just the first, matching the source's unconditional
                // `sim_count >= arrival_time + T` check.
                if now >= task.arrival_time + task.t {
                    *deadline_misses += 1;
                    warn!(pid = task.pid, tick = now, "task missed deadline");
                }

                if task.time_executed >= effective_c {
                    task.time_executed = 0;
                    task.arrival_time += task.t;
                    self.queues.remove_ready(c, task_id);
                    self.queues.push_wait(&self.tasks, task_id);
                }

                let temp_idx = temperature_index(self.bridge.temperature()[c]);
                let freq_idx = self.frequency_index(c);
                let power_folder = self.tasks[task_id as usize].power_folder;
                let (core_power, _l3_power) = self.power_table.lookup(power_folder, freq_idx, temp_idx);
                core_power
            }
        }
    }
}

fn apply_syncsleep(power: &mut [f64], idle_power_watts: f64) {
    let all_sleep = power.iter().all(|&p| p == 0.0);
    if !all_sleep {
        for p in power.iter_mut() {
            if *p == 0.0 {
                *p = idle_power_watts;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::PowerTempBridge;
    use crate::config::{PowerConfig, ThermalConfig};
    use crate::power::PowerTable;
    use crate::sysclock::CorePlan;
    use crate::thermal::RcThermalModel;

    fn make_engine(tasks: Vec<Task>, num_cores: usize, policy: Policy, sleepers: Vec<Sleeper>, global_sleep_time: u64) -> SchedulerEngine {
        let power_config = PowerConfig::default();
        let power_table = PowerTable::synthetic(&power_config);
        let thermal_config = ThermalConfig {
            resistance: 0.5,
            capacitance: 140.0,
            ambient_temperature_k: 300.0,
            initial_temperature_k: 330.0,
        };
        let bridge = PowerTempBridge::new(Box::new(RcThermalModel::new(&thermal_config)), num_cores, 330.0);
        let plans = vec![
            CorePlan {
                scale: 1.0,
                frequency_ghz: *power_config.frequencies_ghz.last().unwrap()
            };
            num_cores
        ];
        SchedulerEngine::new(
            tasks,
            num_cores,
            policy,
            sleepers,
            global_sleep_time,
            false,
            plans,
            power_table,
            bridge,
            power_config.frequencies_ghz.clone(),
            2.0,
            0.001,
        )
    }

    fn pinned(pid: u32, c: u64, t: u64) -> Task {
        let mut task = Task::new(pid, c, t, 1);
        task.cpuid = 0;
        task
    }

    #[test]
    fn s1_single_core_rms_executes_and_rereleases() {
        let a = pinned(0, 2, 5);
        let tasks = vec![a];
        let mut engine = make_engine(tasks, 1, Policy::Rms, vec![Sleeper::new(); 1], 1500);
        let trace = engine.run(10);
        assert_eq!(trace.deadline_misses, 0);
        // ticks 0,1 execute (power > 0), rest of the period idles
        assert!(trace.power[0][0] > 0.0);
        assert!(trace.power[0][1] > 0.0);
    }

    #[test]
    fn s2_es_rhsp_sleeps_during_scheduled_window_then_executes() {
        let a = pinned(0, 2, 10);
        let sleeper = Sleeper {
            sleep_period: 10,
            sleep_phase: 0,
            sleeping_time: 3,
            time_slept: 0,
            sleeping_flag: false,
            extra_sleep: 0,
            deep_sleep_flag: false,
        };
        let mut engine = make_engine(vec![a], 1, Policy::EsRhsp, vec![sleeper], 1500);
        let trace = engine.run(10);
        // ticks 0,1,2 sleep (0 power), ticks 3,4 execute, ticks 5-9 deep sleep
        assert_eq!(trace.power[0][0], 0.0);
        assert_eq!(trace.power[0][1], 0.0);
        assert_eq!(trace.power[0][2], 0.0);
        assert!(trace.power[0][3] > 0.0);
        assert!(trace.power[0][4] > 0.0);
        assert_eq!(trace.power[0][5], 0.0);
    }

    #[test]
    fn s5_syncsleep_promotes_lone_sleeper_to_idle() {
        let mut power = vec![0.0, 5.0, 0.0, 3.0];
        apply_syncsleep(&mut power, 2.0);
        assert_eq!(power, vec![2.0, 5.0, 2.0, 3.0]);
    }

    #[test]
    fn s5_syncsleep_leaves_all_sleep_untouched() {
        let mut power = vec![0.0, 0.0, 0.0, 0.0];
        apply_syncsleep(&mut power, 2.0);
        assert_eq!(power, vec![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn sysclock_uses_scaled_frequency_and_ceil_wcet() {
        let a = pinned(0, 2, 10);
        let power_config = PowerConfig::default();
        let power_table = PowerTable::synthetic(&power_config);
        let thermal_config = ThermalConfig {
            resistance: 0.5,
            capacitance: 140.0,
            ambient_temperature_k: 300.0,
            initial_temperature_k: 330.0,
        };
        let bridge = PowerTempBridge::new(Box::new(RcThermalModel::new(&thermal_config)), 1, 330.0);
        let plans = vec![CorePlan {
            scale: 0.5,
            frequency_ghz: 1.5,
        }];
        let mut engine = SchedulerEngine::new(
            vec![a],
            1,
            Policy::Sysclock,
            vec![Sleeper::new(); 1],
            1500,
            false,
            plans,
            power_table,
            bridge,
            power_config.frequencies_ghz.clone(),
            2.0,
            0.001,
        );
        let trace = engine.run(10);
        // effective_C = ceil(2/0.5) = 4 ticks of execution before completion
        assert!(trace.power[0][0] > 0.0);
        assert!(trace.power[0][3] > 0.0);
    }
}
