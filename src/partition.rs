//! Worst-fit-decreasing admission test and forced-sleep derivation

use crate::task::{Sleeper, Task};

/// Outcome of a worst-fit-decreasing admission pass
#[derive(Debug, Clone)]
pub struct AdmissionResult {
    /// Number of tasks admitted (given a cpuid)
    pub admitted: usize,
    /// Per-core sleeper state, populated only when forced sleep was derived
    pub sleepers: Vec<Sleeper>,
    /// Global sleep time after any per-core halving has been applied
    pub sleep_time_ticks: u64,
}

/// Sort tasks by descending utilization and place them on the
/// least-loaded core in turn, admitting while `u_task + u_core <
/// target_utilization` (strict). Stops permanently on the first rejection.
///
/// Tasks are expected freshly constructed (`cpuid == -1`); on return,
/// admitted tasks have `cpuid` set and rejected tasks are left untouched.
pub fn admit_wfd(tasks: &mut [Task], num_cores: usize, target_utilization: f64) -> usize {
    let mut order: Vec<usize> = (0..tasks.len()).collect();
    order.sort_by(|&a, &b| {
        tasks[b]
            .utilization
            .partial_cmp(&tasks[a].utilization)
            .unwrap()
    });

    let mut core_u = vec![0.0_f64; num_cores];
    let mut wfd_order: Vec<usize> = (0..num_cores).collect();
    let mut admitted = 0;

    for task_idx in order {
        let u_task = tasks[task_idx].utilization;
        let least_loaded = wfd_order[0];
        if u_task + core_u[least_loaded] >= target_utilization {
            break;
        }
        tasks[task_idx].cpuid = least_loaded as i32;
        core_u[least_loaded] += u_task;
        admitted += 1;

        // single bubble pass: only wfd_order[0]'s load changed
        let mut i = 0;
        while i + 1 < wfd_order.len() && core_u[wfd_order[i]] > core_u[wfd_order[i + 1]] {
            wfd_order.swap(i, i + 1);
            i += 1;
        }
    }
    admitted
}

/// After admission, derive per-core forced-sleep parameters for the
/// rate-harmonic-sleep family of policies (ES-RHS+ and ES-RMS).
///
/// For each core, the admitted task with the smallest period becomes that
/// core's highest-priority task and has its phase forced to zero. If any
/// task on the core shares a period within a factor of two of the
/// highest-priority task's period, the core's sleep window is halved; if
/// this happens on *any* core, the global `sleep_time` is also halved.
pub fn derive_sleepers(tasks: &mut [Task], num_cores: usize, base_sleep_time: u64) -> AdmissionResult {
    let mut sleepers = vec![Sleeper::new(); num_cores];
    let mut any_halved = false;

    for c in 0..num_cores {
        // Ties on T are broken by descending utilization: admit_wfd only
        // permutes a local index array rather than physically reordering
        // `tasks` the way the source's in-place admission swap does, so this
        // approximates the traversal order that swap would have left behind.
        let mut hp_idx: Option<usize> = None;
        for (i, t) in tasks.iter().enumerate() {
            if t.cpuid == c as i32 {
                match hp_idx {
                    None => hp_idx = Some(i),
                    Some(cur)
                        if t.t < tasks[cur].t
                            || (t.t == tasks[cur].t && t.utilization > tasks[cur].utilization) =>
                    {
                        hp_idx = Some(i)
                    }
                    _ => {}
                }
            }
        }
        let Some(hp) = hp_idx else { continue };
        let t_hp = tasks[hp].t;
        tasks[hp].arrival_time = 0;

        // The highest-priority task itself always satisfies T <= 2*T_hp, so
        // this is true for every non-empty core; kept literal rather than
        // excluding the hp task, matching the source's own check.
        let halve = tasks.iter().any(|t| t.cpuid == c as i32 && t.t <= 2 * t_hp);
        if halve {
            any_halved = true;
        }

        sleepers[c] = Sleeper {
            sleep_period: if halve { t_hp / 2 } else { t_hp },
            sleep_phase: 0,
            sleeping_time: if halve {
                base_sleep_time / 2
            } else {
                base_sleep_time
            },
            time_slept: 0,
            sleeping_flag: false,
            extra_sleep: 0,
            deep_sleep_flag: false,
        };
    }

    let sleep_time_ticks = if any_halved {
        base_sleep_time / 2
    } else {
        base_sleep_time
    };

    let admitted = tasks.iter().filter(|t| t.is_admitted()).count();
    AdmissionResult {
        admitted,
        sleepers,
        sleep_time_ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_utilization_tasks_cycle_cores_ascending() {
        let mut tasks: Vec<Task> = (0..4).map(|i| Task::new(i, 1, 10, 1)).collect();
        let admitted = admit_wfd(&mut tasks, 4, 0.4);
        assert_eq!(admitted, 4);
        let cpus: Vec<i32> = tasks.iter().map(|t| t.cpuid).collect();
        assert_eq!(cpus, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rejects_when_over_threshold() {
        // u = 0.4 exactly -> strictly not below target, rejected
        let mut tasks = vec![Task::new(0, 2, 5, 1)];
        let admitted = admit_wfd(&mut tasks, 1, 0.4);
        assert_eq!(admitted, 0);
        assert_eq!(tasks[0].cpuid, -1);
    }

    #[test]
    fn second_task_fits_after_first_on_different_core() {
        let mut tasks = vec![Task::new(0, 2, 5, 1), Task::new(1, 1, 3, 1)];
        // u0 = 0.4 rejected outright on any core; use smaller tasks instead
        let admitted = admit_wfd(&mut tasks, 2, 0.5);
        assert_eq!(admitted, 2);
    }

    #[test]
    fn sleeper_halves_when_period_within_factor_two() {
        let mut tasks = vec![Task::new(0, 1, 10, 1), Task::new(1, 1, 15, 1)];
        tasks[0].cpuid = 0;
        tasks[1].cpuid = 0;
        let result = derive_sleepers(&mut tasks, 1, 1500);
        assert_eq!(result.sleepers[0].sleep_period, 5);
        assert_eq!(result.sleep_time_ticks, 750);
    }

    #[test]
    fn single_task_core_still_halves_since_hp_task_satisfies_its_own_check() {
        // The highest-priority task's own period trivially satisfies
        // T <= 2*T_hp, so any core with at least one admitted task halves.
        let mut tasks = vec![Task::new(0, 1, 10, 1)];
        tasks[0].cpuid = 0;
        let result = derive_sleepers(&mut tasks, 1, 1500);
        assert_eq!(result.sleepers[0].sleep_period, 5);
        assert_eq!(result.sleep_time_ticks, 750);
    }
}
