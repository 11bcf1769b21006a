//! Sysclock per-core frequency scale factor planning

use crate::task::Task;

/// Per-core frequency plan: a scale factor in (0, 1] and the supported
/// frequency, in GHz, it was snapped to.
#[derive(Debug, Clone, Copy)]
pub struct CorePlan {
    /// Scale factor relative to the fleet's maximum supported frequency
    pub scale: f64,
    /// The supported frequency, in GHz, this core was snapped to
    pub frequency_ghz: f64,
}

/// Compute a per-core frequency plan for `tasks`, given the ascending
/// `frequencies_ghz` table of supported hardware frequencies.
///
/// Cores with no admitted tasks get the maximum frequency (scale 1.0);
/// it is never exercised since such a core stays idle for the whole run.
pub fn plan_frequencies(tasks: &[Task], num_cores: usize, frequencies_ghz: &[f64]) -> Vec<CorePlan> {
    let f_max = *frequencies_ghz.last().expect("at least one supported frequency");
    (0..num_cores)
        .map(|c| plan_core(tasks, c, frequencies_ghz, f_max))
        .collect()
}

fn plan_core(tasks: &[Task], c: usize, frequencies_ghz: &[f64], f_max: f64) -> CorePlan {
    let mut on_core: Vec<&Task> = tasks.iter().filter(|t| t.cpuid == c as i32).collect();
    if on_core.is_empty() {
        return CorePlan {
            scale: 1.0,
            frequency_ghz: f_max,
        };
    }
    on_core.sort_by_key(|t| t.t);

    let t_max = on_core.last().unwrap().t;
    let scheduling_points = build_scheduling_points(&on_core, t_max);

    let mut s_ideal = 0.0_f64;
    for (pos, task) in on_core.iter().enumerate() {
        let higher_priority = &on_core[..pos];
        let mut best: Option<f64> = None;
        for &d in &scheduling_points {
            if d > task.t {
                continue;
            }
            let demand: u64 = higher_priority
                .iter()
                .map(|hp| div_ceil(d, hp.t) * hp.c)
                .sum::<u64>()
                + task.c;
            let candidate = demand as f64 / d as f64;
            best = Some(match best {
                Some(b) => b.min(candidate),
                None => candidate,
            });
        }
        if let Some(b) = best {
            s_ideal = s_ideal.max(b);
        }
    }

    let f_ideal = s_ideal * f_max;
    let snapped = frequencies_ghz
        .iter()
        .copied()
        .find(|&f| f >= f_ideal)
        .unwrap_or(f_max);

    CorePlan {
        scale: snapped / f_max,
        frequency_ghz: snapped,
    }
}

fn build_scheduling_points(on_core: &[&Task], t_max: u64) -> Vec<u64> {
    let mut points = std::collections::BTreeSet::new();
    for task in on_core {
        let mut k = 1;
        while k * task.t < t_max {
            points.insert(k * task.t);
            k += 1;
        }
    }
    points.insert(t_max);
    points.into_iter().collect()
}

fn div_ceil(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}
