//! Taskset ingest (fixed-format import file) and random taskset generation

use crate::error::{Result, SimError};
use crate::task::Task;
use rand::Rng;
use std::path::Path;

/// One taskset record: its own reported utilization/ID plus the tasks
/// themselves, each already carrying its pinned `cpuid` per the import
/// file's per-core blocks.
#[derive(Debug, Clone)]
pub struct TasksetSpec {
    /// Taskset identifier, as given in the import file or assigned by the generator
    pub taskset_id: u32,
    /// Nominal target utilization (informational)
    pub utilization: f64,
    /// Minimum forced-sleep duration across cores, in ticks
    pub csleep_min_ticks: u64,
    /// The tasks themselves, pre-pinned to a core
    pub tasks: Vec<Task>,
}

const MULT_FACTOR: u64 = 100;
const DEFAULT_INGEST_POWER_FOLDER: u32 = 7;

/// Tokenizes a taskset import file's whitespace-separated fields and reads
/// records from it one at a time.
pub struct TasksetReader {
    tokens: Vec<String>,
    pos: usize,
}

impl TasksetReader {
    /// Load a taskset import file
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let tokens = content.split_whitespace().map(str::to_string).collect();
        Ok(Self { tokens, pos: 0 })
    }

    fn next_token(&mut self) -> Option<&str> {
        let tok = self.tokens.get(self.pos).map(String::as_str);
        self.pos += 1;
        tok
    }

    fn next_u32(&mut self) -> Result<u32> {
        self.next_token()
            .ok_or(SimError::IoEndOfStream)?
            .parse()
            .map_err(|_| SimError::ParseShort("expected integer".into()))
    }

    fn next_f64(&mut self) -> Result<f64> {
        self.next_token()
            .ok_or(SimError::IoEndOfStream)?
            .parse()
            .map_err(|_| SimError::ParseShort("expected float".into()))
    }

    /// Whether any tokens remain to parse
    pub fn has_more(&self) -> bool {
        self.pos < self.tokens.len()
    }

    /// Read the next taskset record. Returns `Err(IoEndOfStream)` when the
    /// stream is exhausted cleanly before a new record starts, or
    /// `Err(ParseShort)` if a record begins but is truncated or malformed.
    /// Per-core zero-task records are flagged via `Err(TasksetDiscarded)`
    /// after the whole (malformed-but-complete) record has been consumed.
    pub fn next_record(&mut self) -> Result<TasksetSpec> {
        if !self.has_more() {
            return Err(SimError::IoEndOfStream);
        }
        let taskset_id = self.next_u32()?;
        let utilization = self.next_f64()?;
        let csleep_min = self.next_u32()? as u64;
        let num_cores = self.next_u32()?;

        let mut tasks = Vec::new();
        let mut discard = false;
        let mut pid = 0u32;

        for core in 0..num_cores {
            let _core_id = self.next_u32()?;
            let num_tasks = self.next_u32()?;
            if num_tasks == 0 {
                discard = true;
                continue;
            }
            let _csleep = self.next_f64()?;
            let _tsleep = self.next_f64()?;
            for _ in 0..num_tasks {
                let c = self.next_u32()? as u64;
                let t = self.next_u32()? as u64;
                let mut task = Task::new(pid, c * MULT_FACTOR, t * MULT_FACTOR, DEFAULT_INGEST_POWER_FOLDER);
                task.cpuid = core as i32;
                tasks.push(task);
                pid += 1;
            }
        }

        if discard {
            return Err(SimError::TasksetDiscarded(taskset_id));
        }

        Ok(TasksetSpec {
            taskset_id,
            utilization,
            csleep_min_ticks: csleep_min * MULT_FACTOR,
            tasks,
        })
    }
}

/// Generate a random taskset of `num_tasks` tasks spread across
/// `num_cores` cores (unpinned; pinning happens at admission), targeting
/// `utilization_bound` total system utilization via UUniFast-Discard.
pub fn generate_taskset(
    rng: &mut impl Rng,
    taskset_id: u32,
    num_tasks: usize,
    utilization_bound: f64,
    min_period_ticks: u64,
    max_period_ticks: u64,
    num_power_folders: u32,
) -> TasksetSpec {
    let utilizations = uunifast_discard(rng, num_tasks, utilization_bound);

    let period_span = max_period_ticks.saturating_sub(min_period_ticks).max(1);
    let tasks = utilizations
        .into_iter()
        .enumerate()
        .map(|(i, u)| {
            let period = min_period_ticks + rng.gen_range(0..period_span);
            let c = (u * period as f64).floor() as u64 + 1;
            let power_folder = rng.gen_range(1..=num_power_folders);
            let mut task = Task::new(i as u32, c, period, power_folder);
            task.utilization = u;
            task.arrival_time = rng.gen_range(0..min_period_ticks.max(1));
            task
        })
        .collect();

    TasksetSpec {
        taskset_id,
        utilization: utilization_bound,
        csleep_min_ticks: min_period_ticks / 3,
        tasks,
    }
}

/// UUniFast-Discard: split a target utilization across `n` tasks,
/// resampling up to 1000 times if any share exceeds `task_upper_bound`.
fn uunifast_discard(rng: &mut impl Rng, n: usize, utilization_bound: f64) -> Vec<f64> {
    const TASK_UPPER_BOUND: f64 = 0.75;
    const ITERATIONS: usize = 1000;

    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![utilization_bound.min(TASK_UPPER_BOUND)];
    }

    for _ in 0..ITERATIONS {
        let mut sum = utilization_bound;
        let mut shares = Vec::with_capacity(n);
        let mut ok = true;
        for i in 1..n {
            let r: f64 = rng.gen_range(0.0..1.0);
            let next_sum = sum * r.powf(1.0 / (n - i) as f64);
            let share = sum - next_sum;
            if share > TASK_UPPER_BOUND {
                ok = false;
                break;
            }
            shares.push(share);
            sum = next_sum;
        }
        if ok && sum <= TASK_UPPER_BOUND {
            shares.push(sum);
            return shares;
        }
    }
    // Fell through every resample: clamp evenly rather than fail the run.
    vec![utilization_bound / n as f64; n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::io::Write;

    #[test]
    fn parses_single_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 0.5 15 2").unwrap();
        writeln!(file, "0 1").unwrap();
        writeln!(file, "1.5 10").unwrap();
        writeln!(file, "2 5").unwrap();
        writeln!(file, "1 1").unwrap();
        writeln!(file, "1.5 10").unwrap();
        writeln!(file, "3 8").unwrap();
        file.flush().unwrap();

        let mut reader = TasksetReader::open(file.path()).unwrap();
        let spec = reader.next_record().unwrap();
        assert_eq!(spec.taskset_id, 1);
        assert_eq!(spec.tasks.len(), 2);
        assert_eq!(spec.tasks[0].cpuid, 0);
        assert_eq!(spec.tasks[0].c, 200);
        assert_eq!(spec.tasks[0].t, 500);
        assert_eq!(spec.tasks[1].cpuid, 1);
    }

    #[test]
    fn discards_taskset_with_empty_core() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2 0.5 15 2").unwrap();
        writeln!(file, "0 0").unwrap();
        writeln!(file, "1 1").unwrap();
        writeln!(file, "1.5 10").unwrap();
        writeln!(file, "2 5").unwrap();
        file.flush().unwrap();

        let mut reader = TasksetReader::open(file.path()).unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, SimError::TasksetDiscarded(2)));
    }

    #[test]
    fn clean_eof_after_last_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1 0.5 15 1").unwrap();
        writeln!(file, "0 1").unwrap();
        writeln!(file, "1.5 10").unwrap();
        writeln!(file, "2 5").unwrap();
        file.flush().unwrap();

        let mut reader = TasksetReader::open(file.path()).unwrap();
        reader.next_record().unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(matches!(err, SimError::IoEndOfStream));
    }

    #[test]
    fn generated_taskset_respects_utilization_bound_shape() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let spec = generate_taskset(&mut rng, 1, 4, 0.4, 1500, 40000, 11);
        assert_eq!(spec.tasks.len(), 4);
        for t in &spec.tasks {
            assert!(t.c >= 1);
            assert!(t.t >= 1500);
        }
    }
}
