//! Per-core ready queues plus the global wait queue
//!
//! Tasks themselves live in a flat arena (`Vec<Task>` indexed by `TaskId`);
//! queues hold only non-owning handles into that arena.

use crate::index::OrderedTaskIndex;
use crate::task::{Task, TaskId};

/// One ready queue per core, plus the single global wait queue
#[derive(Debug, Clone)]
pub struct QueueSet {
    ready: Vec<OrderedTaskIndex<u64>>,
    wait: OrderedTaskIndex<u64>,
}

impl QueueSet {
    /// Build an empty queue set for `num_cores` cores
    pub fn new(num_cores: usize) -> Self {
        Self {
            ready: (0..num_cores).map(|_| OrderedTaskIndex::new()).collect(),
            wait: OrderedTaskIndex::new(),
        }
    }

    /// The ready queue of core `c`
    pub fn ready(&self, c: usize) -> &OrderedTaskIndex<u64> {
        &self.ready[c]
    }

    /// The global wait queue
    pub fn wait(&self) -> &OrderedTaskIndex<u64> {
        &self.wait
    }

    /// Insert `task` into the wait queue, keyed by its current `arrival_time`
    pub fn push_wait(&mut self, tasks: &[Task], task: TaskId) {
        self.wait.insert(tasks[task as usize].arrival_time, task);
    }

    /// Insert `task` into the ready queue of its pinned core, keyed by `T`
    pub fn push_ready(&mut self, tasks: &[Task], task: TaskId) {
        let t = &tasks[task as usize];
        let cpu = t.cpuid as usize;
        self.ready[cpu].insert(t.t, task);
    }

    /// Remove `task` from the ready queue of core `c`
    pub fn remove_ready(&mut self, c: usize, task: TaskId) {
        self.ready[c].remove(task);
    }

    /// Move every wait-queue task with `arrival_time ≤ now` into its pinned
    /// core's ready queue. Traverses the wait queue in ascending
    /// `arrival_time` order and stops at the first task whose arrival has
    /// not yet come due.
    pub fn release_ready(&mut self, tasks: &[Task], now: u64) {
        let due = self.wait.take_while_key_le(now);
        for task in due {
            self.wait.remove(task);
            self.push_ready(tasks, task);
        }
    }

    /// Move every ready task back to the wait queue, normalizing
    /// `arrival_time` modulo its period and resetting `time_executed`.
    /// Used to restore a clean state between runs.
    pub fn return_all_to_wait(&mut self, tasks: &mut [Task]) {
        for core_queue in self.ready.iter_mut() {
            let handles: Vec<TaskId> = core_queue.iter().collect();
            for task in handles {
                let t = &mut tasks[task as usize];
                t.arrival_time %= t.t;
                t.time_executed = 0;
                core_queue.remove(task);
                self.wait.insert(t.arrival_time, task);
            }
        }
    }

    /// Remove all tasks from the wait queue without touching ready queues
    pub fn clear_wait(&mut self) {
        self.wait.clear();
    }

    /// Number of cores this queue set was built for
    pub fn num_cores(&self) -> usize {
        self.ready.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admitted(pid: TaskId, c: u64, t: u64, cpu: i32, arrival: u64) -> Task {
        let mut task = Task::new(pid, c, t, 1);
        task.cpuid = cpu;
        task.arrival_time = arrival;
        task
    }

    #[test]
    fn release_ready_moves_due_tasks_only() {
        let tasks = vec![
            admitted(0, 2, 5, 0, 0),
            admitted(1, 1, 3, 0, 4),
        ];
        let mut qs = QueueSet::new(1);
        qs.push_wait(&tasks, 0);
        qs.push_wait(&tasks, 1);
        qs.release_ready(&tasks, 0);
        assert_eq!(qs.ready(0).iter().collect::<Vec<_>>(), vec![0]);
        assert!(qs.wait().iter().collect::<Vec<_>>().contains(&1));
    }

    #[test]
    fn release_ready_stops_at_first_not_due() {
        let tasks = vec![
            admitted(0, 1, 10, 0, 0),
            admitted(1, 1, 10, 0, 100),
        ];
        let mut qs = QueueSet::new(1);
        qs.push_wait(&tasks, 1);
        qs.push_wait(&tasks, 0);
        qs.release_ready(&tasks, 50);
        assert_eq!(qs.ready(0).iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn return_all_to_wait_normalizes_arrival() {
        let mut tasks = vec![admitted(0, 2, 5, 0, 0)];
        let mut qs = QueueSet::new(1);
        qs.push_ready(&tasks, 0);
        tasks[0].arrival_time = 12;
        qs.return_all_to_wait(&mut tasks);
        assert_eq!(tasks[0].arrival_time, 2);
        assert_eq!(tasks[0].time_executed, 0);
        assert!(qs.ready(0).is_empty());
        assert_eq!(qs.wait().iter().collect::<Vec<_>>(), vec![0]);
    }
}
