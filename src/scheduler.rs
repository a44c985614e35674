//! Cooperative priority scheduler
//!
//! Round-based dispatcher for [`Task`] steps. Each registered task carries a
//! period and a priority; on every pass the scheduler steps all due tasks in
//! descending priority order (higher number runs first). Tasks must keep
//! their steps short and non-blocking, so a single thread carries the whole
//! control stack at wheel-loop rates.
//!
//! Any task surfacing an error halts every task (motors first, by priority)
//! before the error propagates to the caller.

use crate::error::Result;
use crate::tasks::Task;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry {
    task: Box<dyn Task>,
    priority: u8,
    period_us: u64,
    next_due_us: u64,
}

/// Cooperative task scheduler.
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a task with its dispatch priority and period. Higher
    /// priority numbers run first within a pass. The first step is due
    /// immediately.
    pub fn add_task(&mut self, task: Box<dyn Task>, priority: u8, period_us: u64) {
        log::info!(
            "Scheduling task {} (priority {}, period {} us)",
            task.name(),
            priority,
            period_us
        );
        self.entries.push(Entry {
            task,
            priority,
            period_us,
            next_due_us: 0,
        });
        // Stable sort keeps registration order among equal priorities
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Step every task whose period has elapsed. On error the whole stack
    /// is halted before the error is returned.
    pub fn run_pass(&mut self, now_us: u64) -> Result<()> {
        for i in 0..self.entries.len() {
            if now_us < self.entries[i].next_due_us {
                continue;
            }
            let period = self.entries[i].period_us;
            self.entries[i].next_due_us = now_us + period;
            if let Err(e) = self.entries[i].task.step(now_us) {
                log::error!("Task {} failed: {e}", self.entries[i].task.name());
                self.halt_all();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Microseconds until the next task is due, if any are registered.
    fn next_due_in(&self, now_us: u64) -> Option<u64> {
        self.entries
            .iter()
            .map(|e| e.next_due_us.saturating_sub(now_us))
            .min()
    }

    /// Force every task into its safe state, highest priority first.
    pub fn halt_all(&mut self) {
        for entry in &mut self.entries {
            entry.task.halt();
        }
        log::info!("All tasks halted");
    }

    /// Run passes until `running` goes false or a task fails. Time is the
    /// monotonic clock; between passes the thread sleeps until the next
    /// task is due.
    pub fn run(&mut self, running: &Arc<AtomicBool>) -> Result<()> {
        let start = Instant::now();
        while running.load(Ordering::Relaxed) {
            let now_us = start.elapsed().as_micros() as u64;
            self.run_pass(now_us)?;

            let now_us = start.elapsed().as_micros() as u64;
            if let Some(wait_us) = self.next_due_in(now_us) {
                if wait_us > 0 {
                    std::thread::sleep(Duration::from_micros(wait_us));
                }
            }
        }
        self.halt_all();
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use parking_lot::Mutex;

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail_on_step: Option<usize>,
        steps: usize,
        halted: Arc<AtomicBool>,
    }

    impl Task for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn step(&mut self, _now_us: u64) -> Result<()> {
            self.log.lock().push(self.name);
            if self.fail_on_step == Some(self.steps) {
                return Err(Error::InvalidState {
                    task: self.name,
                    state: 0,
                });
            }
            self.steps += 1;
            Ok(())
        }

        fn halt(&mut self) {
            self.halted.store(true, Ordering::SeqCst);
        }
    }

    fn probe(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        fail_on_step: Option<usize>,
    ) -> (Box<Probe>, Arc<AtomicBool>) {
        let halted = Arc::new(AtomicBool::new(false));
        (
            Box::new(Probe {
                name,
                log: Arc::clone(log),
                fail_on_step,
                steps: 0,
                halted: Arc::clone(&halted),
            }),
            halted,
        )
    }

    #[test]
    fn higher_priority_number_steps_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sched = Scheduler::new();
        let (low, _) = probe("low", &log, None);
        let (high, _) = probe("high", &log, None);
        sched.add_task(low, 1, 1000);
        sched.add_task(high, 4, 1000);

        sched.run_pass(0).unwrap();
        assert_eq!(log.lock().as_slice(), &["high", "low"]);
    }

    #[test]
    fn periods_gate_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sched = Scheduler::new();
        let (fast, _) = probe("fast", &log, None);
        let (slow, _) = probe("slow", &log, None);
        sched.add_task(fast, 1, 2_000);
        sched.add_task(slow, 1, 10_000);

        for now in (0..=10_000u64).step_by(2_000) {
            sched.run_pass(now).unwrap();
        }
        let counts = log.lock();
        assert_eq!(counts.iter().filter(|n| **n == "fast").count(), 6);
        assert_eq!(counts.iter().filter(|n| **n == "slow").count(), 2);
    }

    #[test]
    fn task_error_halts_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sched = Scheduler::new();
        let (good, good_halted) = probe("good", &log, None);
        let (bad, bad_halted) = probe("bad", &log, Some(1));
        sched.add_task(good, 2, 1000);
        sched.add_task(bad, 1, 1000);

        sched.run_pass(0).unwrap();
        let err = sched.run_pass(1000).unwrap_err();
        assert!(matches!(err, Error::InvalidState { task: "bad", .. }));
        assert!(good_halted.load(Ordering::SeqCst));
        assert!(bad_halted.load(Ordering::SeqCst));
    }

    #[test]
    fn run_halts_on_shutdown_signal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sched = Scheduler::new();
        let (task, halted) = probe("only", &log, None);
        sched.add_task(task, 1, 100);

        let running = Arc::new(AtomicBool::new(false));
        sched.run(&running).unwrap();
        assert!(halted.load(Ordering::SeqCst));
    }
}
