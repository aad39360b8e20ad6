//! Bounded worker pool for independent per-MU tasks
//!
//! Tasks only read shared inputs and return their own result buffer, so the
//! parallel region needs no locking. Results come back in task order.

use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::error::{EmgError, EmgResult};

/// How the comparison tasks are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One task after the other on the calling thread
    Serial,
    /// Dedicated pool; `None` uses one thread per core
    Parallel { threads: Option<usize> },
}

impl ExecutionMode {
    pub fn from_config(config: &TrackingConfig) -> Self {
        if config.multiprocessing {
            ExecutionMode::Parallel {
                threads: config.num_threads,
            }
        } else {
            ExecutionMode::Serial
        }
    }
}

/// Runs `task(i)` for every `i` in `0..n_tasks`
#[derive(Debug, Clone, Copy)]
pub struct ParallelEvaluator {
    mode: ExecutionMode,
}

impl ParallelEvaluator {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Evaluate every task to completion
    ///
    /// The first error aborts the whole run. Both modes return the same
    /// values in the same order.
    pub fn run<T, F>(&self, n_tasks: usize, task: F) -> EmgResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> EmgResult<T> + Sync + Send,
    {
        match self.mode {
            ExecutionMode::Serial => Self::run_serial(n_tasks, task),
            ExecutionMode::Parallel { threads } => Self::run_parallel(n_tasks, threads, task),
        }
    }

    fn run_serial<T, F>(n_tasks: usize, task: F) -> EmgResult<Vec<T>>
    where
        F: Fn(usize) -> EmgResult<T>,
    {
        let started = Instant::now();
        let mut results = Vec::with_capacity(n_tasks);
        for i in 0..n_tasks {
            results.push(task(i)?);
            info!(
                done = i + 1,
                total = n_tasks,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "comparison progress"
            );
        }
        Ok(results)
    }

    fn run_parallel<T, F>(n_tasks: usize, threads: Option<usize>, task: F) -> EmgResult<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> EmgResult<T> + Sync + Send,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|i| format!("hdemg-worker-{}", i))
            .build()
            .map_err(|e| EmgError::ThreadPool { reason: e.to_string() })?;

        debug!(threads = pool.current_num_threads(), tasks = n_tasks, "starting worker pool");
        let started = Instant::now();

        let results = pool.install(|| {
            (0..n_tasks)
                .into_par_iter()
                .map(|i| {
                    #[cfg(feature = "performance_monitoring")]
                    let task_started = Instant::now();
                    let result = task(i);
                    #[cfg(feature = "performance_monitoring")]
                    debug!(task = i, elapsed_us = task_started.elapsed().as_micros() as u64, "task finished");
                    result
                })
                .collect::<EmgResult<Vec<T>>>()
        })?;

        info!(tasks = n_tasks, elapsed_ms = started.elapsed().as_millis() as u64, "comparison finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmgErrorBuilder, ProcessingStage};

    #[test]
    fn test_modes_agree() {
        let square = |i: usize| -> EmgResult<usize> { Ok(i * i) };
        let serial = ParallelEvaluator::new(ExecutionMode::Serial).run(50, square).unwrap();
        let parallel = ParallelEvaluator::new(ExecutionMode::Parallel { threads: Some(4) })
            .run(50, square)
            .unwrap();
        assert_eq!(serial, parallel);
        assert_eq!(serial[7], 49);
    }

    #[test]
    fn test_error_aborts_run() {
        let failing = |i: usize| -> EmgResult<usize> {
            if i == 3 {
                Err(EmgErrorBuilder::new("test", "task").computation(ProcessingStage::Tracking, "boom"))
            } else {
                Ok(i)
            }
        };
        for mode in [ExecutionMode::Serial, ExecutionMode::Parallel { threads: Some(2) }] {
            assert!(ParallelEvaluator::new(mode).run(8, failing).is_err());
        }
    }

    #[test]
    fn test_mode_from_config() {
        let config = TrackingConfig { multiprocessing: false, ..Default::default() };
        assert_eq!(ExecutionMode::from_config(&config), ExecutionMode::Serial);
        let config = TrackingConfig { num_threads: Some(3), ..Default::default() };
        assert_eq!(ExecutionMode::from_config(&config), ExecutionMode::Parallel { threads: Some(3) });
    }

    #[test]
    fn test_zero_tasks() {
        let out: Vec<usize> = ParallelEvaluator::new(ExecutionMode::Parallel { threads: None })
            .run(0, |i| Ok(i))
            .unwrap();
        assert!(out.is_empty());
    }
}
