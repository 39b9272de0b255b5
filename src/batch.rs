use crate::{
    error::{BatchError, FileError},
    report::BatchReport,
    result::FileResult,
    task::{FileTask, ProcessTask},
    util::now_rfc3339,
};
use crossbeam::channel::{self, RecvTimeoutError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKER_CAP: usize = 8;

/// A validated, non-zero worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCount(usize);

impl WorkerCount {
    pub fn new(requested: i64) -> Result<Self, BatchError> {
        if requested < 1 {
            return Err(BatchError::InvalidWorkerCount(requested));
        }
        Ok(Self(requested as usize))
    }

    /// `min(cap, available CPUs)`, never below 1.
    pub fn auto(cap: usize) -> Self {
        Self(cap.min(num_cpus::get()).max(1))
    }

    /// `None` falls back to [`WorkerCount::auto`].
    pub fn resolve(requested: Option<i64>, cap: usize) -> Result<Self, BatchError> {
        match requested {
            Some(n) => Self::new(n),
            None => Ok(Self::auto(cap)),
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Fans tasks out over a fixed pool of worker threads and collects exactly
/// one result per task.
pub struct Coordinator {
    processor: Arc<dyn ProcessTask>,
    workers: WorkerCount,
    timeout: Option<Duration>,
}

impl Coordinator {
    pub fn new(processor: Arc<dyn ProcessTask>, workers: WorkerCount) -> Self {
        Self {
            processor,
            workers,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn workers(&self) -> WorkerCount {
        self.workers
    }

    pub fn run(&self, tasks: Vec<FileTask>) -> BatchReport {
        let started_at = now_rfc3339();
        let started = Instant::now();
        let total = tasks.len();
        if total == 0 {
            return BatchReport::new(Vec::new(), self.workers.get(), started_at, 0.0);
        }

        let pool_size = self.workers.get().min(total);
        info!("processing {total} files with {pool_size} workers");

        let paths: Vec<_> = tasks.iter().map(|t| t.path.clone()).collect();
        let (task_tx, task_rx) = channel::unbounded::<(usize, FileTask)>();
        let (result_tx, result_rx) = channel::unbounded::<(usize, FileResult)>();
        let cancelled = Arc::new(AtomicBool::new(false));

        for item in tasks.into_iter().enumerate() {
            // Receiver is alive until the workers below exit.
            let _ = task_tx.send(item);
        }
        drop(task_tx);

        let mut handles = Vec::with_capacity(pool_size);
        for worker_id in 0..pool_size {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let cancelled = cancelled.clone();
            let processor = self.processor.clone();
            handles.push(std::thread::spawn(move || {
                while let Ok((index, task)) = task_rx.recv() {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    let result = run_contained(processor.as_ref(), &task);
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
                debug!(worker_id, "worker exiting");
            }));
        }
        drop(task_rx);
        drop(result_tx);

        let deadline = self.timeout.map(|t| started + t);
        let mut reported = vec![false; total];
        let mut results = Vec::with_capacity(total);
        let mut timed_out = false;

        while results.len() < total {
            let received = match deadline {
                Some(d) => result_rx.recv_deadline(d),
                None => result_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((index, result)) => {
                    reported[index] = true;
                    let mark = if result.is_success() { "ok" } else { "failed" };
                    debug!(
                        "[{}/{}] {} {}",
                        results.len() + 1,
                        total,
                        mark,
                        result.file_name()
                    );
                    results.push(result);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("batch timeout reached; abandoning outstanding files");
                    cancelled.store(true, Ordering::Relaxed);
                    timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("all workers exited before every file reported");
                    break;
                }
            }
        }

        for (index, done) in reported.iter().enumerate() {
            if !done {
                let err = if timed_out {
                    FileError::Timeout
                } else {
                    FileError::Internal("worker exited before reporting a result".into())
                };
                results.push(FileResult::failure(&paths[index], err));
            }
        }

        // Abandoned workers are left to finish their current file on their own.
        if !timed_out {
            for handle in handles {
                let _ = handle.join();
            }
        }

        BatchReport::new(
            results,
            self.workers.get(),
            started_at,
            started.elapsed().as_secs_f64(),
        )
    }
}

fn run_contained(processor: &dyn ProcessTask, task: &FileTask) -> FileResult {
    panic::catch_unwind(AssertUnwindSafe(|| processor.process(task))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked".to_string());
        FileResult::failure(&task.path, FileError::Internal(format!("panic: {message}")))
    })
}
