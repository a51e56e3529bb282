use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{Ack, FileQueue};
use crate::error::Result;

/// Granularity of interruptible sleeps.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// One processing step of a stage, applied to a single input file.
pub trait Job {
    fn name(&self) -> &str;

    /// Process `input` and return the files written.
    fn process(&self, input: &Path) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub poll_interval_ms: u64,
    /// Wait before opening a file so writers can finish.
    pub settle_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            settle_delay_ms: 500,
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub processed: usize,
    pub failed: usize,
    pub crashed: usize,
}

impl PassSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed + self.crashed
    }
}

pub struct Worker<J> {
    queue: FileQueue,
    job: J,
    config: WorkerConfig,
}

impl<J: Job> Worker<J> {
    pub fn new(queue: FileQueue, job: J, config: WorkerConfig) -> Self {
        Self { queue, job, config }
    }

    pub fn queue(&self) -> &FileQueue {
        &self.queue
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    /// Process every file currently in the inbox, stopping early if `stop` is set.
    pub fn run_once(&self, stop: &AtomicBool) -> Result<PassSummary> {
        let mut summary = PassSummary::default();

        for input in self.queue.poll()? {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            interruptible_sleep(self.config.settle_delay(), stop);
            if stop.load(Ordering::Relaxed) {
                break;
            }
            if !input.exists() {
                tracing::debug!("'{}' disappeared before processing", input.display());
                continue;
            }

            match self.process_one(&input) {
                Ack::Done => summary.processed += 1,
                Ack::Failed => summary.failed += 1,
                Ack::Crashed => summary.crashed += 1,
            }
        }

        Ok(summary)
    }

    /// Poll until `stop` is set.
    pub fn run(&self, stop: &AtomicBool) -> Result<()> {
        self.queue.ensure_dirs()?;
        tracing::info!(
            "{} worker watching '{}'",
            self.job.name(),
            self.queue.dirs().inbox.display()
        );

        while !stop.load(Ordering::Relaxed) {
            let summary = match self.run_once(stop) {
                Ok(summary) => summary,
                Err(err) => {
                    tracing::error!("{} poll failed: {}", self.job.name(), err);
                    PassSummary::default()
                }
            };
            if summary.total() > 0 {
                tracing::info!(
                    "{} pass: {} ok, {} failed, {} crashed",
                    self.job.name(),
                    summary.processed,
                    summary.failed,
                    summary.crashed
                );
            }
            interruptible_sleep(self.config.poll_interval(), stop);
        }

        tracing::info!("{} worker stopped", self.job.name());
        Ok(())
    }

    fn process_one(&self, input: &Path) -> Ack {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.job.process(input)));

        let ack = match outcome {
            Ok(Ok(outputs)) => {
                tracing::info!(
                    "{}: '{}' -> {} output(s) in {:.2?}",
                    self.job.name(),
                    input.display(),
                    outputs.len(),
                    started.elapsed()
                );
                Ack::Done
            }
            Ok(Err(err)) => {
                tracing::warn!("{}: '{}' failed: {}", self.job.name(), input.display(), err);
                Ack::Failed
            }
            Err(payload) => {
                tracing::error!(
                    "{}: '{}' crashed: {}",
                    self.job.name(),
                    input.display(),
                    panic_message(payload.as_ref())
                );
                Ack::Crashed
            }
        };

        self.queue.ack(input, ack);
        ack
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn interruptible_sleep(duration: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(STOP_CHECK_INTERVAL));
    }
}
