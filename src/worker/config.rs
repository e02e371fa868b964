use std::time::Duration;

use crate::error::{FarolError, Result};

pub const DEFAULT_SIGNAL_THRESHOLD: f64 = 0.001;
pub const DEFAULT_COLLECT_THRESHOLD: f64 = 0.0;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: u32,
    pub number_of_workers: u32,
    /// `execute_signal` runs only when `score_signal` exceeds this.
    pub signal_threshold: f64,
    /// `execute_collect` runs only when `score_collect` exceeds this.
    pub collect_threshold: f64,
    /// How long a converged or paused worker blocks on its inbox before
    /// reporting itself idle.
    pub idle_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            number_of_workers: 1,
            signal_threshold: DEFAULT_SIGNAL_THRESHOLD,
            collect_threshold: DEFAULT_COLLECT_THRESHOLD,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl WorkerConfig {
    pub fn for_worker(worker_id: u32, number_of_workers: u32) -> Self {
        Self {
            worker_id,
            number_of_workers,
            ..Default::default()
        }
    }

    /// Tight idle poll for deployments where control traffic must be picked
    /// up quickly.
    pub fn low_latency() -> Self {
        Self {
            worker_id: 0,
            number_of_workers: 1,
            signal_threshold: DEFAULT_SIGNAL_THRESHOLD,
            collect_threshold: DEFAULT_COLLECT_THRESHOLD,
            idle_timeout: Duration::from_millis(1),
        }
    }

    /// Longer idle poll; fewer wakeups on shards that spend most of their
    /// time converged.
    pub fn throughput() -> Self {
        Self {
            worker_id: 0,
            number_of_workers: 1,
            signal_threshold: DEFAULT_SIGNAL_THRESHOLD,
            collect_threshold: DEFAULT_COLLECT_THRESHOLD,
            idle_timeout: Duration::from_millis(20),
        }
    }

    /// Coarser signal gate: vertices whose score stays below 0.01 stop
    /// propagating, trading exactness for earlier quiescence.
    pub fn approximate() -> Self {
        Self {
            worker_id: 0,
            number_of_workers: 1,
            signal_threshold: 0.01,
            collect_threshold: DEFAULT_COLLECT_THRESHOLD,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.number_of_workers == 0 {
            return Err(FarolError::InvalidArgument(
                "number_of_workers must be at least 1".into(),
            ));
        }
        if self.worker_id >= self.number_of_workers {
            return Err(FarolError::InvalidArgument(format!(
                "worker_id {} out of range for {} workers",
                self.worker_id, self.number_of_workers
            )));
        }
        if !self.signal_threshold.is_finite() || !self.collect_threshold.is_finite() {
            return Err(FarolError::InvalidArgument(
                "thresholds must be finite".into(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(FarolError::InvalidArgument(
                "idle_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
