use std::time::Duration;

use crate::args::Args;
use crate::dispatcher::RetryPolicy;
use crate::error::ConfigError;
use crate::worker_info::{WorkType, WorkerPool};

/// Validated coordinator settings.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// `host:port` to listen on.
    pub listen_addr: String,

    pub map_pool: WorkerPool,
    pub reduce_pool: WorkerPool,

    pub probe_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_in_flight_tasks: usize,
}

impl CoordinatorConfig {
    /// Default tunables around the given pools.
    pub fn new(map_pool: WorkerPool, reduce_pool: WorkerPool) -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            map_pool,
            reduce_pool,
            probe_timeout: Duration::from_millis(500),
            retry: RetryPolicy::default(),
            max_in_flight_tasks: 16,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let host = args.host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidListenAddr(args.host.clone()));
        }

        let config = Self {
            listen_addr: format!("{}:{}", host, args.port),
            map_pool: WorkerPool::parse(WorkType::Map, &args.map_workers)?,
            reduce_pool: WorkerPool::parse(WorkType::Reduce, &args.reduce_workers)?,
            probe_timeout: Duration::from_millis(args.probe_timeout_ms),
            retry: RetryPolicy {
                attempts_per_worker: args.attempts_per_worker,
                attempt_timeout: Duration::from_millis(args.dispatch_timeout_ms),
                backoff: Duration::from_millis(args.backoff_ms),
                max_backoff: Duration::from_millis(args.max_backoff_ms),
            },
            max_in_flight_tasks: args.max_in_flight_tasks,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_pool.is_empty() {
            return Err(ConfigError::EmptyPool(WorkType::Map));
        }
        if self.reduce_pool.is_empty() {
            return Err(ConfigError::EmptyPool(WorkType::Reduce));
        }
        if self.probe_timeout >= self.retry.attempt_timeout {
            return Err(ConfigError::ProbeTimeoutTooLong {
                probe: self.probe_timeout,
                dispatch: self.retry.attempt_timeout,
            });
        }
        if self.retry.attempts_per_worker == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.max_in_flight_tasks == 0 {
            return Err(ConfigError::NoConcurrency);
        }
        Ok(())
    }
}
