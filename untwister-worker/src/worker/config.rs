use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use backend_storage::queue::QueueConfig;

use crate::types::environment::Environment;

/// Configuration for the untwister worker
///
/// Built once at process start and handed to every component.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name prefix of the job queues to consume
    pub queue_name_prefix: String,
    /// Receive parameters applied to every discovered queue
    pub queue: QueueConfig,
    /// Path of the untwister binary
    pub untwister_path: PathBuf,
    /// Upper bound on a single untwister run
    pub untwister_timeout: Option<Duration>,
    /// Delay before enumerating again when no queues exist
    pub empty_queue_backoff: Duration,
    /// Initial delay before restarting after a failed cycle
    pub restart_delay: Duration,
    /// Maximum delay before restarting after repeated failures
    pub max_restart_delay: Duration,
    /// Port of the liveness server
    pub health_port: u16,
}

impl WorkerConfig {
    /// Creates a new `WorkerConfig` from the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is not a valid port number
    pub fn from_environment(env: &Environment) -> anyhow::Result<Self> {
        let health_port = env
            .health_port()
            .context("PORT environment variable is not a valid u16")?;

        Ok(Self {
            queue_name_prefix: env.queue_name_prefix(),
            queue: env.queue_config(),
            untwister_path: env.untwister_path(),
            untwister_timeout: env.untwister_timeout(),
            empty_queue_backoff: env.empty_queue_backoff(),
            restart_delay: env.restart_delay(),
            max_restart_delay: env.max_restart_delay(),
            health_port,
        })
    }
}
