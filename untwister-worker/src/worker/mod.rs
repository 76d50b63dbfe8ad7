pub mod config;
pub mod consumer;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use backend_storage::queue::{QueueBackend, QueueError};
use futures::FutureExt;
use metrics::counter;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::untwister::{command::CommandRunner, UntwisterInvoker};

pub use self::config::WorkerConfig;
use self::consumer::{PassStats, RoundRobinConsumer};

/// Floor for the restart delay, so doubling always makes progress
const MIN_RESTART_DELAY: Duration = Duration::from_millis(1);

/// What one enumeration cycle found
#[derive(Debug)]
enum Cycle {
    /// No queue matched the prefix
    NoQueues,
    /// A pass ran over the enumerated queues
    Pass(PassStats),
}

/// Untwister worker: discovers job queues and consumes them forever
///
/// Every cycle re-enumerates the queues, so queues created or deleted by the
/// job generator are picked up without a restart.
pub struct UntwisterWorker<Q, R> {
    config: WorkerConfig,
    queue: Arc<Q>,
    consumer: RoundRobinConsumer<Q, R>,
    shutdown_token: CancellationToken,
}

impl<Q, R> UntwisterWorker<Q, R>
where
    Q: QueueBackend,
    R: CommandRunner,
{
    /// Creates a new untwister worker
    pub fn new(config: WorkerConfig, queue: Arc<Q>, runner: R) -> Self {
        let invoker = UntwisterInvoker::new(runner, config.untwister_path.clone());
        let consumer = RoundRobinConsumer::new(Arc::clone(&queue), invoker);

        Self {
            config,
            queue,
            consumer,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Returns a clone of the shutdown token for external control
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs enumeration and consumption cycles until shutdown
    ///
    /// Failed or panicking cycles are logged and restarted; this only returns
    /// once the shutdown token is cancelled.
    pub async fn start(self) {
        info!(
            "Starting untwister worker for queues prefixed '{}'",
            self.config.queue_name_prefix
        );

        let initial_restart_delay = self.config.restart_delay.max(MIN_RESTART_DELAY);
        let mut restart_delay = initial_restart_delay;

        loop {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Untwister worker received shutdown signal");
                    break;
                }
                result = AssertUnwindSafe(self.run_cycle()).catch_unwind() => result,
            };

            let delay = match result {
                Ok(Ok(Cycle::Pass(stats))) => {
                    debug!(
                        "Pass visited {} queue(s), processed {} message(s)",
                        stats.queues_visited, stats.messages_processed
                    );
                    restart_delay = initial_restart_delay;
                    continue;
                }
                Ok(Ok(Cycle::NoQueues)) => {
                    restart_delay = initial_restart_delay;
                    info!(
                        "No queues exist, waiting {:?} before looping...",
                        self.config.empty_queue_backoff
                    );
                    self.config.empty_queue_backoff
                }
                Ok(Err(e)) => {
                    let upstream = e
                        .downcast_ref::<QueueError>()
                        .is_some_and(QueueError::is_upstream_error);
                    error!(
                        error = ?e,
                        upstream,
                        "Cycle failed, restarting worker in {:?}",
                        restart_delay
                    );
                    counter!("untwister_cycle_failed").increment(1);
                    next_restart_delay(&mut restart_delay, self.config.max_restart_delay)
                }
                Err(panic) => {
                    error!(
                        "Cycle panicked: {}, restarting worker in {:?}",
                        panic_message(panic.as_ref()),
                        restart_delay
                    );
                    counter!("untwister_cycle_failed").increment(1);
                    next_restart_delay(&mut restart_delay, self.config.max_restart_delay)
                }
            };

            // Wait with cancellation support
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Untwister worker shutting down during backoff");
                    break;
                }
                () = sleep(delay) => {}
            }
        }

        info!("Untwister worker stopped");
    }

    /// Enumerates the queues and, if there are any, runs one pass over them
    async fn run_cycle(&self) -> anyhow::Result<Cycle> {
        let queues = self
            .queue
            .list_queues(&self.config.queue_name_prefix)
            .await
            .context("Failed to list queues")?;

        if queues.is_empty() {
            return Ok(Cycle::NoQueues);
        }

        debug!("Pulling off of {} queue(s)", queues.len());
        let stats = self.consumer.run_pass(&queues).await?;
        Ok(Cycle::Pass(stats))
    }
}

/// Returns the current restart delay and doubles it for the next failure
fn next_restart_delay(restart_delay: &mut Duration, max: Duration) -> Duration {
    let current = *restart_delay;
    *restart_delay = restart_delay.saturating_mul(2).min(max);
    current
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
