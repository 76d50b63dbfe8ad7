use std::sync::Arc;

use anyhow::Context;
use backend_storage::queue::{QueueBackend, QueueMessage, QueueUrl, UntwisterBlock};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::untwister::{command::CommandRunner, RecoveryOutcome, UntwisterInvoker};

/// Counters for one round-robin pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Queues a receive was issued against
    pub queues_visited: usize,
    /// Messages received, run through untwister and deleted
    pub messages_processed: usize,
}

/// `RoundRobinConsumer` takes at most one block from each queue per pass
pub struct RoundRobinConsumer<Q, R> {
    queue: Arc<Q>,
    invoker: UntwisterInvoker<R>,
}

impl<Q, R> RoundRobinConsumer<Q, R>
where
    Q: QueueBackend,
    R: CommandRunner,
{
    /// Creates a new `RoundRobinConsumer`
    pub const fn new(queue: Arc<Q>, invoker: UntwisterInvoker<R>) -> Self {
        Self { queue, invoker }
    }

    /// Visits every queue once, in order
    ///
    /// # Errors
    ///
    /// Returns an error as soon as a receive, decode or delete fails; the
    /// remaining queues are left for the next pass.
    pub async fn run_pass(&self, queues: &[QueueUrl]) -> anyhow::Result<PassStats> {
        let mut stats = PassStats::default();

        for queue in queues {
            debug!("Receiving messages from {}", queue);
            let message = self
                .queue
                .receive_message(queue)
                .await
                .with_context(|| format!("Failed to receive from {queue}"))?;
            stats.queues_visited += 1;

            let Some(message) = message else {
                continue;
            };

            self.process_and_ack(queue, message).await?;
            stats.messages_processed += 1;
        }

        Ok(stats)
    }

    /// Runs untwister for one message, then deletes it whatever the outcome
    ///
    /// A body that does not decode is left on the queue.
    #[instrument(skip(self, message), fields(queue = %queue, message_id = %message.message_id))]
    async fn process_and_ack(
        &self,
        queue: &QueueUrl,
        message: QueueMessage<String>,
    ) -> anyhow::Result<RecoveryOutcome> {
        let message = message
            .decode::<UntwisterBlock>()
            .context("Failed to decode work block")?;
        let block = &message.body;

        let outcome = self.invoker.invoke(block).await;
        let job_id = block.job_id.as_deref().unwrap_or("-");
        match &outcome {
            RecoveryOutcome::Recovered(seed) => {
                info!(job_id, seed = %seed, "Recovered seed");
            }
            RecoveryOutcome::ErrorButAttempted(stderr) => {
                warn!(job_id, stderr = %stderr, "untwister run errored");
            }
            RecoveryOutcome::Failed(reason) => {
                warn!(job_id, reason = %reason, "untwister run failed");
            }
        }
        counter!("untwister_outcome", "kind" => outcome.kind()).increment(1);

        self.queue
            .delete_message(queue, &message.receipt_handle)
            .await
            .context("Failed to delete message")?;
        debug!("Deleted message");

        Ok(outcome)
    }
}
