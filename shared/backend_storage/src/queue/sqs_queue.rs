//! SQS implementation of the queue backend

use async_trait::async_trait;
use aws_sdk_sqs::{types::MessageSystemAttributeName, Client as SqsClient};
use std::sync::Arc;

use crate::queue::{
    backend::QueueBackend,
    error::{QueueError, QueueResult},
    types::{QueueConfig, QueueMessage, QueueUrl},
};

/// Largest page `ListQueues` will return
const LIST_QUEUES_PAGE_SIZE: i32 = 1000;

/// Queue backend talking to AWS SQS
pub struct SqsQueueBackend {
    sqs_client: Arc<SqsClient>,
    config: QueueConfig,
}

impl SqsQueueBackend {
    /// Creates a new SQS backend
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    /// * `config` - Receive parameters applied to every queue
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>, config: QueueConfig) -> Self {
        Self { sqs_client, config }
    }
}

#[async_trait]
impl QueueBackend for SqsQueueBackend {
    async fn list_queues(&self, prefix: &str) -> QueueResult<Vec<QueueUrl>> {
        let mut queue_urls = Vec::new();
        let mut next_token = None;

        // SQS only paginates when MaxResults is set
        loop {
            let result = self
                .sqs_client
                .list_queues()
                .queue_name_prefix(prefix)
                .max_results(LIST_QUEUES_PAGE_SIZE)
                .set_next_token(next_token)
                .send()
                .await?;

            queue_urls.extend(result.queue_urls().iter().map(|url| QueueUrl::new(url.as_str())));

            match result.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        tracing::debug!("Listed {} queue(s) with prefix '{}'", queue_urls.len(), prefix);
        Ok(queue_urls)
    }

    async fn receive_message(&self, queue: &QueueUrl) -> QueueResult<Option<QueueMessage<String>>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(queue.as_str())
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .max_number_of_messages(self.config.default_max_messages)
            .set_visibility_timeout(self.config.default_visibility_timeout)
            .wait_time_seconds(self.config.default_wait_time_seconds)
            .send()
            .await?;

        let Some(msg) = result.messages().first() else {
            return Ok(None);
        };

        let message_id = msg.message_id().unwrap_or_default().to_string();
        let receipt_handle = msg
            .receipt_handle()
            .ok_or_else(|| {
                QueueError::InvalidMessage(format!("message {message_id} has no receipt handle"))
            })?
            .to_string();
        let body = msg
            .body()
            .ok_or_else(|| QueueError::InvalidMessage(format!("message {message_id} has no body")))?
            .to_string();

        Ok(Some(QueueMessage {
            body,
            receipt_handle,
            message_id,
        }))
    }

    async fn delete_message(&self, queue: &QueueUrl, receipt_handle: &str) -> QueueResult<()> {
        self.sqs_client
            .delete_message()
            .queue_url(queue.as_str())
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }
}
