//! Queue test setup utilities

#![allow(dead_code)]

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_sqs::Client as SqsClient;
use backend_storage::queue::{QueueConfig, QueueUrl, SqsQueueBackend, UntwisterBlock};
use std::sync::Arc;
use uuid::Uuid;

/// Builds a work block with the given seed range
pub fn block(min_seed: u64, max_seed: u64) -> UntwisterBlock {
    UntwisterBlock {
        job_id: Some(Uuid::new_v4().simple().to_string()),
        prng: "mt19937".to_string(),
        inputs: vec![1_791_095_845, 4_282_876_139],
        depth: 1000,
        min_seed,
        max_seed,
    }
}

/// Test context that provides an SQS client and a set of prefixed queues
pub struct QueueTestContext {
    pub sqs_client: Arc<SqsClient>,
    /// Unique prefix shared by every queue of this context
    pub prefix: String,
    pub queue_urls: Vec<QueueUrl>,
}

impl QueueTestContext {
    /// Creates `count` queues under a prefix unique to this test
    pub async fn new(test_name: &str, count: usize) -> Self {
        let prefix = format!("{}_{}_", test_name, Uuid::new_v4().simple());

        // Setup LocalStack client with hardcoded credentials for CI
        let credentials = Credentials::from_keys(
            "test", // AWS_ACCESS_KEY_ID
            "test", // AWS_SECRET_ACCESS_KEY
            None,   // no session token
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url("http://localhost:4566")
            .region("us-east-1")
            .credentials_provider(credentials)
            .load()
            .await;

        let sqs_client = Arc::new(SqsClient::new(&config));

        let mut queue_urls = Vec::with_capacity(count);
        for index in 0..count {
            let result = sqs_client
                .create_queue()
                .queue_name(format!("{prefix}{index}"))
                .send()
                .await
                .expect("Failed to create test queue");

            queue_urls.push(QueueUrl::new(
                result.queue_url().expect("Queue URL not returned"),
            ));
        }

        Self {
            sqs_client,
            prefix,
            queue_urls,
        }
    }

    /// Backend with no long-polling so empty queues return immediately
    pub fn backend(&self) -> SqsQueueBackend {
        SqsQueueBackend::new(
            self.sqs_client.clone(),
            QueueConfig {
                default_max_messages: 1,
                default_visibility_timeout: Some(30),
                default_wait_time_seconds: 0,
            },
        )
    }

    /// Sends a raw body to one of the context's queues
    pub async fn send_raw(&self, queue: &QueueUrl, body: &str) {
        self.sqs_client
            .send_message()
            .queue_url(queue.as_str())
            .message_body(body)
            .send()
            .await
            .expect("Failed to send test message");
    }

    /// Sends a JSON encoded block to one of the context's queues
    pub async fn send_block(&self, queue: &QueueUrl, block: &UntwisterBlock) {
        let body = serde_json::to_string(block).expect("Failed to encode block");
        self.send_raw(queue, &body).await;
    }
}

impl Drop for QueueTestContext {
    fn drop(&mut self) {
        let client = self.sqs_client.clone();
        let queue_urls = std::mem::take(&mut self.queue_urls);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                for queue_url in queue_urls {
                    let _ = client.delete_queue().queue_url(queue_url.as_str()).send().await;
                }
            });
        }
    }
}
