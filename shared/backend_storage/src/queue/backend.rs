//! Queue backend abstraction

use async_trait::async_trait;

use crate::queue::{
    error::QueueResult,
    types::{QueueMessage, QueueUrl},
};

/// Enumerate, receive and delete primitives of a message queue service
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Lists every queue whose name starts with `prefix`
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the listing call fails
    async fn list_queues(&self, prefix: &str) -> QueueResult<Vec<QueueUrl>>;

    /// Receives at most one message from `queue`, long-polling while it is empty
    ///
    /// The body is returned undecoded.
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the receive call fails
    async fn receive_message(&self, queue: &QueueUrl) -> QueueResult<Option<QueueMessage<String>>>;

    /// Acknowledges a message by deleting it from `queue`
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the deletion fails
    async fn delete_message(&self, queue: &QueueUrl, receipt_handle: &str) -> QueueResult<()>;
}
