use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::queue::error::{QueueError, QueueResult};

/// URL of a single SQS queue, as returned by `ListQueues`
///
/// Only valid for the enumeration cycle it was obtained in; queues may be
/// created or deleted between cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueUrl(String);

impl QueueUrl {
    /// Wraps a raw queue URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the URL as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QueueUrl {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl From<&str> for QueueUrl {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

/// One block of an untwister job: a slice of the seed space to brute-force
/// against a set of observed generator outputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UntwisterBlock {
    /// Job this block belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Generator family to attack, e.g. `mt19937`
    pub prng: String,
    /// Observed outputs of the generator
    ///
    /// Signed generators (Java's `nextInt()`) report negative values; they
    /// stand for the two's-complement 32-bit output.
    #[serde(alias = "observations")]
    pub inputs: Vec<i64>,
    /// Number of outputs to generate per candidate seed
    pub depth: u32,
    /// Lower bound of the seed range (inclusive)
    pub min_seed: u64,
    /// Upper bound of the seed range (inclusive)
    pub max_seed: u64,
}

/// Wrapper for queue messages with metadata
#[derive(Debug, Clone)]
pub struct QueueMessage<T> {
    /// The message body
    pub body: T,
    /// Receipt handle for acknowledging the message
    pub receipt_handle: String,
    /// Message ID
    pub message_id: String,
}

impl QueueMessage<String> {
    /// Decodes the raw JSON body, keeping the receipt metadata
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Deserialization` if the body is not valid JSON for `T`
    pub fn decode<T: DeserializeOwned>(self) -> QueueResult<QueueMessage<T>> {
        let body =
            serde_json::from_str(&self.body).map_err(|source| QueueError::Deserialization {
                message_id: self.message_id.clone(),
                source,
            })?;

        Ok(QueueMessage {
            body,
            receipt_handle: self.receipt_handle,
            message_id: self.message_id,
        })
    }
}

/// Configuration for receive operations
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of messages to retrieve per receive
    pub default_max_messages: i32,
    /// Visibility timeout override for received messages (in seconds)
    ///
    /// `None` keeps the queue's own visibility timeout.
    pub default_visibility_timeout: Option<i32>,
    /// Wait time for long polling (in seconds)
    pub default_wait_time_seconds: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_max_messages: 1,
            default_visibility_timeout: None,
            default_wait_time_seconds: 10,
        }
    }
}
