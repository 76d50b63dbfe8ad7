//! Queue operations for the untwister worker
//!
//! This module provides functionality for discovering AWS SQS queues by name
//! prefix and consuming untwister work blocks from them.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Queue backend trait
pub mod backend;
/// Error types for queue operations
pub mod error;
/// SQS backend implementation
pub mod sqs_queue;
/// Common types for queue operations
pub mod types;

pub use backend::QueueBackend;
pub use error::{QueueError, QueueResult};
pub use sqs_queue::SqsQueueBackend;
pub use types::{QueueConfig, QueueMessage, QueueUrl, UntwisterBlock};
