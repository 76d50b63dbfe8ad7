//! Backend storage services for the untwister worker
//!
//! All durable state of the worker lives in the queue service; this crate wraps
//! the SQS operations the worker depends on.

pub mod queue;
