#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use backend_storage::queue::{
    QueueBackend, QueueConfig, QueueError, QueueMessage, QueueResult, QueueUrl, UntwisterBlock,
};
use tokio::time::Instant;
use untwister_worker::untwister::command::{CommandOutput, CommandRunner};
use untwister_worker::worker::WorkerConfig;

/// Long-poll wait simulated for empty queues
pub const RECEIVE_WAIT: Duration = Duration::from_secs(10);

/// Worker configuration with test-friendly delays
pub fn test_config() -> WorkerConfig {
    WorkerConfig {
        queue_name_prefix: "f5_".to_string(),
        queue: QueueConfig::default(),
        untwister_path: "/opt/untwister".into(),
        untwister_timeout: None,
        empty_queue_backoff: Duration::from_secs(2),
        restart_delay: Duration::from_millis(100),
        max_restart_delay: Duration::from_secs(1),
        health_port: 0,
    }
}

/// A block the invoker accepts
pub fn block(min_seed: u64, max_seed: u64) -> UntwisterBlock {
    UntwisterBlock {
        job_id: Some("0f5e".to_string()),
        prng: "mt19937".to_string(),
        inputs: vec![1_791_095_845, 4_282_876_139, 3_093_770_124],
        depth: 1000,
        min_seed,
        max_seed,
    }
}

/// Everything the in-memory backend has seen
#[derive(Default)]
pub struct MockState {
    pub queues: Vec<QueueUrl>,
    pub messages: HashMap<QueueUrl, VecDeque<QueueMessage<String>>>,
    pub list_calls: Vec<(Instant, String)>,
    pub receive_calls: Vec<QueueUrl>,
    /// Every delete attempt, successful or not
    pub delete_calls: Vec<(QueueUrl, String)>,
    pub fail_next_lists: usize,
    pub fail_next_deletes: usize,
    next_id: usize,
}

/// In-memory queue backend
///
/// Receives on an empty queue wait `RECEIVE_WAIT` like an SQS long-poll, so
/// tests driving it should run with a paused clock.
#[derive(Default)]
pub struct MockQueueBackend {
    state: Mutex<MockState>,
}

impl MockQueueBackend {
    pub fn with_queues(names: &[&str]) -> Self {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            for name in names {
                let url = queue_url(name);
                state.messages.insert(url.clone(), VecDeque::new());
                state.queues.push(url);
            }
        }
        backend
    }

    /// Enqueues a raw body, returning its receipt handle
    pub fn push_raw(&self, name: &str, body: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let receipt_handle = format!("receipt-{id}");

        state
            .messages
            .get_mut(&queue_url(name))
            .expect("unknown queue")
            .push_back(QueueMessage {
                body: body.to_string(),
                receipt_handle: receipt_handle.clone(),
                message_id: format!("message-{id}"),
            });
        receipt_handle
    }

    /// Enqueues a JSON encoded block, returning its receipt handle
    pub fn push_block(&self, name: &str, block: &UntwisterBlock) -> String {
        self.push_raw(name, &serde_json::to_string(block).unwrap())
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

pub fn queue_url(name: &str) -> QueueUrl {
    QueueUrl::new(format!(
        "https://sqs.us-east-1.amazonaws.com/000000000000/{name}"
    ))
}

#[async_trait]
impl QueueBackend for MockQueueBackend {
    async fn list_queues(&self, prefix: &str) -> QueueResult<Vec<QueueUrl>> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.list_calls.push((Instant::now(), prefix.to_string()));
        if state.fail_next_lists > 0 {
            state.fail_next_lists -= 1;
            return Err(QueueError::InvalidMessage(
                "simulated listing failure".to_string(),
            ));
        }
        Ok(state.queues.clone())
    }

    async fn receive_message(&self, queue: &QueueUrl) -> QueueResult<Option<QueueMessage<String>>> {
        let message = {
            let mut state = self.state.lock().unwrap();
            state.receive_calls.push(queue.clone());
            state.messages.get_mut(queue).and_then(VecDeque::pop_front)
        };

        match message {
            Some(message) => {
                tokio::task::yield_now().await;
                Ok(Some(message))
            }
            None => {
                tokio::time::sleep(RECEIVE_WAIT).await;
                Ok(None)
            }
        }
    }

    async fn delete_message(&self, queue: &QueueUrl, receipt_handle: &str) -> QueueResult<()> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state
            .delete_calls
            .push((queue.clone(), receipt_handle.to_string()));
        if state.fail_next_deletes > 0 {
            state.fail_next_deletes -= 1;
            return Err(QueueError::InvalidMessage(
                "simulated delete failure".to_string(),
            ));
        }
        Ok(())
    }
}

type Respond = dyn Fn(&[String]) -> CommandOutput + Send + Sync;

/// Command runner that records its calls and answers with a canned output
#[derive(Clone)]
pub struct FakeRunner {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    respond: Arc<Respond>,
}

impl FakeRunner {
    pub fn new(respond: impl Fn(&[String]) -> CommandOutput + Send + Sync + 'static) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            respond: Arc::new(respond),
        }
    }

    /// Runner whose tool always prints `seed`
    pub fn recovering(seed: &'static str) -> Self {
        Self::new(move |_| CommandOutput {
            error: None,
            stdout: format!("{seed}\n"),
            stderr: String::new(),
        })
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, _program: &Path, args: &[String]) -> CommandOutput {
        self.calls.lock().unwrap().push(args.to_vec());
        (self.respond)(args)
    }
}
