//! Environment configuration for different deployment stages

use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion, Region};
use backend_storage::queue::QueueConfig;

/// Prefix shared by every job queue the job generator creates
const DEFAULT_QUEUE_NAME_PREFIX: &str = "f5_";

/// Install location of the untwister binary in the worker image
const DEFAULT_UNTWISTER_PATH: &str = "/opt/untwister";

/// Default run limit, 5 minutes short of the 30 minute visibility timeout the
/// job generator gives its queues, so a killed run is still acknowledged
/// with a live receipt handle
const DEFAULT_UNTWISTER_TIMEOUT_SECS: u64 = 25 * 60;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// Returns the AWS region selected through the environment
    ///
    /// `AWS_DEFAULT_REGION` wins over `AWS_REGION`. `None` leaves region
    /// resolution to the SDK's default provider chain.
    #[must_use]
    pub fn aws_region(&self) -> Option<String> {
        env::var("AWS_DEFAULT_REGION")
            .or_else(|_| env::var("AWS_REGION"))
            .ok()
            .filter(|region| !region.trim().is_empty())
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        // Must outlast the long-poll wait of a receive
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(region) = self.aws_region() {
            config_builder = config_builder.region(Region::new(region));
        }

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// Returns the port the liveness server listens on, 80 when `PORT` is unset
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` is set but is not a valid u16
    pub fn health_port(&self) -> Result<u16, ParseIntError> {
        env::var("PORT").map_or(Ok(80), |port| port.trim().parse())
    }

    /// Returns the name prefix of the queues to consume
    #[must_use]
    pub fn queue_name_prefix(&self) -> String {
        env::var("QUEUE_NAME_PREFIX").unwrap_or_else(|_| DEFAULT_QUEUE_NAME_PREFIX.to_string())
    }

    /// Returns the path of the untwister binary
    #[must_use]
    pub fn untwister_path(&self) -> PathBuf {
        env::var("UNTWISTER_PATH").map_or_else(|_| PathBuf::from(DEFAULT_UNTWISTER_PATH), PathBuf::from)
    }

    /// Returns how long a single untwister run may take before it is killed
    ///
    /// Defaults to 25 minutes. `0` disables the timeout.
    #[must_use]
    pub fn untwister_timeout(&self) -> Option<Duration> {
        let secs = parse_var("UNTWISTER_TIMEOUT_SECS").unwrap_or(DEFAULT_UNTWISTER_TIMEOUT_SECS);
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// Returns the receive configuration applied to every discovered queue
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            default_max_messages: 1,
            default_visibility_timeout: parse_var("QUEUE_VISIBILITY_TIMEOUT_SECS"),
            default_wait_time_seconds: parse_var("QUEUE_WAIT_TIME_SECS").unwrap_or(10),
        }
    }

    /// Returns the delay before enumerating again when no queues exist
    #[must_use]
    pub fn empty_queue_backoff(&self) -> Duration {
        Duration::from_millis(parse_var("EMPTY_QUEUE_BACKOFF_MS").unwrap_or(2000))
    }

    /// Returns the initial delay before restarting after a failed cycle
    #[must_use]
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(parse_var("WORKER_RESTART_DELAY_MS").unwrap_or(100))
    }

    /// Returns the maximum delay before restarting after repeated failures
    #[must_use]
    pub fn max_restart_delay(&self) -> Duration {
        Duration::from_millis(parse_var("WORKER_MAX_RESTART_DELAY_MS").unwrap_or(30_000))
    }

    /// Returns the `DogStatsD` agent address, if metrics export is enabled
    #[must_use]
    pub fn dogstatsd_address(&self) -> Option<String> {
        let host = env::var("DD_AGENT_HOST").ok()?;
        let port = env::var("DD_DOGSTATSD_PORT").unwrap_or_else(|_| "8125".to_string());
        Some(format!("{host}:{port}"))
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
