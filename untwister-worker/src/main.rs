use std::sync::Arc;

use aws_sdk_sqs::Client as SqsClient;
use backend_storage::queue::SqsQueueBackend;
use metrics_exporter_dogstatsd::DogStatsDBuilder;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use untwister_worker::health;
use untwister_worker::types::environment::Environment;
use untwister_worker::untwister::command::ProcessRunner;
use untwister_worker::worker::{UntwisterWorker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Environment::from_env();

    // Use JSON format for staging/production (Datadog), regular format for development
    if env.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    info!("Starting Untwister Worker in {:?} environment", env);

    let config = WorkerConfig::from_environment(&env)?;

    if let Some(address) = env.dogstatsd_address() {
        DogStatsDBuilder::default()
            .with_remote_address(&address)
            .and_then(DogStatsDBuilder::install)
            .map_err(|e| anyhow::anyhow!("Failed to install DogStatsD exporter: {e:?}"))?;
        info!("✅ Initialized DogStatsD metrics ({address})");
    }

    let sqs_client = Arc::new(SqsClient::new(&env.aws_config().await));
    let queue = Arc::new(SqsQueueBackend::new(sqs_client, config.queue.clone()));
    let runner = ProcessRunner::new(config.untwister_timeout);
    let health_port = config.health_port;

    let worker = UntwisterWorker::new(config, queue, runner);
    let shutdown_token = worker.shutdown_token();

    // Start liveness server
    let health_shutdown = shutdown_token.clone();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_port, health_shutdown).await {
            error!("Health server error: {}", e);
        }
    });

    // Spawn signal handler
    let signal_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        signal_shutdown.cancel();
    });

    worker.start().await;

    // The worker only returns once the token is cancelled
    health_handle.await.ok();

    info!("Untwister Worker stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
