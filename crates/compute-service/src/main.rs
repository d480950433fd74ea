//! SplitUp compute worker daemon.
//!
//! Receives task execution requests over HTTP, resolves their graph and
//! tensor blobs from object storage, runs the substituted graph on the
//! accelerator, uploads the result, and reports every terminal execution
//! to the listener service.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{error, info};

mod api;
mod config;
mod environment;
mod error;
mod execution;
mod models;
mod notification;

use config::{ConfigService, SharedConfig};
use environment::EnvConfig;
use execution::ExecutionService;
use models::ComputeState;
use notification::NotifierClient;

#[derive(Clone)]
pub struct AppState {
    pub execution: Arc<ExecutionService>,
    pub config_service: Arc<ConfigService>,
    pub shared_config: SharedConfig,
    pub started_at: Instant,
    pub started_at_unix: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = match EnvConfig::from_env() {
        Ok(env) => env,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(env.log_level)
        .init();
    info!("Starting {}", env.service_name);

    let notifier = Arc::new(NotifierClient::new(
        env.heartbeat_url.clone(),
        env.listener_url.clone(),
    )?);

    match notifier.notify_status_update(ComputeState::Idle).await {
        Ok(()) => info!("Successfully notified service startup"),
        Err(err) => error!("All attempts to notify service startup failed: {}", err),
    }

    let shared_config: SharedConfig = Arc::new(RwLock::new(None));
    let config_service = Arc::new(ConfigService::new(
        env.config_url.clone(),
        Arc::clone(&shared_config),
    )?);

    match config_service.load_config().await {
        Ok(_) => info!("Successfully loaded initial configuration"),
        Err(err) => error!("All attempts to load initial configuration failed: {}", err),
    }

    let pipeline = execution::production_pipeline(&env, Arc::clone(&shared_config))?;
    let execution = ExecutionService::start(pipeline, Arc::clone(&notifier));

    let state = AppState {
        execution,
        config_service,
        shared_config,
        started_at: Instant::now(),
        started_at_unix: notification::unix_now(),
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", env.api_port)).await?;
    info!("Starting API server on port {}", env.api_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match notifier.notify_status_update(ComputeState::Offline).await {
        Ok(()) => info!("Successfully notified service shutdown"),
        Err(err) => error!("Failed to notify service shutdown: {}", err),
    }
    info!("Shutting down compute service");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
}
