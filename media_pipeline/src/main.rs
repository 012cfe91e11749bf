// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Control-Plane Entry Point
//!
//! Wires `media_pipeline_bootstrap`'s CLI/signal/shutdown layer to this
//! crate's `application::Application` root: parses and validates the CLI,
//! loads layered configuration, connects the SQLite pool, builds every
//! repository and collaborator adapter, then either applies the schema and
//! exits (`migrate`) or starts the encoder dispatch fabric and the engine
//! and runs until a termination signal arrives (`serve`).

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing_subscriber::EnvFilter;

use media_pipeline_bootstrap::cli::ValidatedCommand;
use media_pipeline_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use media_pipeline_bootstrap::shutdown::ShutdownCoordinator;
use media_pipeline_bootstrap::{bootstrap_cli, result_to_exit_code};
use media_pipeline_domain::ports::{Clock, SystemClock};

use media_pipeline::application::application_root::{Application, Collaborators, Repositories};
use media_pipeline::infrastructure::clients::{HttpIndexerClient, HttpTorrentClient};
use media_pipeline::infrastructure::config::AppConfig;
use media_pipeline::infrastructure::delivery::RsyncDeliveryTransport;
use media_pipeline::infrastructure::dispatch::DispatchServer;
use media_pipeline::infrastructure::metrics::MetricsService;
use media_pipeline::infrastructure::notifications::WebhookNotificationSink;
use media_pipeline::infrastructure::repositories::{
    self, SqliteActivityLogRepository, SqliteCircuitBreakerRepository, SqliteDownloadRepository, SqliteEncoderAssignmentRepository,
    SqliteLibraryItemRepository, SqlitePipelineExecutionRepository, SqliteProcessingItemRepository, SqliteRemoteEncoderRepository,
    SqliteRequestRepository, SqliteTemplateRepository,
};

fn install_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Parses the CLI on the current thread (so `--cpu-threads`/`--io-threads`
/// can size the runtime below) rather than under `#[tokio::main]`, which
/// would have already committed to a worker count by the time `main` runs.
fn main() -> std::process::ExitCode {
    result_to_exit_code(bootstrap_and_run())
}

fn bootstrap_and_run() -> anyhow::Result<()> {
    let logger = ConsoleLogger::with_prefix("bootstrap");
    let cli = bootstrap_cli()?;
    install_tracing(cli.verbose);

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(cpu_threads) = cli.cpu_threads {
        logger.info(&format!("sizing runtime to {cpu_threads} worker threads"));
        builder.worker_threads(cpu_threads);
    }
    if let Some(io_threads) = cli.io_threads {
        logger.info(&format!("sizing runtime to {io_threads} max blocking threads"));
        builder.max_blocking_threads(io_threads);
    }
    let runtime = builder.build().map_err(|e| anyhow::anyhow!("failed to build tokio runtime: {e}"))?;

    runtime.block_on(run(&logger, cli.command, cli.config, cli.channel_depth))
}

async fn run(
    logger: &ConsoleLogger,
    command: ValidatedCommand,
    config_path: Option<std::path::PathBuf>,
    channel_depth: usize,
) -> anyhow::Result<()> {
    match command {
        ValidatedCommand::Migrate { database_url } => {
            repositories::connect(&database_url).await?;
            logger.info(&format!("schema migration complete for '{database_url}'"));
            Ok(())
        }
        ValidatedCommand::Serve { bind, database_url } => serve(logger, bind, database_url, config_path, channel_depth).await,
    }
}

async fn serve(
    logger: &ConsoleLogger,
    bind: String,
    database_url: String,
    config_path: Option<std::path::PathBuf>,
    channel_depth: usize,
) -> anyhow::Result<()> {
    let config_path_str = config_path.as_ref().map(|p| p.to_string_lossy().into_owned());
    let mut config = AppConfig::load(config_path_str.as_deref())?;
    config.database_url = database_url;
    config.dispatch.bind_address = bind;
    logger.info("configuration loaded");

    let pool = repositories::connect(&config.database_url).await?;
    logger.info("database pool ready");

    let requests = Arc::new(SqliteRequestRepository::new(pool.clone()));
    let items = Arc::new(SqliteProcessingItemRepository::new(pool.clone()));
    let templates = Arc::new(SqliteTemplateRepository::new(pool.clone()));
    let executions = Arc::new(SqlitePipelineExecutionRepository::new(pool.clone()));
    let assignments = Arc::new(SqliteEncoderAssignmentRepository::new(pool.clone()));
    let breakers = Arc::new(SqliteCircuitBreakerRepository::new(pool.clone()));
    let downloads = Arc::new(SqliteDownloadRepository::new(pool.clone()));
    let activity_log = Arc::new(SqliteActivityLogRepository::new(pool.clone()));
    let library = Arc::new(SqliteLibraryItemRepository::new(pool.clone()));
    let encoders = Arc::new(SqliteRemoteEncoderRepository::new(pool.clone()));

    repositories::seed_default_templates(templates.as_ref()).await?;

    let indexer = Arc::new(HttpIndexerClient::new(config.indexer_base_url.clone(), config.indexer_api_key.clone()));
    let torrents = Arc::new(HttpTorrentClient::new(config.torrent_client_base_url.clone()));
    let transport = Arc::new(RsyncDeliveryTransport::new(config.delivery.rsync_targets()));
    let notifications = Arc::new(WebhookNotificationSink::new(config.notification_webhook_url.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut dispatch_server = DispatchServer::new(&config.dispatch, assignments.clone(), encoders);
    let dispatch_port = Arc::new(dispatch_server.context());

    let engine_config = config.engine_config(channel_depth);
    let application = Application::new(
        Repositories { requests, items, templates, executions, assignments, breakers, downloads, activity_log, library },
        Collaborators { indexer, torrents, transport, notifications, dispatch: dispatch_port, clock },
        engine_config,
    );

    let resume_tx = application.resume_sender();
    let dispatch_task = dispatch_server.serve(&config.dispatch.bind_address, resume_tx, config.dispatch.heartbeat_check_interval()).await?;

    let metrics = Arc::new(MetricsService::new()?);
    let metrics_task = tokio::spawn(serve_metrics(metrics, config.metrics_bind_address.clone()));

    let shutdown = ShutdownCoordinator::default();
    media_pipeline_bootstrap::signals::install(shutdown.clone());
    shutdown.token().cancelled().await;

    tracing::info!("shutdown signal received, draining in-flight work");
    application.shutdown().await;
    dispatch_server.shutdown(std::time::Duration::from_secs(5)).await;
    dispatch_task.abort();
    metrics_task.abort();
    shutdown.complete_shutdown();

    Ok(())
}

async fn serve_metrics(metrics: Arc<MetricsService>, bind_address: String) {
    let router = Router::new().route("/metrics", get(metrics_handler)).with_state(metrics);
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::warn!(%err, %bind_address, "failed to bind metrics listener, metrics endpoint disabled");
            return;
        }
    };
    tracing::info!(%bind_address, "metrics endpoint listening");
    if let Err(err) = axum::serve(listener, router.into_make_service()).await {
        tracing::warn!(%err, "metrics endpoint exited");
    }
}

async fn metrics_handler(State(metrics): State<Arc<MetricsService>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (axum::http::StatusCode::OK, body),
        Err(err) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}
