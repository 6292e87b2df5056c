use anyhow::Context;
use sicuro_runner::podman::check_runtime_available;
use sicuro_runner::{JobScheduler, PodmanRuntime, RunnerConfig};
use sicuro_server::api::{self, AppState};
use sicuro_server::config::ServerConfig;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sicuro_server=debug,sicuro_runner=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Sicuro CI server...");

    let runner_config = RunnerConfig::from_env().context("Failed to load runner configuration")?;
    runner_config
        .validate()
        .context("Invalid runner configuration")?;

    let server_config = ServerConfig::from_env().context("Failed to load server configuration")?;
    server_config
        .validate()
        .context("Invalid server configuration")?;

    tracing::info!(
        "Logs under {}, languages: {}",
        runner_config.log_root.display(),
        runner_config.images.languages().collect::<Vec<_>>().join(", ")
    );

    if let Err(e) = check_runtime_available(&runner_config.container_program) {
        tracing::warn!("Container runtime unavailable, builds will error: {:#}", e);
    }

    let runtime = Arc::new(PodmanRuntime::new(runner_config.container_program.clone()));
    let scheduler = JobScheduler::new(runner_config, runtime);

    let addr = server_config.bind_addr.clone();
    let app = api::create_router(AppState::new(scheduler, server_config));

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
