use pr_reviewer_lib::services::server;
use pr_reviewer_lib::{db, AppConfig, AppError};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Install the fmt subscriber; it also receives `log` records.
fn init_logging(config: &AppConfig) {
    let default_level = if config.is_local() { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    log::info!(
        "Starting pr-reviewer (env={:?}, database={})",
        config.env,
        config.database_path.display()
    );

    let pool = db::initialize(&config.database_path, config.pool_settings()).await?;

    let handle = server::start_server(config.socket_addr()?, pool.clone(), config.request_timeout())
        .await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutdown signal received");
    handle.shutdown().await;

    pool.close().await;
    Ok(())
}
