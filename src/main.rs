use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use presence_hub::config::ServerConfig;
use presence_hub::db::{self, PgStore};
use presence_hub::routes;
use presence_hub::services::hub::Hub;
use presence_hub::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let port = config.port;

    let state = match build_state(config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "db: init failed");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %port, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let hub = Arc::clone(&state.hub);
    let app = routes::app(state);

    info!(%port, "presence hub listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hub))
        .await
    {
        error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Pick the durable store when a database is configured, else memory.
async fn build_state(config: ServerConfig) -> Result<AppState, sqlx::Error> {
    match config.database_url.clone() {
        Some(url) => {
            let pool = db::init_pool(&url, config.db_max_connections).await?;
            info!(max_connections = config.db_max_connections, "db: connected, migrations applied");
            Ok(AppState::with_postgres(config, PgStore::new(pool)))
        }
        None => {
            warn!("db: DATABASE_URL not set; using in-memory store, data is lost on exit");
            Ok(AppState::in_memory(config))
        }
    }
}

/// Resolve on Ctrl-C or SIGTERM, then stop the hub so every session closes.
async fn shutdown_signal(hub: Arc<Hub>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
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
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    let closed = hub.shutdown().await;
    info!(closed, "shutting down");
}
