//! HTTP server for the visualdata pipeline.
//!
//! Exposes describe, clean, export and reduce endpoints over multipart
//! uploads, and serves rendered artifacts from the storage directory.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Containment root for local sources and export databases
    pub project_root: PathBuf,
    /// Directory served under `/static`; rendered pages go to `renders/`
    pub storage_dir: PathBuf,
    /// Base URL used to build artifact locators
    pub public_url: String,
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let port = std::env::var("API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            project_root: std::env::var("PROJECT_ROOT")
                .map(PathBuf::from)
                .or_else(|_| std::env::current_dir())
                .unwrap_or_else(|_| PathBuf::from(".")),
            storage_dir: std::env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./storage")),
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100 * 1024 * 1024), // 100MB
        }
    }
}

impl ServerConfig {
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        let previous_default = format!("http://localhost:{}", self.port);
        self.host = host.into();
        if self.public_url == previous_default {
            self.public_url = format!("http://localhost:{}", port);
        }
        self.port = port;
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}

async fn shutdown_signal(start_time: chrono::DateTime<chrono::Utc>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install CTRL+C handler, running until killed");
        std::future::pending::<()>().await;
    }
    let stop_time = chrono::Utc::now();
    let uptime = stop_time.signed_duration_since(start_time);
    info!(
        stopped_at = %stop_time.to_rfc3339(),
        uptime_secs = uptime.num_seconds(),
        "Shutdown signal received, stopping server gracefully"
    );
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        project_root = %config.project_root.display(),
        storage_dir = %config.storage_dir.display(),
        started_at = %start_time.to_rfc3339(),
        "Initializing server directories"
    );

    std::fs::create_dir_all(&config.storage_dir)?;

    let state = Arc::new(AppState::new(config.clone()));
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        public_url = %config.public_url,
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        "visualdata server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening (press ctrl+c to stop)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(start_time))
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
