use anyhow::{Context, Result};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    admin_service::AdminService,
    auth_service::{Authenticator, StaticTokenAuthenticator},
    keys::PublicUrls,
    storage_service,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;
    tracing::info!("Starting school-site-storage with config: {:?}", cfg);

    // --- Storage ---
    let bucket = storage_service::open_bucket(&cfg.storage())
        .await
        .context("opening bucket")?;
    let urls = PublicUrls::new(
        cfg.public_base_url.clone(),
        !cfg.environment.is_development(),
    );

    // --- Authentication collaborator ---
    let auth: Arc<dyn Authenticator> = match &cfg.auth_file {
        Some(path) => {
            let auth = StaticTokenAuthenticator::from_file(path)?;
            tracing::info!(tokens = auth.len(), "loaded admin tokens from {}", path.display());
            Arc::new(auth)
        }
        None => {
            tracing::warn!("No auth file configured; every admin request will be rejected");
            Arc::new(StaticTokenAuthenticator::default())
        }
    };

    // --- Build router ---
    let state = state::AppState::new(AdminService::new(bucket, urls), auth);
    let app = routes::routes::app(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
