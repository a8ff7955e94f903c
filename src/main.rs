use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use sqlx::SqlitePool;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    blob_store::BlobStore, document_service::DocumentService, metadata_store::DocumentRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting document-store with config: {:?}", cfg);

    // --- Ensure upload directory exists ---
    if !Path::new(&cfg.upload_dir).exists() {
        fs::create_dir_all(&cfg.upload_dir)?;
        tracing::info!("Created upload directory at {}", cfg.upload_dir);
    }

    // --- Initialize SQLite connection + schema ---
    let db: Arc<SqlitePool> = Arc::new(db::connect(&cfg.database_url).await?);
    db::run_migrations(&db).await?;

    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize core service ---
    let service = DocumentService::new(
        DocumentRepository::new(db.clone()),
        BlobStore::new(&cfg.upload_dir),
    );

    // --- Build router ---
    let app: Router = routes::routes::routes()
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes()))
        .layer(cors_layer(&cfg.cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(service);

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

/// CORS for the browser client; `*` allows any origin.
fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::DELETE]);
    if origin == "*" {
        return Ok(layer
            .allow_origin(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any));
    }
    let origin: HeaderValue = origin
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid CORS origin `{}`: {}", origin, err))?;
    Ok(layer
        .allow_origin(origin)
        .allow_headers(tower_http::cors::Any))
}
