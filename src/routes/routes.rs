//! Defines routes for all document operations.
//!
//! ## Structure
//! - **Collection endpoints**
//!   - `GET    /documents` — list every document
//!   - `POST   /documents/upload` — multipart upload (`file`, `name`, `description`)
//!   - `GET    /documents/search?query=` — name substring search
//!   - `GET    /documents/search/type?query=` — MIME type substring search
//!   - `GET    /documents/stats` — totals, recent uploads, per-type counts
//!
//! - **Document endpoints**
//!   - `GET    /documents/{id}` — metadata
//!   - `DELETE /documents/{id}` — remove blob and metadata
//!   - `GET    /documents/download/{id}` — raw bytes as an attachment

use crate::{
    handlers::{
        document_handlers::{
            delete_document, document_stats, download_document, get_document, list_documents,
            search_documents, search_documents_by_type, upload_document,
        },
        health_handlers::{healthz, readyz},
    },
    services::document_service::DocumentService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all document routes.
///
/// The router carries shared state (`DocumentService`) to all handlers.
pub fn routes() -> Router<DocumentService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Collection routes
        .route("/documents", get(list_documents))
        .route("/documents/upload", post(upload_document))
        .route("/documents/search", get(search_documents))
        .route("/documents/search/type", get(search_documents_by_type))
        .route("/documents/stats", get(document_stats))
        // Document routes
        .route(
            "/documents/{id}",
            get(get_document).delete(delete_document),
        )
        .route("/documents/download/{id}", get(download_document))
}
