//! Storage and orchestration services.
//!
//! `DocumentRepository` owns the `documents` table, `BlobStore` owns the
//! upload directory, and `DocumentService` composes the two.

pub mod blob_store;
pub mod document_service;
pub mod metadata_store;

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document: {0}")]
    Validation(String),
    #[error("document not found")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
