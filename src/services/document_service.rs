//! DocumentService — the public operation surface over the two stores.
//!
//! There is no transaction spanning SQLite and the upload directory. The
//! write order is fixed instead: uploads write the blob before the row,
//! deletes remove the blob before the row.

use super::{
    DocumentError, DocumentResult,
    blob_store::{BlobStore, StoredBlob},
    metadata_store::DocumentRepository,
};
use crate::models::document::{Document, DocumentStats, NewDocument};
use bytes::Bytes;
use chrono::{Duration, Utc};
use futures::Stream;
use std::io;
use tokio::fs::File;
use tracing::{info, warn};

const RECENT_UPLOAD_WINDOW_DAYS: i64 = 7;
const UNKNOWN_FILE_TYPE: &str = "Unknown";

/// A blob that has been written but not yet recorded in the metadata store.
///
/// Either `complete_upload` or `abandon_upload` must consume it.
#[derive(Debug)]
pub struct PendingUpload {
    blob: StoredBlob,
    file_name: String,
    file_type: Option<String>,
}

impl PendingUpload {
    pub fn key(&self) -> &str {
        &self.blob.key
    }
}

#[derive(Clone)]
pub struct DocumentService {
    pub repo: DocumentRepository,
    pub blobs: BlobStore,
}

impl DocumentService {
    pub fn new(repo: DocumentRepository, blobs: BlobStore) -> Self {
        Self { repo, blobs }
    }

    pub async fn list(&self) -> DocumentResult<Vec<Document>> {
        self.repo.list_all().await
    }

    pub async fn get(&self, id: i64) -> DocumentResult<Document> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(DocumentError::NotFound)
    }

    /// Write a blob and insert its metadata row in one call.
    #[cfg(test)]
    pub async fn upload<S>(
        &self,
        name: &str,
        original_filename: &str,
        content_type: Option<String>,
        description: Option<String>,
        stream: S,
    ) -> DocumentResult<Document>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let pending = self
            .receive_file(original_filename, content_type, stream)
            .await?;
        self.complete_upload(pending, name, description).await
    }

    /// First half of an upload: stream the file body into the blob store.
    pub async fn receive_file<S>(
        &self,
        original_filename: &str,
        content_type: Option<String>,
        stream: S,
    ) -> DocumentResult<PendingUpload>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let blob = self.blobs.store(original_filename, stream).await?;
        Ok(PendingUpload {
            blob,
            file_name: original_filename.to_string(),
            file_type: content_type,
        })
    }

    /// Second half of an upload: insert the metadata row for a stored blob.
    ///
    /// If the insert fails (including a blank name or filename), the blob is
    /// removed before the error is returned.
    pub async fn complete_upload(
        &self,
        pending: PendingUpload,
        name: &str,
        description: Option<String>,
    ) -> DocumentResult<Document> {
        let new_doc = NewDocument::new(
            name,
            pending.file_name.clone(),
            pending.blob.key.clone(),
            pending.blob.size_bytes,
        )
        .with_description(description)
        .with_file_type(pending.file_type.clone());

        match self.repo.insert(&new_doc).await {
            Ok(doc) => {
                info!(id = doc.id, key = %doc.file_path, size = doc.file_size, "document uploaded");
                Ok(doc)
            }
            Err(err) => {
                self.abandon_upload(pending).await;
                Err(err)
            }
        }
    }

    /// Discard a stored blob that will never get a metadata row.
    pub async fn abandon_upload(&self, pending: PendingUpload) {
        if let Err(err) = self.blobs.delete(pending.key()).await {
            warn!(key = %pending.key(), error = %err, "failed to remove orphaned blob");
        }
    }

    /// Look up a document and open its blob for streaming.
    ///
    /// A row whose blob is missing on disk is reported as NotFound.
    pub async fn download(&self, id: i64) -> DocumentResult<(Document, File)> {
        let doc = self.get(id).await?;
        let file = self.blobs.open(&doc.file_path).await.inspect_err(|err| {
            if matches!(err, DocumentError::NotFound) {
                warn!(id, key = %doc.file_path, "metadata row has no blob on disk");
            }
        })?;
        Ok((doc, file))
    }

    /// Remove the blob, then the row. A failed blob removal leaves the row
    /// in place.
    pub async fn delete(&self, id: i64) -> DocumentResult<()> {
        let doc = self.get(id).await?;
        self.blobs.delete(&doc.file_path).await?;
        if !self.repo.delete_by_id(id).await? {
            return Err(DocumentError::NotFound);
        }
        info!(id, key = %doc.file_path, "document deleted");
        Ok(())
    }

    pub async fn search(&self, query: &str) -> DocumentResult<Vec<Document>> {
        self.repo.search_by_name(query).await
    }

    pub async fn search_by_file_type(&self, query: &str) -> DocumentResult<Vec<Document>> {
        self.repo.search_by_file_type(query).await
    }

    pub async fn stats(&self) -> DocumentResult<DocumentStats> {
        let docs = self.repo.list_all().await?;
        let recent_cutoff = Utc::now() - Duration::days(RECENT_UPLOAD_WINDOW_DAYS);

        let mut stats = DocumentStats::default();
        for doc in &docs {
            stats.total_documents += 1;
            stats.total_size += doc.file_size;
            if doc.upload_date > recent_cutoff {
                stats.recent_uploads += 1;
            }
            let file_type = doc
                .file_type
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(UNKNOWN_FILE_TYPE);
            *stats.file_types.entry(file_type.to_string()).or_default() += 1;
        }
        Ok(stats)
    }
}
