//! Represents an uploaded document and its stored blob reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Metadata record describing one uploaded file.
///
/// The `Document` struct stores descriptive attributes only; the bytes live in
/// the blob directory under `file_path`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Server-assigned row id.
    pub id: i64,

    /// User-supplied display name.
    pub name: String,

    /// Original filename of the upload, used as the download label.
    pub file_name: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// MIME type as reported by the uploading client.
    pub file_type: Option<String>,

    /// Size in bytes at upload time.
    pub file_size: i64,

    /// Storage key of the blob (`<uuid>_<filename>`).
    pub file_path: String,

    /// When the document was uploaded.
    pub upload_date: DateTime<Utc>,
}

/// A document that has not been inserted yet.
#[derive(Clone, Debug)]
pub struct NewDocument {
    pub name: String,
    pub file_name: String,
    pub description: Option<String>,
    pub file_type: Option<String>,
    pub file_size: i64,
    pub file_path: String,
    pub upload_date: DateTime<Utc>,
}

impl NewDocument {
    /// Build a new document; `upload_date` is fixed to the current time.
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        file_size: i64,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            description: None,
            file_type: None,
            file_size,
            file_path: file_path.into(),
            upload_date: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_file_type(mut self, file_type: Option<String>) -> Self {
        self.file_type = file_type;
        self
    }
}

/// Aggregate figures over every stored document.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub total_documents: i64,

    /// Sum of `file_size` across all documents.
    pub total_size: i64,

    /// Documents uploaded within the last seven days.
    pub recent_uploads: i64,

    /// Document count per MIME type; missing types are counted as `Unknown`.
    pub file_types: BTreeMap<String, i64>,
}
