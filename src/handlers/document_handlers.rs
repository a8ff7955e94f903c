//! HTTP handlers for document operations.
//! Streams upload and download bodies to avoid buffering in memory and
//! delegates storage concerns to `DocumentService`.

use crate::{
    errors::AppError,
    models::document::{Document, DocumentStats},
    services::{
        DocumentError,
        document_service::{DocumentService, PendingUpload},
    },
};
use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use std::io;
use tokio_util::io::ReaderStream;

/// Query string for the search endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// GET `/documents` — every document in insertion order.
pub async fn list_documents(
    State(service): State<DocumentService>,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(service.list().await?))
}

/// GET `/documents/{id}`
pub async fn get_document(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(service.get(id).await?))
}

/// POST `/documents/upload` — multipart fields `file`, `name`, `description`.
///
/// Fields may arrive in any order, so the file is streamed to disk as soon as
/// it is seen and its metadata row is inserted once the whole form is read.
pub async fn upload_document(
    State(service): State<DocumentService>,
    mut multipart: Multipart,
) -> Result<Json<Document>, AppError> {
    let mut form = UploadForm::default();

    if let Err(err) = read_upload_form(&service, &mut multipart, &mut form).await {
        if let Some(pending) = form.pending.take() {
            service.abandon_upload(pending).await;
        }
        return Err(err);
    }

    let pending = form
        .pending
        .ok_or_else(|| AppError::bad_request("missing `file` field"))?;
    let name = form.name.unwrap_or_default();

    let doc = service
        .complete_upload(pending, &name, form.description)
        .await?;
    Ok(Json(doc))
}

/// GET `/documents/download/{id}` — raw bytes as an attachment.
pub async fn download_document(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let (doc, file) = service.download(id).await?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&doc.file_name),
    );

    Ok(response)
}

/// DELETE `/documents/{id}`
pub async fn delete_document(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    service.delete(id).await?;
    Ok(StatusCode::OK)
}

/// GET `/documents/search?query=` — case-insensitive name search.
pub async fn search_documents(
    State(service): State<DocumentService>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(service.search(&q.query).await?))
}

/// GET `/documents/search/type?query=` — case-insensitive MIME type search.
pub async fn search_documents_by_type(
    State(service): State<DocumentService>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Document>>, AppError> {
    Ok(Json(service.search_by_file_type(&q.query).await?))
}

/// GET `/documents/stats`
pub async fn document_stats(
    State(service): State<DocumentService>,
) -> Result<impl IntoResponse, AppError> {
    let stats: DocumentStats = service.stats().await?;
    Ok(Json(stats))
}

#[derive(Default)]
struct UploadForm {
    name: Option<String>,
    description: Option<String>,
    pending: Option<PendingUpload>,
}

async fn read_upload_form(
    service: &DocumentService,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                if form.pending.is_some() {
                    return Err(AppError::bad_request("more than one `file` field"));
                }
                form.pending = Some(receive_file(service, field).await?);
            }
            "name" => form.name = Some(field.text().await?),
            "description" => {
                let text = field.text().await?;
                form.description = Some(text).filter(|d| !d.is_empty());
            }
            other => tracing::debug!("ignoring multipart field `{}`", other),
        }
    }
    Ok(())
}

async fn receive_file(
    service: &DocumentService,
    field: Field<'_>,
) -> Result<PendingUpload, AppError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let stream = field.map_err(io::Error::other);

    service
        .receive_file(&file_name, content_type, stream)
        .await
        .map_err(upload_error)
}

/// Body read failures surface as `Io`; keep the status the multipart layer
/// assigned to them (e.g. 413 when the body limit is hit).
fn upload_error(err: DocumentError) -> AppError {
    if let DocumentError::Io(io_err) = &err {
        if let Some(multipart_err) = io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return AppError::new(multipart_err.status(), multipart_err.body_text());
        }
    }
    AppError::from(err)
}

/// Ids that are not integers cannot name a document.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::not_found(format!("document `{}` not found", raw)))
}

fn content_disposition(file_name: &str) -> HeaderValue {
    let escaped: String = file_name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' { '\'' } else { c })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", escaped))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
