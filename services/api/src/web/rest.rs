//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the document endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{auth, chat, state::AppState};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use pdf_chat_core::domain::{NewPdfRecord, PdfRecord};
use pdf_chat_core::ports::PortError;
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

const PDF_CONTENT_TYPE: &str = "application/pdf";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        chat::chat_handler,
        upload_handler,
        list_pdfs_handler,
        delete_pdf_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::session_handler,
    ),
    components(
        schemas(
            UploadResponse,
            PdfSummary,
            ListPdfsResponse,
            ErrorResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
        )
    ),
    tags(
        (name = "PDF Chat API", description = "Chat relay, uploads and sessions for the PDF chat app.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// The response payload sent after a successful upload.
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Metadata record id; absent when the blob was stored but recording it failed.
    pub id: Option<Uuid>,
    pub url: String,
    pub pathname: String,
    pub content_type: String,
    pub size: i64,
}

#[derive(Serialize, ToSchema)]
pub struct PdfSummary {
    pub id: Uuid,
    pub filename: String,
    pub url: String,
    pub pathname: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

impl From<PdfRecord> for PdfSummary {
    fn from(record: PdfRecord) -> Self {
        Self {
            id: record.id,
            filename: record.file_name,
            url: record.url,
            pathname: record.storage_path,
            content_type: record.content_type,
            size: record.size_bytes,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ListPdfsResponse {
    pub pdfs: Vec<PdfSummary>,
}

type JsonError = (StatusCode, Json<ErrorResponse>);

fn json_error(status: StatusCode, message: &str) -> JsonError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Reduces an uploaded file name to a safe single path segment.
fn sanitize_file_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = unsafe_chars.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Upload a PDF for the signed-in user.
///
/// Accepts a multipart/form-data request with a `file` part. The blob is
/// stored first; its metadata record is appended afterwards and a failure to
/// record it does not fail the upload.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "The PDF to upload, in a part named `file`."),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing file or not a PDF", body = ErrorResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, JsonError> {
    let read_failed = |e: axum::extract::multipart::MultipartError| {
        error!("Failed to read multipart data: {}", e);
        json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload file")
    };

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(read_failed)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(read_failed)?;
        upload = Some((file_name, content_type, data));
        break;
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "No file provided"))?;
    if content_type != PDF_CONTENT_TYPE {
        return Err(json_error(StatusCode::BAD_REQUEST, "Please upload a PDF file"));
    }

    let path = format!(
        "pdfs/{}_{}",
        Utc::now().timestamp_millis(),
        sanitize_file_name(&file_name)
    );
    let blob = app_state
        .blob_store
        .upload(&path, &content_type, data.to_vec())
        .await
        .map_err(|e| {
            error!("Upload error: {:?}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload file")
        })?;

    let saved = match NewPdfRecord::new(user_id, file_name, &blob) {
        Ok(record) => app_state.db.save_pdf_record(record).await,
        Err(e) => Err(e),
    };
    let id = match saved {
        Ok(record) => Some(record.id),
        Err(e) => {
            error!("Error saving PDF info for user {}: {:?}", user_id, e);
            None
        }
    };
    info!("User {} uploaded {}", user_id, blob.path);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            id,
            url: blob.url,
            pathname: blob.path,
            content_type: blob.content_type,
            size: blob.size_bytes,
        }),
    ))
}

/// List the signed-in user's uploaded PDFs, newest first.
#[utoipa::path(
    get,
    path = "/user-pdfs",
    responses(
        (status = 200, description = "The caller's PDFs", body = ListPdfsResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_pdfs_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ListPdfsResponse>, JsonError> {
    let records = app_state
        .db
        .list_pdf_records(user_id)
        .await
        .map_err(|e| {
            error!("Fetch PDFs error: {:?}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch PDFs")
        })?;

    Ok(Json(ListPdfsResponse {
        pdfs: records.into_iter().map(PdfSummary::from).collect(),
    }))
}

/// Delete one of the signed-in user's PDFs.
///
/// The metadata record goes first so the document disappears from listings
/// even if removing the stored file fails afterwards.
#[utoipa::path(
    delete,
    path = "/user-pdfs/{id}",
    params(("id" = Uuid, Path, description = "The PDF record id")),
    responses(
        (status = 204, description = "PDF deleted"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No such PDF for this user", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_pdf_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(pdf_id): Path<Uuid>,
) -> Result<StatusCode, JsonError> {
    let record = app_state
        .db
        .delete_pdf_record(user_id, pdf_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "PDF not found"),
            _ => {
                error!("Delete PDF error: {:?}", e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete PDF")
            }
        })?;

    match app_state.blob_store.delete(&record.storage_path).await {
        Ok(()) | Err(PortError::NotFound(_)) => {}
        Err(e) => warn!("Failed to remove blob {}: {:?}", record.storage_path, e),
    }
    info!("User {} deleted {}", user_id, record.storage_path);

    Ok(StatusCode::NO_CONTENT)
}
