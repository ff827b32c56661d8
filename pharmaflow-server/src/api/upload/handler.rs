//! Document Upload Handler
//!
//! Accepts prescriptions and verification documents (PDF or image) from
//! any authenticated user and returns their public URL.

use axum::Json;
use axum::extract::{Multipart, State};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::services::DocumentError;
use crate::services::documents::{ALLOWED_EXTENSIONS, accepted_extension};
use crate::{AppError, AppResult, ErrorCode};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    pub size: usize,
}

pub async fn upload(
    State(state): State<ServerState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let max_bytes = state.config.max_upload_bytes;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("The file field has no filename"))?;
        let data = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;
        file = Some((original_name, data.to_vec()));
        break;
    }

    let (original_name, data) = file.ok_or_else(|| AppError::new(ErrorCode::NoFileProvided))?;

    if data.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyFile));
    }
    if data.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    accepted_extension(&original_name).map_err(document_error)?;

    let stored = state
        .documents
        .store(&original_name, &data)
        .await
        .map_err(document_error)?;

    tracing::info!(
        user_id = %user.id,
        original_name = %original_name,
        filename = %stored.filename,
        size = stored.size,
        "Document uploaded"
    );

    Ok(Json(UploadResponse {
        url: stored.url,
        filename: stored.filename,
        original_name,
        size: stored.size,
    }))
}

fn document_error(e: DocumentError) -> AppError {
    match e {
        DocumentError::InvalidExtension(ext) => AppError::new(ErrorCode::InvalidFileExtension)
            .with_detail("extension", ext)
            .with_detail("allowed", ALLOWED_EXTENSIONS.to_vec()),
        DocumentError::Empty => AppError::new(ErrorCode::EmptyFile),
        DocumentError::Io(err) => {
            AppError::with_message(ErrorCode::FileStorageFailed, format!("Failed to store file: {err}"))
        }
    }
}

/// Body-limit hits surface as multipart read errors
fn multipart_error(e: axum::extract::multipart::MultipartError, max_bytes: usize) -> AppError {
    if e.status() == http::StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        AppError::validation(format!("Invalid multipart request: {}", e.body_text()))
    }
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::new(ErrorCode::FileTooLarge).with_detail("maxBytes", max_bytes)
}
