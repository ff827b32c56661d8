//! Upload Routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /uploads | POST (multipart `file`) | bearer |
//! | /uploads/{filename} | GET | none |

mod handler;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http::header;

use crate::core::ServerState;
use crate::services::documents::content_type;
use crate::{AppError, ErrorCode};

/// Routes behind `require_auth`
pub fn router() -> Router<ServerState> {
    Router::new().route("/uploads", post(handler::upload))
}

/// Public file serving
pub fn public_router() -> Router<ServerState> {
    Router::new().route("/uploads/{filename}", get(serve_uploaded_file))
}

/// Serve uploaded file handler
async fn serve_uploaded_file(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    // Path traversal guard
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(AppError::validation("Invalid filename"));
    }

    let content = state
        .documents
        .load(&filename)
        .await
        .map_err(|e| AppError::with_message(ErrorCode::FileStorageFailed, e.to_string()))?
        .ok_or_else(|| AppError::not_found("File"))?;

    tracing::debug!(filename = %filename, size = content.len(), "Serving uploaded file");
    Ok((
        [(header::CONTENT_TYPE, content_type(&filename))],
        Bytes::from(content),
    )
        .into_response())
}
