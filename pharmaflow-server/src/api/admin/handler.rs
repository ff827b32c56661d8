//! Admin Handlers: account review

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{ActiveUpdate, UserFilter, UserProfile, VerificationUpdate};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::security_log;
use crate::{AppError, AppResult, ErrorCode};

/// GET /admin/users
pub async fn list_users(
    State(state): State<ServerState>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> AppResult<Json<Vec<UserProfile>>> {
    let users = state.storage.users.list(&filter).await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

/// POST /admin/users/{id}/verification
pub async fn set_verification(
    State(state): State<ServerState>,
    admin: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VerificationUpdate>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .storage
        .users
        .set_verification(&id, req.status)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound).with_detail("userId", id))?;

    security_log!(
        "INFO",
        "verification_changed",
        admin_id = admin.id.clone(),
        user_id = user.id.clone(),
        status = user.verification_status.as_str()
    );
    Ok(Json(UserProfile::from(&user)))
}

/// POST /admin/users/{id}/active
pub async fn set_active(
    State(state): State<ServerState>,
    admin: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ActiveUpdate>,
) -> AppResult<Json<UserProfile>> {
    if id == admin.id && !req.active {
        return Err(AppError::validation("Admins cannot disable their own account"));
    }

    let user = state
        .storage
        .users
        .set_active(&id, req.active)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound).with_detail("userId", id))?;

    security_log!(
        "INFO",
        "account_active_changed",
        admin_id = admin.id.clone(),
        user_id = user.id.clone(),
        active = user.is_active
    );
    Ok(Json(UserProfile::from(&user)))
}
