//! Authentication Handlers

use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use shared::models::{
    LoginRequest, LoginResponse, RegisterRequest, User, UserProfile, VerificationStatus,
};
use shared::util::{new_id, now_millis};

use crate::api::extract::ApiJson;
use crate::auth::CurrentUser;
use crate::auth::password::{hash_password, verify_password};
use crate::core::ServerState;
use crate::db::StorageError;
use crate::security_log;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, non_blank, validate_email, validate_password,
    validate_required_text,
};
use crate::{AppError, AppResult, ErrorCode};

/// Fixed delay on failed logins to blunt timing attacks
const AUTH_FAILURE_DELAY_MS: u64 = 200;

/// Register an account.
///
/// Customers are approved immediately; pharmacists and delivery partners
/// wait for an admin to approve their verification.
pub async fn register(
    State(state): State<ServerState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    if !req.role.is_self_registrable() {
        security_log!("WARN", "register_admin_attempt", email = req.email.clone());
        return Err(AppError::new(ErrorCode::RoleNotRegistrable).with_detail("role", req.role.as_str()));
    }

    let name = req.name.trim();
    validate_required_text(name, "name", MAX_NAME_LEN)?;
    let email = req.email.trim().to_lowercase();
    validate_email(&email)?;
    validate_password(&req.password)?;
    let phone = non_blank(req.phone.as_deref());
    if let Some(phone) = &phone {
        validate_required_text(phone, "phone", MAX_SHORT_TEXT_LEN)?;
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let user = User {
        id: new_id(),
        name: name.to_string(),
        email,
        phone,
        role: req.role,
        verification_status: if req.role.is_operator() {
            VerificationStatus::Pending
        } else {
            VerificationStatus::Approved
        },
        is_active: true,
        password_hash,
        created_at: now_millis(),
    };

    match state.storage.users.insert(&user).await {
        Ok(()) => {}
        Err(StorageError::Duplicate(_)) => {
            return Err(AppError::new(ErrorCode::EmailAlreadyRegistered).with_detail("email", user.email));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        user_id = %user.id,
        role = %user.role,
        verification = %user.verification_status,
        "User registered"
    );
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<ServerState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    let user = state.storage.users.find_by_email(&email).await?;

    // Unified error for unknown email and wrong password
    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        found => {
            tokio::time::sleep(Duration::from_millis(AUTH_FAILURE_DELAY_MS)).await;
            security_log!(
                "WARN",
                "login_failed",
                email = email.clone(),
                reason = if found.is_some() { "invalid_password" } else { "user_not_found" }
            );
            return Err(AppError::invalid_credentials());
        }
    };

    if !user.is_active {
        security_log!("WARN", "login_disabled_account", user_id = user.id.clone());
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let token = state
        .get_jwt_service()
        .generate_token(&user)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

/// Current user profile
pub async fn me(State(state): State<ServerState>, user: CurrentUser) -> AppResult<Json<UserProfile>> {
    let record = state
        .storage
        .users
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound).with_detail("userId", user.id.as_str()))?;
    Ok(Json(UserProfile::from(&record)))
}
