//! Authentication middleware and role guards

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use shared::models::{Role, User, VerificationStatus};

use crate::AppError;
use crate::auth::CurrentUser;
use crate::auth::extractor::authenticate;
use crate::core::ServerState;
use crate::db::UserRepository;
use crate::security_log;
use shared::error::ErrorCode;

/// Require a valid bearer token.
///
/// Applied with `route_layer` to the protected router only; public routes
/// are merged outside of it. Inserts [`CurrentUser`] into the request
/// extensions.
///
/// | Failure | Status |
/// |---------|--------|
/// | no Authorization header | 401 NotAuthenticated |
/// | expired token | 401 TokenExpired |
/// | any other invalid token | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // CORS preflight
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let user = authenticate(state.get_jwt_service(), auth_header, req.uri())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Require the admin role. Must run inside `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_authenticated)?;

    if !user.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            user_id = user.id.clone(),
            user_role = user.role.as_str()
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}

/// Fail with `RoleRequired` (403) unless the caller holds one of `allowed`.
pub fn require_role(user: &CurrentUser, allowed: &[Role], operation: &str) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }

    security_log!(
        "WARN",
        "role_required",
        user_id = user.id.clone(),
        user_role = user.role.as_str(),
        operation = operation
    );

    let allowed_names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
    Err(AppError::with_message(
        ErrorCode::RoleRequired,
        format!("{} requires role: {}", operation, allowed_names.join(" or ")),
    )
    .with_detail("role", user.role.as_str())
    .with_detail("allowed", allowed_names))
}

/// Load the caller's account and require it to be active; pharmacists and
/// delivery partners must also be verification-approved.
///
/// Read from storage on every call, so admin decisions apply to tokens
/// issued before them.
pub async fn require_clearance(
    users: &dyn UserRepository,
    actor: &CurrentUser,
) -> Result<User, AppError> {
    let user = users
        .find_by_id(&actor.id)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::NotAuthenticated, "Account no longer exists"))?;

    if !user.is_active {
        security_log!("WARN", "account_disabled", user_id = user.id.clone());
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }
    if user.role.is_operator() && user.verification_status != VerificationStatus::Approved {
        security_log!(
            "WARN",
            "account_not_verified",
            user_id = user.id.clone(),
            verification = user.verification_status.as_str()
        );
        return Err(AppError::new(ErrorCode::AccountNotVerified)
            .with_detail("verificationStatus", user.verification_status.as_str()));
    }
    Ok(user)
}
