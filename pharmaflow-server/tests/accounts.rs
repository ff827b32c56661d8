//! Registration, login and admin account management

mod common;

use common::TestApp;
use http::StatusCode;
use serde_json::{Value, json};
use shared::error::ErrorCode;

fn code(body: &Value) -> u64 {
    body["code"].as_u64().unwrap_or_default()
}

async fn register(app: &TestApp, email: &str, role: &str) -> (StatusCode, Value) {
    app.post(
        "/auth/register",
        None,
        json!({
            "name": "Test User",
            "email": email,
            "password": "correct-horse",
            "role": role
        }),
    )
    .await
}

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    app.post("/auth/login", None, json!({"email": email, "password": password}))
        .await
}

#[tokio::test]
async fn test_register_login_me() {
    let app = TestApp::new();

    let (status, profile) = register(&app, "Asha@Example.com", "customer").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["email"], "asha@example.com");
    assert_eq!(profile["verificationStatus"], "approved");
    assert!(profile.get("passwordHash").is_none());

    let (status, body) = login(&app, "asha@example.com", "correct-horse").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["role"], "customer");

    let (status, me) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], profile["id"]);
}

#[tokio::test]
async fn test_login_failures_are_unified() {
    let app = TestApp::new();
    register(&app, "asha@example.com", "customer").await;

    let (status, wrong_password) = login(&app, "asha@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, unknown) = login(&app, "nobody@example.com", "correct-horse").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(code(&wrong_password), ErrorCode::InvalidCredentials.code() as u64);
    assert_eq!(wrong_password, unknown);
}

#[tokio::test]
async fn test_register_rules() {
    let app = TestApp::new();

    let (status, body) = register(&app, "root@example.com", "admin").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code(&body), ErrorCode::RoleNotRegistrable.code() as u64);

    let (status, _) = register(&app, "asha@example.com", "customer").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = register(&app, "ASHA@example.com", "pharmacist").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code(&body), ErrorCode::EmailAlreadyRegistered.code() as u64);

    let (status, body) = app
        .post(
            "/auth/register",
            None,
            json!({"name": "Short", "email": "short@example.com", "password": "abc", "role": "customer"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(code(&body), ErrorCode::PasswordTooShort.code() as u64);
}

#[tokio::test]
async fn test_operator_verification_flow() {
    let app = TestApp::new();
    let admin = app.admin("A1").await;
    let customer = app.customer("C1").await;

    let (status, pharmacist) = register(&app, "pharma@example.com", "pharmacist").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pharmacist["verificationStatus"], "pending");
    let pharmacist_id = pharmacist["id"].as_str().unwrap().to_string();

    let (_, body) = login(&app, "pharma@example.com", "correct-horse").await;
    let pharmacist_token = body["token"].as_str().unwrap().to_string();

    let order_id = app.place_paracetamol(&customer).await;
    let approve = json!({"orderId": order_id, "approved": true});

    let (status, _) = app
        .post("/orders/approve", Some(&pharmacist_token), approve.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, pending) = app
        .get("/admin/users?role=pharmacist&verification=pending", Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, updated) = app
        .post(
            &format!("/admin/users/{pharmacist_id}/verification"),
            Some(&admin.token),
            json!({"status": "approved"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["verificationStatus"], "approved");

    // Clearance is read from storage, the old token now works
    let (status, _) = app
        .post("/orders/approve", Some(&pharmacist_token), approve)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = TestApp::new();
    let customer = app.customer("C1").await;

    let (status, body) = app.get("/admin/users", Some(&customer.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code(&body), ErrorCode::AdminRequired.code() as u64);

    let (status, _) = app.get("/admin/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disabled_account() {
    let app = TestApp::new();
    let admin = app.admin("A1").await;

    let (_, profile) = register(&app, "asha@example.com", "customer").await;
    let user_id = profile["id"].as_str().unwrap().to_string();
    let (_, body) = login(&app, "asha@example.com", "correct-horse").await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, updated) = app
        .post(
            &format!("/admin/users/{user_id}/active"),
            Some(&admin.token),
            json!({"active": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isActive"], false);

    let (status, body) = login(&app, "asha@example.com", "correct-horse").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code(&body), ErrorCode::AccountDisabled.code() as u64);

    let (status, body) = app
        .post("/orders/place", Some(&token), common::paracetamol_order())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code(&body), ErrorCode::AccountDisabled.code() as u64);

    let (status, _) = app
        .post(
            "/admin/users/A1/active",
            Some(&admin.token),
            json!({"active": false}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/admin/users/missing/active",
            Some(&admin.token),
            json!({"active": true}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(code(&body), ErrorCode::UserNotFound.code() as u64);
}
