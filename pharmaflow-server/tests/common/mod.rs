//! Shared helpers for router-level tests
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::response::Response;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use pharmaflow_server::db::Storage;
use pharmaflow_server::{Config, ServerState, api};
use serde_json::{Value, json};
use shared::models::{Role, User, VerificationStatus};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub state: ServerState,
    pub app: Router,
    _upload_dir: TempDir,
}

/// An account created directly in storage, with a ready bearer token
pub struct Actor {
    pub id: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let upload_dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::development();
        config.upload_dir = upload_dir.path().to_path_buf();
        tweak(&mut config);

        let state = ServerState::with_storage(config, Storage::memory());
        let app = api::build_app(state.clone());
        Self {
            state,
            app,
            _upload_dir: upload_dir,
        }
    }

    pub async fn actor(&self, id: &str, role: Role, verification: VerificationStatus) -> Actor {
        let user = User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@pharmaflow.test"),
            phone: None,
            role,
            verification_status: verification,
            is_active: true,
            password_hash: String::new(),
            created_at: 0,
        };
        self.state.storage.users.insert(&user).await.expect("insert user");
        let token = self
            .state
            .get_jwt_service()
            .generate_token(&user)
            .expect("token");
        Actor {
            id: id.to_string(),
            token,
        }
    }

    pub async fn customer(&self, id: &str) -> Actor {
        self.actor(id, Role::Customer, VerificationStatus::Approved).await
    }

    pub async fn pharmacist(&self, id: &str) -> Actor {
        self.actor(id, Role::Pharmacist, VerificationStatus::Approved).await
    }

    pub async fn courier(&self, id: &str) -> Actor {
        self.actor(id, Role::Delivery, VerificationStatus::Approved).await
    }

    pub async fn admin(&self, id: &str) -> Actor {
        self.actor(id, Role::Admin, VerificationStatus::Approved).await
    }

    pub async fn send_raw(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.expect("infallible")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send_raw(request).await;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    /// Place the reference order: 2 x Paracetamol at 10, cash on delivery
    pub async fn place_paracetamol(&self, customer: &Actor) -> String {
        let (status, body) = self
            .post("/orders/place", Some(&customer.token), paracetamol_order())
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["orderId"].as_str().expect("orderId").to_string()
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub fn paracetamol_order() -> Value {
    json!({
        "items": [{"medicineId": "M1", "name": "Paracetamol", "quantity": 2, "price": 10}],
        "deliveryAddress": "12 Baker Street",
        "paymentMethod": "cod",
        "prescriptionUrls": [],
        "totalAmount": 20
    })
}
