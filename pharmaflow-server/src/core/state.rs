use std::sync::Arc;

use anyhow::Context;
use shared::models::{Role, User, VerificationStatus};
use shared::util::{new_id, now_millis};

use crate::auth::JwtService;
use crate::auth::password::hash_password;
use crate::core::{Config, Result};
use crate::db::Storage;
use crate::orders::OrderWorkflow;
use crate::services::{
    DocumentStore, Geocoder, LocalDocumentStore, MockGeocoder, MockPaymentGateway, PaymentGateway,
};

/// Shared server state
///
/// Cheap to clone: every field is an `Arc` or holds `Arc`s.
///
/// | Field | Purpose |
/// |-------|---------|
/// | config | loaded configuration |
/// | storage | order, user and medicine repositories |
/// | jwt_service | token issue and validation |
/// | workflow | order placement and transitions |
/// | documents | uploaded prescriptions and verification documents |
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub storage: Storage,
    pub jwt_service: Arc<JwtService>,
    pub workflow: Arc<OrderWorkflow>,
    pub documents: Arc<dyn DocumentStore>,
}

impl ServerState {
    /// Build state from configuration: PostgreSQL when `DATABASE_URL` is
    /// set, in-memory storage otherwise.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let storage = match &config.database_url {
            Some(url) => Storage::postgres(url).await?,
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory storage");
                Storage::memory()
            }
        };

        let state = Self::with_storage(config.clone(), storage);
        state.bootstrap_admin().await?;

        tracing::info!(
            storage = state.storage.backend,
            upload_dir = %config.upload_dir.display(),
            "Server state initialized"
        );
        Ok(state)
    }

    /// Wire services around an existing storage backend with the mock
    /// payment and geocoding adapters.
    pub fn with_storage(config: Config, storage: Storage) -> Self {
        let payments: Arc<dyn PaymentGateway> = Arc::new(MockPaymentGateway::new());
        let geocoder: Arc<dyn Geocoder> = Arc::new(MockGeocoder::new(config.geocoder_origin));
        Self::with_adapters(config, storage, payments, geocoder)
    }

    pub fn with_adapters(
        config: Config,
        storage: Storage,
        payments: Arc<dyn PaymentGateway>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let workflow = OrderWorkflow::new(
            storage.orders.clone(),
            storage.users.clone(),
            payments,
            geocoder,
        );
        let documents = LocalDocumentStore::new(&config.upload_dir, &config.public_base_url);

        Self {
            jwt_service: Arc::new(JwtService::with_config(config.jwt.clone())),
            workflow: Arc::new(workflow),
            documents: Arc::new(documents),
            config: Arc::new(config),
            storage,
        }
    }

    pub fn get_jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Create the configured admin account if it does not exist yet
    pub async fn bootstrap_admin(&self) -> Result<()> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password)
        else {
            return Ok(());
        };

        if self.storage.users.find_by_email(email).await?.is_some() {
            tracing::debug!(email = %email, "Bootstrap admin already present");
            return Ok(());
        }

        let password_hash = hash_password(password)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("hashing bootstrap admin password")?;

        let admin = User {
            id: new_id(),
            name: "Administrator".to_string(),
            email: email.trim().to_lowercase(),
            phone: None,
            role: Role::Admin,
            verification_status: VerificationStatus::Approved,
            is_active: true,
            password_hash,
            created_at: now_millis(),
        };
        self.storage.users.insert(&admin).await?;

        tracing::info!(user_id = %admin.id, email = %admin.email, "Bootstrap admin created");
        Ok(())
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("storage", &self.storage)
            .field("jwt_service", &self.jwt_service)
            .finish_non_exhaustive()
    }
}
