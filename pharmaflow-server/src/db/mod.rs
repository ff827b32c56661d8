//! Storage layer
//!
//! Repositories are object-safe ports held as `Arc<dyn ...>` in
//! [`ServerState`](crate::core::ServerState). Two adapters exist:
//! [`memory`] (development and tests) and [`postgres`] (`DATABASE_URL`).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{Medicine, Role, User, UserFilter, VerificationStatus};
use shared::order::{Order, OrderStatus, StatusChange};
use std::sync::Arc;
use thiserror::Error;

use crate::auth::CurrentUser;

/// Default page size for order listings
pub const DEFAULT_LIST_LIMIT: u32 = 50;
/// Upper bound for order listings
pub const MAX_LIST_LIMIT: u32 = 200;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::new(ErrorCode::NotFound),
            StorageError::Duplicate(what) => {
                AppError::with_message(ErrorCode::AlreadyExists, format!("{what} already exists"))
            }
            StorageError::Serialization(msg) | StorageError::Backend(msg) => {
                AppError::database(msg)
            }
        }
    }
}

// ============================================================================
// Order queries
// ============================================================================

/// Which orders a caller may see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Customer(String),
    /// Orders assigned to the pharmacist, the unassigned `placed` queue,
    /// and orders the pharmacist rejected
    Pharmacist(String),
    DeliveryPartner(String),
}

impl OrderScope {
    pub fn for_user(user: &CurrentUser) -> Self {
        match user.role {
            Role::Admin => Self::All,
            Role::Customer => Self::Customer(user.id.clone()),
            Role::Pharmacist => Self::Pharmacist(user.id.clone()),
            Role::Delivery => Self::DeliveryPartner(user.id.clone()),
        }
    }

    pub fn permits(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Customer(id) => &order.customer_id == id,
            Self::Pharmacist(id) => match &order.pharmacist_id {
                Some(assigned) => assigned == id,
                None => match order.status {
                    OrderStatus::Placed => true,
                    OrderStatus::Rejected => order
                        .status_history
                        .last()
                        .is_some_and(|entry| &entry.actor_id == id),
                    _ => false,
                },
            },
            Self::DeliveryPartner(id) => order.delivery_boy_id.as_ref() == Some(id),
        }
    }
}

/// Order listing query, newest first
#[derive(Debug, Clone)]
pub struct OrderQuery {
    pub scope: OrderScope,
    pub status: Option<OrderStatus>,
    pub limit: u32,
    pub offset: u32,
}

impl OrderQuery {
    pub fn new(scope: OrderScope) -> Self {
        Self {
            scope,
            status: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }

    pub fn status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    /// Page window; limit falls back to the default and is capped
    pub fn page(mut self, limit: Option<u32>, offset: Option<u32>) -> Self {
        self.limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .min(MAX_LIST_LIMIT);
        self.offset = offset.unwrap_or(0);
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.scope.permits(order) && self.status.is_none_or(|s| order.status == s)
    }
}

// ============================================================================
// Ports
// ============================================================================

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order. `Duplicate` when the id or the customer's
    /// idempotency key is already taken.
    async fn insert(&self, order: &Order) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError>;

    async fn find_by_idempotency_key(
        &self,
        customer_id: &str,
        key: &str,
    ) -> Result<Option<Order>, StorageError>;

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StorageError>;

    /// Atomically apply `change` if the stored status still equals
    /// `change.expected`. Returns the updated order, or `None` when the
    /// order is missing or its status moved on.
    async fn apply_status_change(
        &self,
        id: &str,
        change: &StatusChange,
    ) -> Result<Option<Order>, StorageError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// `Duplicate` when the email is already registered
    async fn insert(&self, user: &User) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StorageError>;

    /// Case-insensitive
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StorageError>;

    async fn set_verification(
        &self,
        id: &str,
        status: VerificationStatus,
    ) -> Result<Option<User>, StorageError>;

    async fn set_active(&self, id: &str, active: bool) -> Result<Option<User>, StorageError>;
}

#[async_trait]
pub trait MedicineRepository: Send + Sync {
    async fn insert(&self, medicine: &Medicine) -> Result<(), StorageError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Medicine>, StorageError>;

    /// Name contains `search` (case-insensitive); all when `None`. Sorted by name.
    async fn search(&self, search: Option<&str>) -> Result<Vec<Medicine>, StorageError>;

    async fn set_stock(
        &self,
        id: &str,
        stock: i32,
        updated_at: i64,
    ) -> Result<Option<Medicine>, StorageError>;
}

/// The repositories of one backend
#[derive(Clone)]
pub struct Storage {
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub medicines: Arc<dyn MedicineRepository>,
    /// `memory` or `postgres`
    pub backend: &'static str,
}

impl Storage {
    pub fn memory() -> Self {
        Self {
            orders: Arc::new(memory::MemoryOrderRepository::new()),
            users: Arc::new(memory::MemoryUserRepository::new()),
            medicines: Arc::new(memory::MemoryMedicineRepository::new()),
            backend: "memory",
        }
    }

    /// Connect, create missing tables and wrap the pool.
    pub async fn postgres(database_url: &str) -> Result<Self, StorageError> {
        let pool = postgres::connect(database_url).await?;
        postgres::ensure_schema(&pool).await?;
        Ok(Self {
            orders: Arc::new(postgres::PgOrderRepository::new(pool.clone())),
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            medicines: Arc::new(postgres::PgMedicineRepository::new(pool)),
            backend: "postgres",
        })
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("backend", &self.backend).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::order::{PaymentMethod, PaymentStatus, StatusHistoryEntry};

    fn order(status: OrderStatus, pharmacist: Option<&str>) -> Order {
        Order {
            id: "o1".into(),
            customer_id: "c1".into(),
            pharmacist_id: pharmacist.map(str::to_string),
            delivery_boy_id: None,
            items: vec![],
            status,
            status_history: vec![StatusHistoryEntry::new(status, "c1", 0)],
            payment_method: PaymentMethod::Cod,
            payment_id: "p".into(),
            payment_status: PaymentStatus::PendingCod,
            delivery_address: "addr".into(),
            delivery_coordinates: None,
            prescription_urls: vec![],
            total_amount: Decimal::ZERO,
            rejection_reason: None,
            delivered_at: None,
            idempotency_key: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_customer_scope() {
        let scope = OrderScope::Customer("c1".into());
        assert!(scope.permits(&order(OrderStatus::Placed, None)));
        assert!(!OrderScope::Customer("c2".into()).permits(&order(OrderStatus::Placed, None)));
    }

    #[test]
    fn test_pharmacist_scope_includes_unassigned_queue() {
        let scope = OrderScope::Pharmacist("p1".into());
        assert!(scope.permits(&order(OrderStatus::Placed, None)));
        assert!(scope.permits(&order(OrderStatus::Approved, Some("p1"))));
        assert!(!scope.permits(&order(OrderStatus::Approved, Some("p2"))));
        // Unassigned but not awaiting approval: not part of the queue
        assert!(!scope.permits(&order(OrderStatus::Cancelled, None)));
    }

    #[test]
    fn test_pharmacist_scope_keeps_own_rejections() {
        let mut o = order(OrderStatus::Placed, None);
        o.status = OrderStatus::Rejected;
        o.status_history
            .push(StatusHistoryEntry::new(OrderStatus::Rejected, "p1", 1));

        assert!(OrderScope::Pharmacist("p1".into()).permits(&o));
        assert!(!OrderScope::Pharmacist("p2".into()).permits(&o));
        assert!(OrderScope::Customer("c1".into()).permits(&o));
    }

    #[test]
    fn test_delivery_scope() {
        let mut o = order(OrderStatus::OutForDelivery, Some("p1"));
        let scope = OrderScope::DeliveryPartner("d1".into());
        assert!(!scope.permits(&o));
        o.delivery_boy_id = Some("d1".into());
        assert!(scope.permits(&o));
    }

    #[test]
    fn test_query_page_bounds() {
        let q = OrderQuery::new(OrderScope::All).page(None, None);
        assert_eq!(q.limit, DEFAULT_LIST_LIMIT);
        let q = OrderQuery::new(OrderScope::All).page(Some(10_000), Some(5));
        assert_eq!(q.limit, MAX_LIST_LIMIT);
        assert_eq!(q.offset, 5);
        let q = OrderQuery::new(OrderScope::All).page(Some(0), None);
        assert_eq!(q.limit, DEFAULT_LIST_LIMIT);
    }

    #[test]
    fn test_query_status_filter() {
        let q = OrderQuery::new(OrderScope::All).status(Some(OrderStatus::Approved));
        assert!(!q.matches(&order(OrderStatus::Placed, None)));
        assert!(q.matches(&order(OrderStatus::Approved, Some("p1"))));
    }

    #[test]
    fn test_storage_error_into_app_error() {
        let err: AppError = StorageError::Backend("pool timed out".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        let err: AppError = StorageError::Duplicate("email".into()).into();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
    }
}
