//! In-memory repositories
//!
//! `HashMap`s behind `tokio::sync::RwLock`. No persistence across restarts.
//! Conditional updates check and write under a single write lock.

use async_trait::async_trait;
use shared::models::{Medicine, User, UserFilter, VerificationStatus};
use shared::order::{Order, StatusChange};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{MedicineRepository, OrderQuery, OrderRepository, StorageError, UserRepository};

// ============================================================================
// Orders
// ============================================================================

#[derive(Default)]
struct OrderTable {
    rows: HashMap<String, Order>,
    /// (customer_id, idempotency key) -> order id
    idempotency: HashMap<(String, String), String>,
}

#[derive(Default, Clone)]
pub struct MemoryOrderRepository {
    table: Arc<RwLock<OrderTable>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), StorageError> {
        let mut table = self.table.write().await;
        if table.rows.contains_key(&order.id) {
            return Err(StorageError::Duplicate(format!("order {}", order.id)));
        }
        if let Some(key) = &order.idempotency_key {
            let slot = (order.customer_id.clone(), key.clone());
            if table.idempotency.contains_key(&slot) {
                return Err(StorageError::Duplicate("idempotency key".to_string()));
            }
            table.idempotency.insert(slot, order.id.clone());
        }
        table.rows.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError> {
        let table = self.table.read().await;
        Ok(table.rows.get(id).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        customer_id: &str,
        key: &str,
    ) -> Result<Option<Order>, StorageError> {
        let table = self.table.read().await;
        let slot = (customer_id.to_string(), key.to_string());
        Ok(table
            .idempotency
            .get(&slot)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StorageError> {
        let table = self.table.read().await;
        let mut orders: Vec<&Order> = table.rows.values().filter(|o| query.matches(o)).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(orders
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn apply_status_change(
        &self,
        id: &str,
        change: &StatusChange,
    ) -> Result<Option<Order>, StorageError> {
        let mut table = self.table.write().await;
        let Some(order) = table.rows.get_mut(id) else {
            return Ok(None);
        };
        if order.apply(change) {
            Ok(Some(order.clone()))
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Default, Clone)]
pub struct MemoryUserRepository {
    rows: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), StorageError> {
        let mut rows = self.rows.write().await;
        if rows
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StorageError::Duplicate("email".to_string()));
        }
        if rows.contains_key(&user.id) {
            return Err(StorageError::Duplicate(format!("user {}", user.id)));
        }
        rows.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StorageError> {
        let rows = self.rows.read().await;
        let mut users: Vec<User> = rows
            .values()
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .filter(|u| filter.verification.is_none_or(|v| u.verification_status == v))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn set_verification(
        &self,
        id: &str,
        status: VerificationStatus,
    ) -> Result<Option<User>, StorageError> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(id).map(|user| {
            user.verification_status = status;
            user.clone()
        }))
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Option<User>, StorageError> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(id).map(|user| {
            user.is_active = active;
            user.clone()
        }))
    }
}

// ============================================================================
// Medicines
// ============================================================================

#[derive(Default, Clone)]
pub struct MemoryMedicineRepository {
    rows: Arc<RwLock<HashMap<String, Medicine>>>,
}

impl MemoryMedicineRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MedicineRepository for MemoryMedicineRepository {
    async fn insert(&self, medicine: &Medicine) -> Result<(), StorageError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&medicine.id) {
            return Err(StorageError::Duplicate(format!("medicine {}", medicine.id)));
        }
        rows.insert(medicine.id.clone(), medicine.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Medicine>, StorageError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn search(&self, search: Option<&str>) -> Result<Vec<Medicine>, StorageError> {
        let needle = search.map(str::to_lowercase);
        let rows = self.rows.read().await;
        let mut found: Vec<Medicine> = rows
            .values()
            .filter(|m| {
                needle
                    .as_deref()
                    .is_none_or(|n| m.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn set_stock(
        &self,
        id: &str,
        stock: i32,
        updated_at: i64,
    ) -> Result<Option<Medicine>, StorageError> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(id).map(|m| {
            m.stock = stock;
            m.updated_at = updated_at;
            m.clone()
        }))
    }
}
