use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::order::{Coordinates, Order, OrderItem, StatusChange, StatusHistoryEntry};
use sqlx::PgPool;
use sqlx::types::Json;

use super::parse_column;
use crate::db::{OrderQuery, OrderRepository, OrderScope, StorageError};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_id: String,
    pharmacist_id: Option<String>,
    delivery_boy_id: Option<String>,
    items: Json<Vec<OrderItem>>,
    status: String,
    status_history: Json<Vec<StatusHistoryEntry>>,
    payment_method: String,
    payment_id: String,
    payment_status: String,
    delivery_address: String,
    delivery_lat: Option<f64>,
    delivery_lng: Option<f64>,
    prescription_urls: Json<Vec<String>>,
    total_amount: Decimal,
    rejection_reason: Option<String>,
    delivered_at: Option<i64>,
    idempotency_key: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = StorageError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let delivery_coordinates = match (row.delivery_lat, row.delivery_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };
        Ok(Order {
            status: parse_column("status", &row.status)?,
            payment_method: parse_column("payment_method", &row.payment_method)?,
            payment_status: parse_column("payment_status", &row.payment_status)?,
            id: row.id,
            customer_id: row.customer_id,
            pharmacist_id: row.pharmacist_id,
            delivery_boy_id: row.delivery_boy_id,
            items: row.items.0,
            status_history: row.status_history.0,
            payment_id: row.payment_id,
            delivery_address: row.delivery_address,
            delivery_coordinates,
            prescription_urls: row.prescription_urls.0,
            total_amount: row.total_amount,
            rejection_reason: row.rejection_reason,
            delivered_at: row.delivered_at,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_order(row: Option<OrderRow>) -> Result<Option<Order>, StorageError> {
    row.map(Order::try_from).transpose()
}

#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO orders (
                id, customer_id, pharmacist_id, delivery_boy_id, items, status, status_history,
                payment_method, payment_id, payment_status, delivery_address, delivery_lat, delivery_lng,
                prescription_urls, total_amount, rejection_reason, delivered_at, idempotency_key,
                created_at, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(&order.pharmacist_id)
        .bind(&order.delivery_boy_id)
        .bind(Json(&order.items))
        .bind(order.status.as_str())
        .bind(Json(&order.status_history))
        .bind(order.payment_method.as_str())
        .bind(&order.payment_id)
        .bind(order.payment_status.as_str())
        .bind(&order.delivery_address)
        .bind(order.delivery_coordinates.map(|c| c.lat))
        .bind(order.delivery_coordinates.map(|c| c.lng))
        .bind(Json(&order.prescription_urls))
        .bind(order.total_amount)
        .bind(&order.rejection_reason)
        .bind(order.delivered_at)
        .bind(&order.idempotency_key)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StorageError> {
        let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        into_order(row)
    }

    async fn find_by_idempotency_key(
        &self,
        customer_id: &str,
        key: &str,
    ) -> Result<Option<Order>, StorageError> {
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT * FROM orders WHERE customer_id = $1 AND idempotency_key = $2",
        )
        .bind(customer_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        into_order(row)
    }

    async fn list(&self, query: &OrderQuery) -> Result<Vec<Order>, StorageError> {
        let (customer, pharmacist, delivery) = match &query.scope {
            OrderScope::All => (None, None, None),
            OrderScope::Customer(id) => (Some(id.as_str()), None, None),
            OrderScope::Pharmacist(id) => (None, Some(id.as_str()), None),
            OrderScope::DeliveryPartner(id) => (None, None, Some(id.as_str())),
        };

        let rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT * FROM orders
             WHERE ($1::text IS NULL OR customer_id = $1)
               AND ($2::text IS NULL OR pharmacist_id = $2
                    OR (pharmacist_id IS NULL AND status = 'placed')
                    OR (pharmacist_id IS NULL AND status = 'rejected' AND status_history -> -1 ->> 'actorId' = $2))
               AND ($3::text IS NULL OR delivery_boy_id = $3)
               AND ($4::text IS NULL OR status = $4)
             ORDER BY created_at DESC, id DESC
             LIMIT $5 OFFSET $6",
        )
        .bind(customer)
        .bind(pharmacist)
        .bind(delivery)
        .bind(query.status.map(|s| s.as_str()))
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn apply_status_change(
        &self,
        id: &str,
        change: &StatusChange,
    ) -> Result<Option<Order>, StorageError> {
        // Status guard and history append in one statement
        let row: Option<OrderRow> = sqlx::query_as(
            "UPDATE orders SET
                status = $3,
                status_history = status_history || $4::jsonb,
                pharmacist_id = COALESCE($5, pharmacist_id),
                delivery_boy_id = COALESCE($6, delivery_boy_id),
                rejection_reason = COALESCE($7, rejection_reason),
                delivered_at = COALESCE($8, delivered_at),
                updated_at = $9
             WHERE id = $1 AND status = $2
             RETURNING *",
        )
        .bind(id)
        .bind(change.expected.as_str())
        .bind(change.entry.status.as_str())
        .bind(Json(vec![&change.entry]))
        .bind(&change.pharmacist_id)
        .bind(&change.delivery_boy_id)
        .bind(&change.rejection_reason)
        .bind(change.delivered_at)
        .bind(change.entry.timestamp)
        .fetch_optional(&self.pool)
        .await?;
        into_order(row)
    }
}
