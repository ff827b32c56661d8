//! Order record and its status history

use super::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Payment
// ============================================================================

/// Payment method selected at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    Card,
    Upi,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Card => "card",
            Self::Upi => "upi",
            Self::Wallet => "wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(Self::Cod),
            "card" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            "wallet" => Ok(Self::Wallet),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Payment state recorded at placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Cash will be collected on delivery
    PendingCod,
    Paid,
    /// Accepted by the gateway, settlement not confirmed yet
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingCod => "pending_cod",
            Self::Paid => "paid",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_cod" => Ok(Self::PendingCod),
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

// ============================================================================
// Order
// ============================================================================

/// Approximate delivery location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Line item snapshot taken at placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub medicine_id: String,
    pub name: String,
    pub quantity: i32,
    /// Unit price
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub prescription_required: bool,
}

/// One entry of the append-only status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    /// Unix millis
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub actor_id: String,
    /// Delivery code presented at handoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl StatusHistoryEntry {
    pub fn new(status: OrderStatus, actor_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            status,
            timestamp,
            note: None,
            actor_id: actor_id.into(),
            otp: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_otp(mut self, otp: impl Into<String>) -> Self {
        self.otp = Some(otp.into());
        self
    }
}

/// Order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub pharmacist_id: Option<String>,
    pub delivery_boy_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub payment_method: PaymentMethod,
    pub payment_id: String,
    pub payment_status: PaymentStatus,
    pub delivery_address: String,
    pub delivery_coordinates: Option<Coordinates>,
    #[serde(default)]
    pub prescription_urls: Vec<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub rejection_reason: Option<String>,
    pub delivered_at: Option<i64>,
    /// Client-supplied key deduplicating placement retries
    #[serde(skip)]
    pub idempotency_key: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// True when the current status matches the last history entry
    pub fn history_consistent(&self) -> bool {
        self.status_history
            .last()
            .is_some_and(|entry| entry.status == self.status)
    }

    /// Apply a status change if the order is still in the expected status.
    ///
    /// Returns `false` and leaves the order untouched otherwise.
    pub fn apply(&mut self, change: &StatusChange) -> bool {
        if self.status != change.expected {
            return false;
        }
        if let Some(id) = &change.pharmacist_id {
            self.pharmacist_id = Some(id.clone());
        }
        if let Some(id) = &change.delivery_boy_id {
            self.delivery_boy_id = Some(id.clone());
        }
        if let Some(reason) = &change.rejection_reason {
            self.rejection_reason = Some(reason.clone());
        }
        if let Some(at) = change.delivered_at {
            self.delivered_at = Some(at);
        }
        self.status = change.entry.status;
        self.updated_at = change.entry.timestamp;
        self.status_history.push(change.entry.clone());
        true
    }
}

/// Conditional update of an order's status.
///
/// Applied atomically by the storage layer only while the stored status
/// still equals `expected`. Exactly one history entry is appended and the
/// new status is taken from it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub expected: OrderStatus,
    pub entry: StatusHistoryEntry,
    pub pharmacist_id: Option<String>,
    pub delivery_boy_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub delivered_at: Option<i64>,
}

impl StatusChange {
    pub fn new(expected: OrderStatus, entry: StatusHistoryEntry) -> Self {
        Self {
            expected,
            entry,
            pharmacist_id: None,
            delivery_boy_id: None,
            rejection_reason: None,
            delivered_at: None,
        }
    }

    pub fn pharmacist(mut self, id: impl Into<String>) -> Self {
        self.pharmacist_id = Some(id.into());
        self
    }

    pub fn delivery_boy(mut self, id: impl Into<String>) -> Self {
        self.delivery_boy_id = Some(id.into());
        self
    }

    pub fn rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }

    pub fn delivered_at(mut self, at: i64) -> Self {
        self.delivered_at = Some(at);
        self
    }
}
