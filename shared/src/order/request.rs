//! Order API payloads

use super::{Order, OrderItem, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// POST /orders/place
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItem>,
    pub delivery_address: String,
    /// Parsed server-side so unknown methods map to a payment error
    pub payment_method: String,
    #[serde(default)]
    pub prescription_urls: Vec<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl PlaceOrderRequest {
    pub fn requires_prescription(&self) -> bool {
        self.items.iter().any(|item| item.prescription_required)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: String,
    pub order: Order,
}

/// POST /orders/approve
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveOrderRequest {
    pub order_id: String,
    pub approved: bool,
    pub rejection_reason: Option<String>,
}

/// POST /orders/pack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdRequest {
    pub order_id: String,
}

/// POST /orders/assign-delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDeliveryRequest {
    pub order_id: String,
    pub delivery_boy_id: String,
}

/// POST /orders/confirm-delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDeliveryRequest {
    pub order_id: String,
    pub otp: String,
}

/// POST /orders/cancel and /orders/return
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReasonRequest {
    pub order_id: String,
    pub reason: Option<String>,
}

/// Transition result
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// GET /orders query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
