//! Payment gateway port and the mock gateway used in every environment

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::order::{PaymentMethod, PaymentStatus};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentResult {
    pub success: bool,
    pub payment_id: String,
    pub status: PaymentStatus,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge (or register, for cash on delivery) the order total
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentResult, PaymentError>;
}

/// Canned gateway: cash on delivery is recorded as `pending_cod`, every
/// other method settles immediately as `paid`.
#[derive(Default)]
pub struct MockPaymentGateway {
    decline_online: RwLock<bool>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make non-COD charges report `success = false`
    pub async fn set_decline_online(&self, decline: bool) {
        *self.decline_online.write().await = decline;
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, request: &PaymentRequest) -> Result<PaymentResult, PaymentError> {
        if request.method == PaymentMethod::Cod {
            return Ok(PaymentResult {
                success: true,
                payment_id: format!("cod_{}", request.order_id),
                status: PaymentStatus::PendingCod,
            });
        }

        let declined = *self.decline_online.read().await;
        tracing::debug!(
            order_id = %request.order_id,
            amount = %request.amount,
            method = %request.method,
            declined,
            "Mock payment charge"
        );

        Ok(PaymentResult {
            success: !declined,
            payment_id: format!("pay_{}", uuid::Uuid::new_v4().simple()),
            status: if declined {
                PaymentStatus::Pending
            } else {
                PaymentStatus::Paid
            },
        })
    }
}
