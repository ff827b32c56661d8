//! Order workflow service
//!
//! Every transition runs the same pipeline:
//!
//! 1. role guard ([`require_role`])
//! 2. account clearance (active; operators also verification-approved)
//! 3. input validation
//! 4. load the order (`OrderNotFound`)
//! 5. visibility for the caller (`NotOrderParticipant`)
//! 6. state machine ([`next_status`], `OrderInvalidTransition`)
//! 7. participant rule of the action
//! 8. conditional write keyed on the status read in step 4
//!    (`OrderStatusConflict` when another writer got there first)

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Role, User};
use shared::order::{
    Order, OrderAction, OrderListParams, OrderStatus, PaymentMethod, PlaceOrderRequest,
    StatusChange, StatusHistoryEntry, next_status, normalize_otp,
};
use shared::util::{new_id, now_millis};

use crate::auth::{CurrentUser, require_clearance, require_role};
use crate::db::{OrderQuery, OrderRepository, OrderScope, StorageError, UserRepository};
use crate::security_log;
use crate::services::{Geocoder, PaymentGateway, PaymentRequest};
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_ORDER_ITEMS, MAX_SHORT_TEXT_LEN, MAX_URL_LEN,
    non_blank, validate_money, validate_required_text,
};

pub struct OrderWorkflow {
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentGateway>,
    geocoder: Arc<dyn Geocoder>,
}

impl OrderWorkflow {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<dyn PaymentGateway>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            orders,
            users,
            payments,
            geocoder,
        }
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Place an order for the calling customer.
    ///
    /// With an idempotency key, a repeated call returns the order created
    /// by the first one without charging again.
    pub async fn place(
        &self,
        actor: &CurrentUser,
        req: PlaceOrderRequest,
        idempotency_key: Option<&str>,
    ) -> AppResult<Order> {
        require_role(actor, &[Role::Customer], "place order")?;
        self.clearance(actor).await?;

        let payment_method = validate_placement(&req)?;
        let idempotency_key = match non_blank(idempotency_key) {
            Some(key) if key.len() > MAX_SHORT_TEXT_LEN => {
                return Err(AppError::with_message(
                    ErrorCode::ValueOutOfRange,
                    format!("Idempotency-Key is too long (max {MAX_SHORT_TEXT_LEN} chars)"),
                ));
            }
            key => key,
        };

        if let Some(key) = &idempotency_key
            && let Some(existing) = self.orders.find_by_idempotency_key(&actor.id, key).await?
        {
            tracing::info!(order_id = %existing.id, customer_id = %actor.id, "Idempotent placement replayed");
            return Ok(existing);
        }

        let order_id = new_id();

        let payment = self
            .payments
            .charge(&PaymentRequest {
                order_id: order_id.clone(),
                amount: req.total_amount,
                method: payment_method,
            })
            .await
            .map_err(|e| {
                tracing::warn!(order_id = %order_id, error = %e, "Payment gateway error");
                AppError::with_message(ErrorCode::PaymentFailed, e.to_string())
            })?;
        if !payment.success {
            tracing::warn!(order_id = %order_id, method = %payment_method, "Payment declined");
            return Err(AppError::new(ErrorCode::PaymentFailed)
                .with_detail("paymentId", payment.payment_id));
        }

        let delivery_address = req.delivery_address.trim().to_string();
        let delivery_coordinates = match self.geocoder.geocode(&delivery_address).await {
            Ok(point) => Some(point),
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Geocoding failed, storing order without coordinates");
                None
            }
        };

        let now = now_millis();
        let order = Order {
            id: order_id,
            customer_id: actor.id.clone(),
            pharmacist_id: None,
            delivery_boy_id: None,
            items: req.items,
            status: OrderStatus::Placed,
            status_history: vec![StatusHistoryEntry::new(OrderStatus::Placed, &actor.id, now)],
            payment_method,
            payment_id: payment.payment_id,
            payment_status: payment.status,
            delivery_address,
            delivery_coordinates,
            prescription_urls: req.prescription_urls,
            total_amount: req.total_amount,
            rejection_reason: None,
            delivered_at: None,
            idempotency_key,
            created_at: now,
            updated_at: now,
        };

        match self.orders.insert(&order).await {
            Ok(()) => {}
            // Lost a race against a concurrent retry with the same key
            Err(StorageError::Duplicate(_)) if order.idempotency_key.is_some() => {
                let key = order.idempotency_key.as_deref().unwrap_or_default();
                return self
                    .orders
                    .find_by_idempotency_key(&actor.id, key)
                    .await?
                    .ok_or_else(|| AppError::internal("idempotent order vanished after conflict"));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            total = %order.total_amount,
            payment_method = %order.payment_method,
            items = order.items.len(),
            "Order placed"
        );
        Ok(order)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// placed -> approved; the approving pharmacist owns the order from now on
    pub async fn approve(&self, actor: &CurrentUser, order_id: &str) -> AppResult<Order> {
        self.authorize(actor, OrderAction::Approve).await?;
        let order_id = validate_order_id(order_id)?;

        let order = self.load_visible(actor, order_id).await?;
        let to = transition(&order, OrderAction::Approve)?;

        let change = StatusChange::new(order.status, StatusHistoryEntry::new(to, &actor.id, now_millis()))
            .pharmacist(&actor.id);
        self.commit(&order, change, actor).await
    }

    /// placed -> rejected; a non-blank reason is required
    pub async fn reject(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        reason: Option<&str>,
    ) -> AppResult<Order> {
        self.authorize(actor, OrderAction::Reject).await?;
        let order_id = validate_order_id(order_id)?;
        let reason = non_blank(reason).ok_or_else(|| AppError::new(ErrorCode::RejectionReasonRequired))?;
        validate_required_text(&reason, "rejectionReason", MAX_NOTE_LEN)?;

        let order = self.load_visible(actor, order_id).await?;
        let to = transition(&order, OrderAction::Reject)?;

        let entry = StatusHistoryEntry::new(to, &actor.id, now_millis()).with_note(&reason);
        let change = StatusChange::new(order.status, entry).rejection_reason(reason);
        self.commit(&order, change, actor).await
    }

    /// approved -> packed, by the pharmacist who approved
    pub async fn pack(&self, actor: &CurrentUser, order_id: &str) -> AppResult<Order> {
        self.authorize(actor, OrderAction::Pack).await?;
        let order_id = validate_order_id(order_id)?;

        let order = self.load_visible(actor, order_id).await?;
        let to = transition(&order, OrderAction::Pack)?;
        ensure_participant(actor, &order, OrderAction::Pack)?;

        let change = StatusChange::new(order.status, StatusHistoryEntry::new(to, &actor.id, now_millis()));
        self.commit(&order, change, actor).await
    }

    /// packed -> out_for_delivery, handing the order to a delivery partner
    pub async fn assign_delivery(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        delivery_boy_id: &str,
    ) -> AppResult<Order> {
        self.authorize(actor, OrderAction::AssignDelivery).await?;
        let order_id = validate_order_id(order_id)?;
        let delivery_boy_id = delivery_boy_id.trim();
        validate_required_text(delivery_boy_id, "deliveryBoyId", MAX_SHORT_TEXT_LEN)?;

        let order = self.load_visible(actor, order_id).await?;
        let to = transition(&order, OrderAction::AssignDelivery)?;
        ensure_participant(actor, &order, OrderAction::AssignDelivery)?;

        let courier = self
            .users
            .find_by_id(delivery_boy_id)
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::UserNotFound).with_detail("userId", delivery_boy_id)
            })?;
        if courier.role != Role::Delivery {
            return Err(AppError::validation("Assignee is not a delivery partner")
                .with_detail("userId", delivery_boy_id)
                .with_detail("role", courier.role.as_str()));
        }
        if !courier.is_cleared() {
            return Err(AppError::validation("Delivery partner is not active and approved")
                .with_detail("userId", delivery_boy_id));
        }

        let change = StatusChange::new(order.status, StatusHistoryEntry::new(to, &actor.id, now_millis()))
            .delivery_boy(delivery_boy_id);
        self.commit(&order, change, actor).await
    }

    /// out_for_delivery -> delivered. The OTP is recorded, not verified.
    pub async fn confirm_delivery(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        otp: &str,
    ) -> AppResult<Order> {
        self.authorize(actor, OrderAction::ConfirmDelivery).await?;
        let order_id = validate_order_id(order_id)?;
        let otp = normalize_otp(otp)
            .map_err(|digits| AppError::new(ErrorCode::InvalidOtp).with_detail("digits", digits))?;

        let order = self.load_visible(actor, order_id).await?;
        let to = transition(&order, OrderAction::ConfirmDelivery)?;
        ensure_participant(actor, &order, OrderAction::ConfirmDelivery)?;

        let now = now_millis();
        let entry = StatusHistoryEntry::new(to, &actor.id, now).with_otp(otp);
        let change = StatusChange::new(order.status, entry).delivered_at(now);
        self.commit(&order, change, actor).await
    }

    /// placed | approved -> cancelled, by the owning customer or an admin
    pub async fn cancel(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        reason: Option<&str>,
    ) -> AppResult<Order> {
        self.authorize(actor, OrderAction::Cancel).await?;
        let order_id = validate_order_id(order_id)?;
        let reason = non_blank(reason);
        if let Some(reason) = &reason {
            validate_required_text(reason, "reason", MAX_NOTE_LEN)?;
        }

        let order = self.load_visible(actor, order_id).await?;
        let to = transition(&order, OrderAction::Cancel)?;
        ensure_participant(actor, &order, OrderAction::Cancel)?;

        let mut entry = StatusHistoryEntry::new(to, &actor.id, now_millis());
        if let Some(reason) = reason {
            entry = entry.with_note(reason);
        }
        self.commit(&order, StatusChange::new(order.status, entry), actor).await
    }

    /// delivered -> returned, by the owning customer with a reason
    pub async fn return_order(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        reason: Option<&str>,
    ) -> AppResult<Order> {
        self.authorize(actor, OrderAction::Return).await?;
        let order_id = validate_order_id(order_id)?;
        let reason = non_blank(reason).ok_or_else(|| AppError::required("reason"))?;
        validate_required_text(&reason, "reason", MAX_NOTE_LEN)?;

        let order = self.load_visible(actor, order_id).await?;
        let to = transition(&order, OrderAction::Return)?;
        ensure_participant(actor, &order, OrderAction::Return)?;

        let entry = StatusHistoryEntry::new(to, &actor.id, now_millis()).with_note(reason);
        self.commit(&order, StatusChange::new(order.status, entry), actor).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Orders visible to the caller, newest first
    pub async fn list(&self, actor: &CurrentUser, params: &OrderListParams) -> AppResult<Vec<Order>> {
        self.clearance(actor).await?;
        let query = OrderQuery::new(OrderScope::for_user(actor))
            .status(params.status)
            .page(params.limit, params.offset);
        Ok(self.orders.list(&query).await?)
    }

    /// One order. `OrderNotFound` when absent, `NotOrderParticipant` when
    /// the caller may not see it.
    pub async fn get(&self, actor: &CurrentUser, order_id: &str) -> AppResult<Order> {
        self.clearance(actor).await?;
        let order_id = validate_order_id(order_id)?;
        self.load_visible(actor, order_id).await
    }

    // ========================================================================
    // Pipeline steps
    // ========================================================================

    async fn authorize(&self, actor: &CurrentUser, action: OrderAction) -> AppResult<User> {
        require_role(actor, action.permitted_roles(), action.as_str())?;
        self.clearance(actor).await
    }

    async fn clearance(&self, actor: &CurrentUser) -> AppResult<User> {
        require_clearance(self.users.as_ref(), actor).await
    }

    async fn load_visible(&self, actor: &CurrentUser, order_id: &str) -> AppResult<Order> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound).with_detail("orderId", order_id))?;

        if !OrderScope::for_user(actor).permits(&order) {
            security_log!(
                "WARN",
                "order_access_denied",
                user_id = actor.id.clone(),
                user_role = actor.role.as_str(),
                order_id = order_id
            );
            return Err(AppError::new(ErrorCode::NotOrderParticipant).with_detail("orderId", order_id));
        }
        Ok(order)
    }

    async fn commit(&self, order: &Order, change: StatusChange, actor: &CurrentUser) -> AppResult<Order> {
        let from = change.expected;
        let to = change.entry.status;

        match self.orders.apply_status_change(&order.id, &change).await? {
            Some(updated) => {
                tracing::info!(
                    order_id = %updated.id,
                    from = %from,
                    to = %to,
                    actor_id = %actor.id,
                    "Order status changed"
                );
                Ok(updated)
            }
            None => match self.orders.find_by_id(&order.id).await? {
                Some(current) => {
                    tracing::warn!(
                        order_id = %order.id,
                        expected = %from,
                        actual = %current.status,
                        actor_id = %actor.id,
                        "Concurrent status change"
                    );
                    Err(AppError::conflict(format!(
                        "Order moved to {} while the request was processed",
                        current.status
                    ))
                    .with_detail("expected", from.as_str())
                    .with_detail("actual", current.status.as_str()))
                }
                None => Err(AppError::new(ErrorCode::OrderNotFound).with_detail("orderId", order.id.as_str())),
            },
        }
    }
}

// ============================================================================
// Pure checks
// ============================================================================

fn validate_order_id(order_id: &str) -> AppResult<&str> {
    let order_id = order_id.trim();
    validate_required_text(order_id, "orderId", MAX_SHORT_TEXT_LEN)?;
    Ok(order_id)
}

fn transition(order: &Order, action: OrderAction) -> AppResult<OrderStatus> {
    next_status(order.status, action).map_err(|e| {
        security_log!(
            "INFO",
            "transition_rejected",
            order_id = order.id.clone(),
            status = e.status.as_str(),
            action = e.action.as_str()
        );
        AppError::with_message(ErrorCode::OrderInvalidTransition, e.to_string())
            .with_detail("status", e.status.as_str())
            .with_detail("action", e.action.as_str())
    })
}

/// Who may perform `action` on this particular order
fn ensure_participant(actor: &CurrentUser, order: &Order, action: OrderAction) -> AppResult<()> {
    let allowed = match action {
        OrderAction::Approve | OrderAction::Reject => true,
        OrderAction::Pack | OrderAction::AssignDelivery => {
            order.pharmacist_id.as_deref() == Some(actor.id.as_str())
        }
        OrderAction::ConfirmDelivery => order.delivery_boy_id.as_deref() == Some(actor.id.as_str()),
        OrderAction::Cancel => actor.is_admin() || order.customer_id == actor.id,
        OrderAction::Return => order.customer_id == actor.id,
    };
    if allowed {
        return Ok(());
    }

    security_log!(
        "WARN",
        "not_order_participant",
        user_id = actor.id.clone(),
        order_id = order.id.clone(),
        action = action.as_str()
    );
    Err(AppError::new(ErrorCode::NotOrderParticipant)
        .with_detail("orderId", order.id.as_str())
        .with_detail("action", action.as_str()))
}

/// Placement payload checks; returns the parsed payment method
fn validate_placement(req: &PlaceOrderRequest) -> AppResult<PaymentMethod> {
    if req.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    if req.items.len() > MAX_ORDER_ITEMS {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("An order holds at most {MAX_ORDER_ITEMS} items"),
        ));
    }

    for (index, item) in req.items.iter().enumerate() {
        validate_required_text(&item.medicine_id, "medicineId", MAX_SHORT_TEXT_LEN)
            .map_err(|e| e.with_detail("item", index))?;
        validate_required_text(&item.name, "name", MAX_NAME_LEN)
            .map_err(|e| e.with_detail("item", index))?;
        if item.quantity < 1 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "quantity must be at least 1",
            )
            .with_detail("item", index));
        }
        validate_money(item.price, "price").map_err(|e| e.with_detail("item", index))?;
    }

    validate_required_text(&req.delivery_address, "deliveryAddress", MAX_ADDRESS_LEN)?;
    validate_money(req.total_amount, "totalAmount")?;

    let method = req.payment_method.parse::<PaymentMethod>().map_err(|e| {
        AppError::with_message(ErrorCode::PaymentInvalidMethod, e)
            .with_detail("paymentMethod", req.payment_method.as_str())
    })?;

    for url in &req.prescription_urls {
        validate_required_text(url, "prescriptionUrls", MAX_URL_LEN)?;
    }
    if req.requires_prescription() && req.prescription_urls.is_empty() {
        return Err(AppError::new(ErrorCode::PrescriptionRequired));
    }

    Ok(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryOrderRepository, MemoryUserRepository};
    use rust_decimal::Decimal;
    use crate::services::{MockGeocoder, MockPaymentGateway};
    use shared::models::VerificationStatus;
    use shared::order::{Coordinates, OrderItem, PaymentStatus};

    struct Fixture {
        workflow: OrderWorkflow,
        orders: Arc<MemoryOrderRepository>,
        users: Arc<MemoryUserRepository>,
        payments: Arc<MockPaymentGateway>,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(MemoryOrderRepository::new());
        let users = Arc::new(MemoryUserRepository::new());
        let payments = Arc::new(MockPaymentGateway::new());
        let geocoder = Arc::new(MockGeocoder::new(Coordinates { lat: 0.0, lng: 0.0 }));
        Fixture {
            workflow: OrderWorkflow::new(orders.clone(), users.clone(), payments.clone(), geocoder),
            orders,
            users,
            payments,
        }
    }

    async fn add_user(f: &Fixture, id: &str, role: Role, verification: VerificationStatus) -> CurrentUser {
        let user = User {
            id: id.into(),
            name: id.into(),
            email: format!("{id}@example.com"),
            phone: None,
            role,
            verification_status: verification,
            is_active: true,
            password_hash: "x".into(),
            created_at: 0,
        };
        f.users.insert(&user).await.unwrap();
        CurrentUser {
            id: id.into(),
            email: user.email,
            role,
        }
    }

    async fn cast(f: &Fixture) -> (CurrentUser, CurrentUser, CurrentUser) {
        let customer = add_user(f, "c1", Role::Customer, VerificationStatus::Approved).await;
        let pharmacist = add_user(f, "p1", Role::Pharmacist, VerificationStatus::Approved).await;
        let courier = add_user(f, "d1", Role::Delivery, VerificationStatus::Approved).await;
        (customer, pharmacist, courier)
    }

    fn paracetamol_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            items: vec![OrderItem {
                medicine_id: "M1".into(),
                name: "Paracetamol".into(),
                quantity: 2,
                price: Decimal::from(10),
                prescription_required: false,
            }],
            delivery_address: "12 Baker Street".into(),
            payment_method: "cod".into(),
            prescription_urls: vec![],
            total_amount: Decimal::from(20),
        }
    }

    #[tokio::test]
    async fn test_place_cod_order() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;

        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.payment_status, PaymentStatus::PendingCod);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.status_history[0].status, OrderStatus::Placed);
        assert_eq!(order.status_history[0].actor_id, "c1");
        assert!(order.delivery_coordinates.is_some());
        assert!(order.pharmacist_id.is_none());
    }

    #[tokio::test]
    async fn test_place_requires_customer() {
        let f = fixture();
        let (_, pharmacist, _) = cast(&f).await;
        let err = f.workflow.place(&pharmacist, paracetamol_request(), None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RoleRequired);
    }

    #[tokio::test]
    async fn test_place_validation() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;

        let mut req = paracetamol_request();
        req.items.clear();
        let err = f.workflow.place(&customer, req, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);

        let mut req = paracetamol_request();
        req.payment_method = "bitcoin".into();
        let err = f.workflow.place(&customer, req, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentInvalidMethod);

        let mut req = paracetamol_request();
        req.items[0].prescription_required = true;
        let err = f.workflow.place(&customer, req, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PrescriptionRequired);

        let mut req = paracetamol_request();
        req.items[0].quantity = 0;
        let err = f.workflow.place(&customer, req, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    }

    #[tokio::test]
    async fn test_place_rejects_unstorable_amounts() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;

        let mut req = paracetamol_request();
        req.total_amount = Decimal::new(20_005, 3);
        let err = f.workflow.place(&customer, req, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);

        let mut req = paracetamol_request();
        req.items[0].price = Decimal::from(10_000_000_000i64);
        let err = f.workflow.place(&customer, req, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
        assert!(err.details.unwrap().contains_key("item"));

        // trailing zeros are fine
        let mut req = paracetamol_request();
        req.total_amount = Decimal::new(20_000, 3);
        assert!(f.workflow.place(&customer, req, None).await.is_ok());

        let all = f.workflow.list(&customer, &OrderListParams::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_place_payment_declined() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;
        f.payments.set_decline_online(true).await;

        let mut req = paracetamol_request();
        req.payment_method = "card".into();
        let err = f.workflow.place(&customer, req, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentFailed);

        // COD is unaffected
        assert!(f.workflow.place(&customer, paracetamol_request(), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_place_idempotent_with_key() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;

        let first = f.workflow.place(&customer, paracetamol_request(), Some("retry-1")).await.unwrap();
        let second = f.workflow.place(&customer, paracetamol_request(), Some("retry-1")).await.unwrap();
        assert_eq!(first.id, second.id);

        let third = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        assert_ne!(first.id, third.id);

        let all = f.workflow.list(&customer, &OrderListParams::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_full_delivery_path() {
        let f = fixture();
        let (customer, pharmacist, courier) = cast(&f).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();

        let approved = f.workflow.approve(&pharmacist, &order.id).await.unwrap();
        assert_eq!(approved.status, OrderStatus::Approved);
        assert_eq!(approved.pharmacist_id.as_deref(), Some("p1"));
        assert_eq!(approved.status_history.len(), 2);

        let packed = f.workflow.pack(&pharmacist, &order.id).await.unwrap();
        assert_eq!(packed.status, OrderStatus::Packed);

        let dispatched = f.workflow.assign_delivery(&pharmacist, &order.id, "d1").await.unwrap();
        assert_eq!(dispatched.status, OrderStatus::OutForDelivery);
        assert_eq!(dispatched.delivery_boy_id.as_deref(), Some("d1"));

        let err = f.workflow.confirm_delivery(&courier, &order.id, "12").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOtp);

        let delivered = f.workflow.confirm_delivery(&courier, &order.id, "4821").await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
        assert_eq!(delivered.status_history.last().unwrap().otp.as_deref(), Some("4821"));
        assert_eq!(delivered.status_history.len(), 5);
        assert!(delivered.history_consistent());
        assert_eq!(delivered.total_amount, order.total_amount);
        assert_eq!(delivered.items, order.items);

        let returned = f.workflow.return_order(&customer, &order.id, Some("wrong strength")).await.unwrap();
        assert_eq!(returned.status, OrderStatus::Returned);
    }

    #[tokio::test]
    async fn test_reject_requires_reason_and_leaves_pharmacist_unset() {
        let f = fixture();
        let (customer, pharmacist, _) = cast(&f).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();

        let err = f.workflow.reject(&pharmacist, &order.id, Some("  ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RejectionReasonRequired);
        let unchanged = f.orders.find_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(unchanged, order);

        let rejected = f.workflow.reject(&pharmacist, &order.id, Some("out of stock")).await.unwrap();
        assert_eq!(rejected.status, OrderStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("out of stock"));
        assert!(rejected.pharmacist_id.is_none());
    }

    #[tokio::test]
    async fn test_pack_before_approval_is_invalid_transition() {
        let f = fixture();
        let (customer, pharmacist, _) = cast(&f).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();

        let err = f.workflow.pack(&pharmacist, &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition);
        assert_eq!(err.details.as_ref().unwrap()["status"], "placed");
    }

    #[tokio::test]
    async fn test_customer_cannot_approve() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        let err = f.workflow.approve(&customer, &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RoleRequired);
    }

    #[tokio::test]
    async fn test_unverified_pharmacist_blocked() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;
        let pending = add_user(&f, "p2", Role::Pharmacist, VerificationStatus::Pending).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();

        let err = f.workflow.approve(&pending, &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountNotVerified);
    }

    #[tokio::test]
    async fn test_other_pharmacist_cannot_pack() {
        let f = fixture();
        let (customer, pharmacist, _) = cast(&f).await;
        let other = add_user(&f, "p2", Role::Pharmacist, VerificationStatus::Approved).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        f.workflow.approve(&pharmacist, &order.id).await.unwrap();

        let err = f.workflow.pack(&other, &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOrderParticipant);
    }

    #[tokio::test]
    async fn test_assign_requires_cleared_delivery_partner() {
        let f = fixture();
        let (customer, pharmacist, _) = cast(&f).await;
        add_user(&f, "d2", Role::Delivery, VerificationStatus::Pending).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        f.workflow.approve(&pharmacist, &order.id).await.unwrap();
        f.workflow.pack(&pharmacist, &order.id).await.unwrap();

        let err = f.workflow.assign_delivery(&pharmacist, &order.id, "nobody").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UserNotFound);
        let err = f.workflow.assign_delivery(&pharmacist, &order.id, "c1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let err = f.workflow.assign_delivery(&pharmacist, &order.id, "d2").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let f = fixture();
        let (customer, pharmacist, _) = cast(&f).await;
        let admin = add_user(&f, "a1", Role::Admin, VerificationStatus::Approved).await;
        let other = add_user(&f, "c2", Role::Customer, VerificationStatus::Approved).await;

        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        let err = f.workflow.cancel(&other, &order.id, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOrderParticipant);

        let cancelled = f.workflow.cancel(&customer, &order.id, Some("changed my mind")).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            cancelled.status_history.last().unwrap().note.as_deref(),
            Some("changed my mind")
        );

        let second = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        f.workflow.approve(&pharmacist, &second.id).await.unwrap();
        let cancelled = f.workflow.cancel(&admin, &second.id, None).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let err = f.workflow.cancel(&admin, &second.id, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition);
    }

    #[tokio::test]
    async fn test_return_requires_reason() {
        let f = fixture();
        let (customer, _, _) = cast(&f).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        let err = f.workflow.return_order(&customer, &order.id, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
    }

    #[tokio::test]
    async fn test_stale_write_is_conflict() {
        let f = fixture();
        let (customer, pharmacist, _) = cast(&f).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();

        // Another writer moves the order between our read and our write
        f.workflow.reject(&pharmacist, &order.id, Some("duplicate")).await.unwrap();
        let change = StatusChange::new(
            OrderStatus::Placed,
            StatusHistoryEntry::new(OrderStatus::Approved, "p1", now_millis()),
        )
        .pharmacist("p1");
        let err = f.workflow.commit(&order, change, &pharmacist).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderStatusConflict);

        let stored = f.orders.find_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Rejected);
        assert_eq!(stored.status_history.len(), 2);
    }

    #[tokio::test]
    async fn test_visibility() {
        let f = fixture();
        let (customer, pharmacist, courier) = cast(&f).await;
        let other = add_user(&f, "c2", Role::Customer, VerificationStatus::Approved).await;
        let order = f.workflow.place(&customer, paracetamol_request(), None).await.unwrap();
        f.workflow.place(&other, paracetamol_request(), None).await.unwrap();

        let mine = f.workflow.list(&customer, &OrderListParams::default()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(mine.iter().all(|o| o.customer_id == "c1"));

        // Unassigned placed orders form the pharmacist queue
        let queue = f.workflow.list(&pharmacist, &OrderListParams::default()).await.unwrap();
        assert_eq!(queue.len(), 2);

        assert!(f.workflow.list(&courier, &OrderListParams::default()).await.unwrap().is_empty());

        let err = f.workflow.get(&other, &order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotOrderParticipant);
        let err = f.workflow.get(&customer, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }
}
