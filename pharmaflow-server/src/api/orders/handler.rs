//! Order API Handlers
//!
//! Thin adapters: decode the payload, hand the caller and the payload to
//! [`OrderWorkflow`](crate::orders::OrderWorkflow), shape the response.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use shared::order::{
    ApproveOrderRequest, AssignDeliveryRequest, ConfirmDeliveryRequest, Order, OrderIdRequest,
    OrderListParams, OrderReasonRequest, PlaceOrderRequest, PlaceOrderResponse, SuccessResponse,
};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::{AppError, AppResult};

/// Header carrying the client's placement retry key
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// POST /orders/place
pub async fn place(
    State(state): State<ServerState>,
    user: CurrentUser,
    headers: HeaderMap,
    ApiJson(req): ApiJson<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<PlaceOrderResponse>)> {
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|v| {
            v.to_str()
                .map_err(|_| AppError::validation("Idempotency-Key must be visible ASCII"))
        })
        .transpose()?;

    let order = state.workflow.place(&user, req, key).await?;
    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            order_id: order.id.clone(),
            order,
        }),
    ))
}

/// POST /orders/approve
///
/// `approved: false` rejects the order and requires `rejectionReason`.
pub async fn approve(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<ApproveOrderRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if req.approved {
        state.workflow.approve(&user, &req.order_id).await?;
    } else {
        state
            .workflow
            .reject(&user, &req.order_id, req.rejection_reason.as_deref())
            .await?;
    }
    Ok(Json(SuccessResponse::ok()))
}

/// POST /orders/pack
pub async fn pack(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<OrderIdRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state.workflow.pack(&user, &req.order_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /orders/assign-delivery
pub async fn assign_delivery(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<AssignDeliveryRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .workflow
        .assign_delivery(&user, &req.order_id, &req.delivery_boy_id)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /orders/confirm-delivery
pub async fn confirm_delivery(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<ConfirmDeliveryRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .workflow
        .confirm_delivery(&user, &req.order_id, &req.otp)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /orders/cancel
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<OrderReasonRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .workflow
        .cancel(&user, &req.order_id, req.reason.as_deref())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /orders/return
pub async fn return_order(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<OrderReasonRequest>,
) -> AppResult<Json<SuccessResponse>> {
    state
        .workflow
        .return_order(&user, &req.order_id, req.reason.as_deref())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /orders
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiQuery(params): ApiQuery<OrderListParams>,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.workflow.list(&user, &params).await?))
}

/// GET /orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.workflow.get(&user, &id).await?))
}
