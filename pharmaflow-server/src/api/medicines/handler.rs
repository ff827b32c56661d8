//! Medicine API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use shared::models::{Medicine, MedicineCreate, MedicineQuery, Role, StockUpdate};
use shared::util::{new_id, now_millis};

use crate::api::extract::{ApiJson, ApiQuery};
use crate::auth::{CurrentUser, require_clearance, require_role};
use crate::core::ServerState;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, non_blank, validate_money, validate_optional_text,
    validate_required_text,
};
use crate::{AppError, AppResult, ErrorCode};

const CATALOGUE_ROLES: &[Role] = &[Role::Pharmacist, Role::Admin];

/// GET /medicines?search=
pub async fn search(
    State(state): State<ServerState>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<MedicineQuery>,
) -> AppResult<Json<Vec<Medicine>>> {
    let search = non_blank(query.search.as_deref());
    if let Some(search) = &search {
        validate_required_text(search, "search", MAX_SHORT_TEXT_LEN)?;
    }
    Ok(Json(state.storage.medicines.search(search.as_deref()).await?))
}

/// GET /medicines/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Medicine>> {
    let medicine = state
        .storage
        .medicines
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MedicineNotFound).with_detail("medicineId", id))?;
    Ok(Json(medicine))
}

/// POST /medicines
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<MedicineCreate>,
) -> AppResult<(StatusCode, Json<Medicine>)> {
    require_role(&user, CATALOGUE_ROLES, "create medicine")?;
    require_clearance(state.storage.users.as_ref(), &user).await?;

    let name = req.name.trim();
    validate_required_text(name, "name", MAX_NAME_LEN)?;
    let description = non_blank(req.description.as_deref());
    validate_optional_text(&description, "description", MAX_NOTE_LEN)?;
    if req.price < Decimal::ZERO {
        return Err(AppError::new(ErrorCode::MedicineInvalidPrice).with_detail("price", req.price.to_string()));
    }
    validate_money(req.price, "price")?;
    validate_stock(req.stock)?;

    let now = now_millis();
    let medicine = Medicine {
        id: new_id(),
        name: name.to_string(),
        description,
        price: req.price,
        stock: req.stock,
        prescription_required: req.prescription_required,
        created_at: now,
        updated_at: now,
    };
    state.storage.medicines.insert(&medicine).await?;

    tracing::info!(
        medicine_id = %medicine.id,
        name = %medicine.name,
        actor_id = %user.id,
        "Medicine created"
    );
    Ok((StatusCode::CREATED, Json(medicine)))
}

/// POST /medicines/{id}/stock
pub async fn set_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StockUpdate>,
) -> AppResult<Json<Medicine>> {
    require_role(&user, CATALOGUE_ROLES, "update stock")?;
    require_clearance(state.storage.users.as_ref(), &user).await?;
    validate_stock(req.stock)?;

    let medicine = state
        .storage
        .medicines
        .set_stock(&id, req.stock, now_millis())
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MedicineNotFound).with_detail("medicineId", id))?;

    tracing::info!(
        medicine_id = %medicine.id,
        stock = medicine.stock,
        actor_id = %user.id,
        "Medicine stock updated"
    );
    Ok(Json(medicine))
}

fn validate_stock(stock: i32) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::with_message(ErrorCode::ValueOutOfRange, "stock must not be negative")
            .with_detail("field", "stock"));
    }
    Ok(())
}
