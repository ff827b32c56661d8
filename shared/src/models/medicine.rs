//! Medicine Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalogue entry managed by pharmacists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: i32,
    pub prescription_required: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create medicine payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub prescription_required: bool,
}

/// Set stock payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUpdate {
    pub stock: i32,
}

/// Catalogue search parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicineQuery {
    pub search: Option<String>,
}
