use async_trait::async_trait;
use shared::models::Medicine;
use sqlx::PgPool;

use crate::db::{MedicineRepository, StorageError};

#[derive(Clone)]
pub struct PgMedicineRepository {
    pool: PgPool,
}

impl PgMedicineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MedicineRepository for PgMedicineRepository {
    async fn insert(&self, medicine: &Medicine) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO medicines (id, name, description, price, stock, prescription_required, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.description)
        .bind(medicine.price)
        .bind(medicine.stock)
        .bind(medicine.prescription_required)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Medicine>, StorageError> {
        Ok(sqlx::query_as("SELECT * FROM medicines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn search(&self, search: Option<&str>) -> Result<Vec<Medicine>, StorageError> {
        let pattern = search.map(|s| format!("%{}%", escape_like(s)));
        Ok(sqlx::query_as(
            "SELECT * FROM medicines
             WHERE ($1::text IS NULL OR name ILIKE $1)
             ORDER BY name",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_stock(
        &self,
        id: &str,
        stock: i32,
        updated_at: i64,
    ) -> Result<Option<Medicine>, StorageError> {
        Ok(sqlx::query_as(
            "UPDATE medicines SET stock = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(stock)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?)
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("para"), "para");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
