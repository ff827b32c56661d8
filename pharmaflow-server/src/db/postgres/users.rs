use async_trait::async_trait;
use shared::models::{User, UserFilter, VerificationStatus};
use sqlx::PgPool;

use super::parse_column;
use crate::db::{StorageError, UserRepository};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    role: String,
    verification_status: String,
    is_active: bool,
    password_hash: String,
    created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: parse_column("role", &row.role)?,
            verification_status: parse_column("verification_status", &row.verification_status)?,
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            is_active: row.is_active,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

fn into_user(row: Option<UserRow>) -> Result<Option<User>, StorageError> {
    row.map(User::try_from).transpose()
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, phone, role, verification_status, is_active, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.verification_status.as_str())
        .bind(user.is_active)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        into_user(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        into_user(row)
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StorageError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT * FROM users
             WHERE ($1::text IS NULL OR role = $1)
               AND ($2::text IS NULL OR verification_status = $2)
             ORDER BY created_at DESC, email",
        )
        .bind(filter.role.map(|r| r.as_str()))
        .bind(filter.verification.map(|v| v.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn set_verification(
        &self,
        id: &str,
        status: VerificationStatus,
    ) -> Result<Option<User>, StorageError> {
        let row: Option<UserRow> = sqlx::query_as(
            "UPDATE users SET verification_status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        into_user(row)
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Option<User>, StorageError> {
        let row: Option<UserRow> =
            sqlx::query_as("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING *")
                .bind(id)
                .bind(active)
                .fetch_optional(&self.pool)
                .await?;
        into_user(row)
    }
}
