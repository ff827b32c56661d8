//! PostgreSQL repositories
//!
//! Plain textual queries over a shared [`PgPool`]. Enum columns are stored
//! as their snake_case names; items, history and prescription URLs as JSONB.

mod medicines;
mod orders;
mod users;

pub use medicines::PgMedicineRepository;
pub use orders::PgOrderRepository;
pub use users::PgUserRepository;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::StorageError;

const MAX_CONNECTIONS: u32 = 10;

pub async fn connect(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;
    tracing::info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Run pending migrations from `./migrations`
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StorageError::Backend(format!("migration failed: {e}")))?;
    Ok(())
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StorageError::Duplicate(db_err.constraint().unwrap_or("unique key").to_string())
            }
            err @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
                StorageError::Serialization(err.to_string())
            }
            other => StorageError::Backend(other.to_string()),
        }
    }
}

/// Parse a stored enum name
fn parse_column<T>(column: &str, value: &str) -> Result<T, StorageError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| StorageError::Serialization(format!("{column}: {e}")))
}
