use yamdb_types::ValidationError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Confirmation code hash error: {0}")]
    CodeHashError(#[from] argon2::password_hash::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Invalid confirmation code")]
    InvalidConfirmationCode,

    #[error("Invalid import record: {0}")]
    InvalidImportRecord(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Maps missing row to [`Error::RecordNotFound`]
    pub(crate) fn not_found(entity: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
        move |e| match e {
            sqlx::Error::RowNotFound => Error::RecordNotFound(entity.to_string()),
            other => Error::DatabaseError(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RecordNotFound(_))
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_error) if db_error.is_unique_violation())
}

#[cfg(test)]
pub(crate) mod tests {
    use sqlx::{sqlite::SqlitePoolOptions, Pool};

    use crate::ChosenDB;

    pub async fn memory_db() -> Pool<ChosenDB> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate(&pool).await.unwrap();
        pool
    }

    /// Runs the same insert twice, the second one has to fail
    pub async fn second_insert_error(pool: &Pool<ChosenDB>, insert: &str) -> sqlx::Error {
        sqlx::query(insert).execute(pool).await.unwrap();
        sqlx::query(insert).execute(pool).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_is_unique_violation() {
        let pool = memory_db().await;
        let err = second_insert_error(
            &pool,
            "INSERT INTO genre (name, slug) VALUES ('Drama', 'drama')",
        )
        .await;
        assert!(super::is_unique_violation(&err));
        assert!(!super::is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
