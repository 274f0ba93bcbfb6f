use sqlx::PgPool;
use tracing::info;

use crate::users::repo_types::{StoreError, User};

impl User {
    /// Insert a user by identity provider id. Exactly one row must be written.
    pub async fn insert(db: &PgPool, clerk_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (clerk_id)
            VALUES ($1)
            "#,
        )
        .bind(clerk_id)
        .execute(db)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::UnexpectedRowCount(result.rows_affected()));
        }

        info!(clerk_id = %clerk_id, "user signed up");
        Ok(())
    }

    pub async fn find_by_clerk_id(db: &PgPool, clerk_id: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, created_at
            FROM users
            WHERE clerk_id = $1
            "#,
        )
        .bind(clerk_id)
        .fetch_optional(db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    /// All users in database order. An empty table yields an empty vec.
    pub async fn list_all(db: &PgPool) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, created_at
            FROM users
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    pub async fn delete_by_id(db: &PgPool, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;

        match result.rows_affected() {
            0 => Err(StoreError::NotFound),
            1 => Ok(()),
            n => Err(StoreError::UnexpectedRowCount(n)),
        }
    }
}
