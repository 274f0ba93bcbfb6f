use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,          // database-assigned primary key
    pub clerk_id: String, // identity provider subject, unique
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime, // set by the database on insert
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no matching user")]
    NotFound,
    #[error("unexpected number of rows affected: {0}")]
    UnexpectedRowCount(u64),
    #[error(transparent)]
    Persistence(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn user_serializes_with_rfc3339_timestamp() {
        let user = User {
            id: 7,
            clerk_id: "user_2abc".into(),
            created_at: datetime!(2024-05-01 12:30:00 UTC),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["clerk_id"], "user_2abc");
        assert_eq!(json["created_at"], "2024-05-01T12:30:00Z");
    }
}
