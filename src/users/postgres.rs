use async_trait::async_trait;
use sqlx::PgPool;

use super::{Authority, User, UserRepository};
use crate::error::AppError;

/// Reads the `users` table maintained by user management.
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
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, (String, String, bool, i32)>(
            "SELECT name, hashed_password, disabled, authority FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(name, password_hash, disabled, level)| {
            let authority = Authority::from_level(level).unwrap_or_else(|| {
                tracing::warn!(user = %name, level, "Unknown authority level, treating as none");
                Authority::None
            });
            User {
                name,
                password_hash,
                disabled,
                authority,
            }
        }))
    }
}
