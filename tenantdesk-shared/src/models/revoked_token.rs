/// Deny-list of identity tokens revoked by logout
///
/// Rows are keyed by the token's `jti` claim and only need to outlive the
/// token itself; [`RevokedToken::purge_expired`] drops the rest.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevokedToken {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
}

impl RevokedToken {
    /// Adds a token to the deny-list. Revoking twice is not an error.
    pub async fn revoke<'e, E>(
        executor: E,
        token_id: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO revoked_tokens (token_id, user_id, expires_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (token_id) DO NOTHING",
        )
        .bind(token_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn is_revoked<'e, E>(executor: E, token_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token_id = $1)")
            .bind(token_id)
            .fetch_one(executor)
            .await
    }

    /// Removes entries whose token has expired anyway
    pub async fn purge_expired<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= NOW()")
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
