use sqlx::SqlitePool;

use super::jwt::IssuedToken;
use crate::dates::rfc3339;

/// Stores a token issued at login and drops the user's expired ones.
pub async fn record_token(db: &SqlitePool, issued: &IssuedToken) -> sqlx::Result<()> {
    sqlx::query(r#"DELETE FROM bearer_tokens WHERE user_id = ?1 AND expires_at < ?2"#)
        .bind(issued.claims.user_id)
        .bind(rfc3339(issued.issued_at))
        .execute(db)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO bearer_tokens (token, user_id, created_at, expires_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (token) DO NOTHING
        "#,
    )
    .bind(&issued.token)
    .bind(issued.claims.user_id)
    .bind(rfc3339(issued.issued_at))
    .bind(rfc3339(issued.expires_at))
    .execute(db)
    .await?;
    Ok(())
}

/// Role of the token's owner as stored now, or `None` once the token row is
/// gone (logout, user deletion).
pub async fn active_role(
    db: &SqlitePool,
    token: &str,
    user_id: i64,
) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar(
        r#"
        SELECT u.role
        FROM bearer_tokens t
        JOIN users u ON u.id = t.user_id
        WHERE t.token = ?1 AND t.user_id = ?2
        "#,
    )
    .bind(token)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn revoke_token(db: &SqlitePool, token: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"DELETE FROM bearer_tokens WHERE token = ?1"#)
        .bind(token)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
