use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{info, warn};

use crate::{auth::password::hash_password, config::AdminConfig};

/// Opens the database file, creating it if missing, with foreign keys on.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse database url {database_url}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to an in-memory database is a separate database, so it
    // must be pinned to a single connection that never gets recycled.
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
    }
    .context("connect to database")?;

    Ok(pool)
}

/// Applies the schema and seeds the administrator. Safe to run on every start.
pub async fn bootstrap(db: &SqlitePool, admin: &AdminConfig) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    seed_admin(db, admin).await?;
    Ok(())
}

async fn seed_admin(db: &SqlitePool, admin: &AdminConfig) -> anyhow::Result<()> {
    let Some(password) = admin.password.as_deref() else {
        warn!("ADMIN_PASSWORD not set; skipping administrator seed");
        return Ok(());
    };

    let exists: bool = sqlx::query_scalar(
        r#"SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)"#,
    )
    .bind(&admin.username)
    .bind(&admin.email)
    .fetch_one(db)
    .await
    .context("check administrator")?;
    if exists {
        return Ok(());
    }

    let hash = hash_password(password)?;
    sqlx::query(
        r#"
        INSERT INTO users (name, lastname, username, email, password_hash, role)
        VALUES (?1, ?1, ?1, ?2, ?3, 'admin')
        "#,
    )
    .bind(&admin.username)
    .bind(&admin.email)
    .bind(hash)
    .execute(db)
    .await
    .context("insert administrator")?;

    info!(username = %admin.username, email = %admin.email, "administrator seeded");
    Ok(())
}
