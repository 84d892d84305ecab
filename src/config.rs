use anyhow::{ensure, Context};
use serde::Deserialize;

/// Token lifetime bounds, in hours: at least one hour, at most a year.
const TTL_HOURS_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

/// Credentials of the administrator seeded on first start.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so it can be exercised
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .context("JWT_SECRET must be set")?;

        let ttl_hours = parse_or(&lookup, "JWT_TTL_HOURS", 24)?;
        ensure!(
            TTL_HOURS_RANGE.contains(&ttl_hours),
            "JWT_TTL_HOURS must be between {} and {}, got {ttl_hours}",
            TTL_HOURS_RANGE.start(),
            TTL_HOURS_RANGE.end()
        );
        let jwt = JwtConfig { secret, ttl_hours };
        let admin = AdminConfig {
            username: lookup("ADMIN_USERNAME").unwrap_or_else(|| "root".into()),
            email: lookup("ADMIN_EMAIL")
                .unwrap_or_else(|| "root@example.com".into())
                .trim()
                .to_lowercase(),
            password: lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://app.db".into()),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8080)?,
            jwt,
            admin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
