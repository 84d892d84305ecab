use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::state::AppState;

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let jwt = &state.config.jwt;
        let ttl_secs = (jwt.ttl_hours.max(1) as u64).saturating_mul(3600);
        Self::new(&jwt.secret, Duration::from_secs(ttl_secs))
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn sign(&self, user_id: i64, email: &str, role: &str) -> anyhow::Result<IssuedToken> {
        let issued_at = OffsetDateTime::now_utc();
        let expires_at = issued_at + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user_id,
            email: email.to_string(),
            role: role.to_string(),
            iat: issued_at.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id, role, "jwt signed");
        Ok(IssuedToken {
            token,
            claims,
            issued_at,
            expires_at,
        })
    }

    /// Checks signature, algorithm (HS256 only) and expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}
