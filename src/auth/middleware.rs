use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{claims::Claims, jwt::JwtKeys, repo};
use crate::{error::ApiError, state::AppState};

/// Identity of a caller whose bearer token has been verified.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
    pub token: String,
}

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.claims.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }
}

/// An `AuthUser` whose role is `admin`; anyone else gets 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

fn token_error(message: &str) -> ApiError {
    ApiError::unauthorized("TOKEN_ERROR", message)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| token_error("Missing token"))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| token_error("Invalid token"))?;
    Ok(token)
}

/// Verifies the `Authorization: Bearer` header against the signing key and
/// the table of issued tokens.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)?;
    let keys = JwtKeys::from_ref(state);

    let mut claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        token_error("Invalid or expired token")
    })?;

    let role = repo::active_role(&state.db, token, claims.user_id)
        .await
        .map_err(ApiError::db("Error checking token"))?;
    let Some(role) = role else {
        warn!(user_id = claims.user_id, "revoked token presented");
        return Err(token_error("Token has been revoked"));
    };
    if role != claims.role {
        debug!(user_id = claims.user_id, token_role = %claims.role, %role, "role changed since login");
        claims.role = role;
    }

    Ok(AuthUser {
        claims,
        token: token.to_string(),
    })
}

/// Route layer for the protected API: rejects the request unless it carries
/// a valid token, and hands the verified identity to the handler.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        authenticate(state, &parts.headers).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            warn!(user_id = user.user_id(), role = %user.claims.role, "admin role required");
            return Err(ApiError::forbidden("Administrator role required"));
        }
        Ok(AdminUser(user))
    }
}
