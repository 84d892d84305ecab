use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::error::ApiError;

/// JSON body extractor that answers malformed input with `INVALID_JSON`
/// inside the envelope instead of axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "rejected json body");
                Err(ApiError::bad_request("INVALID_JSON", "Invalid JSON body"))
            }
        }
    }
}

/// Query-string extractor whose rejection is an `INVALID_INPUT` envelope.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "rejected query string");
                Err(ApiError::bad_request("INVALID_INPUT", "Invalid query string"))
            }
        }
    }
}

/// `?q=` free-text filter shared by the search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    /// `%q%` for a `LIKE` match, or `None` when every row should be returned.
    pub fn pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{q}%"))
    }
}

/// `{"id": ...}` body used by the delete endpoints.
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: Option<i64>,
}

impl IdRequest {
    pub fn require(&self) -> Result<i64, ApiError> {
        require_id(self.id)
    }
}

pub fn require_id(id: Option<i64>) -> Result<i64, ApiError> {
    id.filter(|id| *id > 0).ok_or_else(ApiError::missing_id)
}
