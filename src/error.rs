use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::response::Envelope;

/// Every way a request can fail. The `code` is what clients branch on; the
/// `message` is the only human-readable text that leaves the process.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },
    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },
    #[error("{message}")]
    Forbidden { code: &'static str, message: String },
    #[error("{message}")]
    NotFound { code: &'static str, message: String },
    #[error("{message}")]
    Conflict { code: &'static str, message: String },
    #[error("{message}: {source}")]
    Database {
        code: &'static str,
        message: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("{message}: {source}")]
    Internal {
        code: &'static str,
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest { code, message: message.into() }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized { code, message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { code: "FORBIDDEN", message: message.into() }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound { code, message: message.into() }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict { code, message: message.into() }
    }

    pub fn missing_id() -> Self {
        Self::bad_request("MISSING_ID", "Field 'id' is required")
    }

    /// `map_err` adapter for store failures reported as `DB_ERROR`.
    pub fn db(message: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        Self::db_with("DB_ERROR", message)
    }

    pub fn db_with(code: &'static str, message: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Database { code, message: message.into(), source }
    }

    pub fn internal(
        code: &'static str,
        message: &'static str,
    ) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Internal { code, message: message.into(), source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. }
            | Self::Unauthorized { code, .. }
            | Self::Forbidden { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. }
            | Self::Database { code, .. }
            | Self::Internal { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Database { source, .. } => {
                error!(code = self.code(), error = %source, "{}", self.message());
            }
            Self::Internal { source, .. } => {
                error!(code = self.code(), error = %source, "{}", self.message());
            }
            _ => warn!(code = self.code(), %status, "{}", self.message()),
        }
        let body = Envelope::<()>::failure(self.code(), self.message());
        (status, Json(body)).into_response()
    }
}

/// True when the statement tripped a UNIQUE or PRIMARY KEY constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// SQLite extended codes for a violated foreign key: the plain
/// `SQLITE_CONSTRAINT_FOREIGNKEY` and the trigger-raised variant that
/// `ON DELETE RESTRICT` reports.
const SQLITE_FOREIGN_KEY_CODES: [&str; 2] = ["787", "1811"];

/// True when the statement referenced, or tried to delete, a row another
/// table still points at.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db| {
        db.is_foreign_key_violation() || db.code().is_some_and(|c| is_foreign_key_code(&c))
    })
}

fn is_foreign_key_code(code: &str) -> bool {
    SQLITE_FOREIGN_KEY_CODES.contains(&code)
}
