use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User as exposed by the API. The password hash never leaves the repo.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserWithHash {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Partial user update: absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Column values that actually differ from the stored row.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.name {
            user.name = v.clone();
        }
        if let Some(v) = &self.lastname {
            user.lastname = v.clone();
        }
        if let Some(v) = &self.username {
            user.username = v.clone();
        }
        if let Some(v) = &self.email {
            user.email = v.clone();
        }
        if let Some(v) = &self.role {
            user.role = v.clone();
        }
    }
}
