use serde::{Deserialize, Serialize};

/// JWT payload issued at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub exp: usize, // expires at (unix timestamp)
    pub iat: usize, // issued at (unix timestamp)
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
