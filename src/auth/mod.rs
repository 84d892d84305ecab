mod claims;
pub mod handlers;
pub mod jwt;
mod middleware;
pub mod password;
mod repo;

pub use claims::Claims;
pub use handlers::{protected_routes, public_routes};
pub use jwt::JwtKeys;
pub use middleware::{require_bearer, AdminUser, AuthUser};
