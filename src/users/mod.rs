pub mod dto;
pub mod handlers;
pub mod repo;
pub mod validation;

pub use handlers::router;
