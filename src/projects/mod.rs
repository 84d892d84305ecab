pub mod dto;
pub mod export;
pub mod handlers;
pub mod membership;
pub mod repo;

pub use handlers::router;
