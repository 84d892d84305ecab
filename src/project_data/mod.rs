pub mod dto;
pub mod handlers;
pub mod reconcile;
pub mod repo;

pub use handlers::router;
