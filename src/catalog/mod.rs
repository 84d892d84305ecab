//! Flat lookup tables referenced by project data: agronomic labors and tools.

pub mod dto;
pub mod handlers;
pub mod kind;
pub mod repo;

pub use handlers::router;
pub use kind::{CatalogKind, FarmTasks, Tools};
