pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod project_data;
pub mod projects;
pub mod request;
pub mod response;
pub mod state;
pub mod users;
