pub mod config;
pub mod error;
pub mod store;

pub mod api;
pub mod auth;
pub mod notify;
pub mod types;
pub mod users;
pub mod validation;
