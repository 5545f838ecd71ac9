//! Data models for the session server

pub mod auth;
pub use auth::*;
