//! HTTP route handlers.

pub mod auth;
pub mod backup;
pub mod containers;
pub mod csrf;
pub mod health;
pub mod pages;
pub mod setup;
pub mod system_info;
