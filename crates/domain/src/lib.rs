//! Domain layer for the Coconut backend.
//!
//! This crate contains:
//! - Domain models (User, Session, SetupState)
//! - Store traits the HTTP layer depends on
//! - An in-memory store for tests (`test-util` feature)

pub mod models;
pub mod services;
