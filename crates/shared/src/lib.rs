//! Shared utilities and common types for the Coconut backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (hashing, HMAC signing, token generation)
//! - Password hashing with Argon2id
//! - IP address pattern lists for access filtering
//! - Common validation logic

pub mod crypto;
pub mod ip_filter;
pub mod password;
pub mod validation;
