//! Store traits, plus an in-memory implementation behind the `test-util` feature.
//!
//! The HTTP layer only talks to these traits; the persistence crate provides
//! the PostgreSQL implementations.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryStore;
pub use store::{SessionStore, SetupStore, StoreError, StoreHealth, StoreResult, UserStore};
