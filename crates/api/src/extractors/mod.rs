//! Request extractors.

mod session;
