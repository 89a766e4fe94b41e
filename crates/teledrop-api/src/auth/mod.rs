//! Shared-credential authentication for write and management routes

pub mod middleware;

pub use middleware::{auth_middleware, AuthState};
