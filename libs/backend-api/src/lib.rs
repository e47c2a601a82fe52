//! Typed contract for the murmur remote service
//!
//! One trait covers every operation the service exposes to clients; the
//! HTTP transport speaks it in production and the in-memory mock speaks it
//! in tests.

pub mod client;
pub mod error;
pub mod mock;
pub mod models;

pub use client::{BackendApi, HttpBackendClient};
pub use error::{ApiError, ApiResult};
pub use mock::MockBackend;
pub use models::{ParseTopicError, Post, Principal, Topic, UserProfile, UserRole};
