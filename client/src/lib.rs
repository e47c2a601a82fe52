//! Murmur client core
//!
//! Headless client tier for the murmur public feed: typed remote calls,
//! cached query orchestration, feed assembly, pure form validation, and
//! session state. A presentation layer binds to [`app::AppState`] and
//! renders the states the services expose; nothing in this crate draws
//! anything.
//!
//! ## Architecture
//!
//! - [`app`]: wiring of session, query client, and services
//! - [`services`]: feed assembly, profile lifecycle, role surface
//! - [`composer`] / [`validation`]: draft state and the pure input rules
//! - [`display`]: textual view-model helpers
//! - [`session`]: identity provider boundary
//!
//! The remote service itself, the identity provider protocol, and all
//! rendering are collaborators outside this crate.

pub mod app;
pub mod composer;
pub mod config;
pub mod display;
pub mod error;
pub mod keys;
pub mod logging;
pub mod services;
pub mod session;
pub mod validation;

pub use app::{AppMounts, AppState};
pub use composer::{Composer, ProfileSetupForm};
pub use error::{ClientError, ClientResult};
pub use services::feed::PostWithUsername;
pub use session::{IdentitySnapshot, Session};
