//! Service layer over the query client
//!
//! Each service pairs the remote trait object with cache keys and retry
//! policy for one slice of the app. Services are cheap to clone; clones
//! share the same cache.

pub mod feed;
pub mod profile;
pub mod roles;

pub use feed::FeedService;
pub use profile::ProfileService;
pub use roles::RoleService;
