//! Data model shared with the remote service
//!
//! Every type crossing the service boundary lives here and carries serde
//! derives matching the wire spelling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// IDENTITY
// ============================================================================

/// Opaque identity handle issued by the identity provider.
///
/// The textual form is treated as a stable key for equality and hashing;
/// the client never inspects its structure.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

// ============================================================================
// POSTS
// ============================================================================

/// Closed set of post topics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Tech,
    Random,
    Politics,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Tech, Topic::Random, Topic::Politics];

    /// Wire spelling expected by the remote service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Tech => "tech",
            Topic::Random => "random",
            Topic::Politics => "politics",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ParseTopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tech" => Ok(Topic::Tech),
            "random" => Ok(Topic::Random),
            "politics" => Ok(Topic::Politics),
            other => Err(ParseTopicError(other.to_string())),
        }
    }
}

/// A topic string the service would not accept.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown topic: {0}")]
pub struct ParseTopicError(pub String);

/// A single feed entry.
///
/// Immutable once created; the service assigns `author` and `timestamp` at
/// write time and never edits or deletes entries afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub topic: Topic,
    pub content: String,
    pub author: Principal,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: u64,
}

// ============================================================================
// PROFILES & ROLES
// ============================================================================

/// A user's chosen display profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// Role assigned to an identity by the remote service.
///
/// Read-only to clients apart from the admin-gated assignment call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Guest => "guest",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
