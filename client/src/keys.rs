//! Cache key construction
//!
//! Keys follow the `v{N}:{entity}[:{id}]` scheme. Bumping the version
//! prevents entries written by an older build from being decoded by a newer
//! one after the cached shape changes.

use backend_api::Principal;

/// Schema version for every key this build writes.
const KEY_VERSION: u32 = 1;

/// The public feed. One shared entry for every visitor.
pub fn public_feed() -> String {
    format!("v{}:feed:public", KEY_VERSION)
}

/// The signed-in caller's own profile.
pub fn caller_profile(principal: &Principal) -> String {
    format!("v{}:profile:caller:{}", KEY_VERSION, principal)
}

/// The signed-in caller's own role.
pub fn caller_role(principal: &Principal) -> String {
    format!("v{}:role:caller:{}", KEY_VERSION, principal)
}
