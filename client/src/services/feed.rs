//! Public feed assembly and the create-post write path
//!
//! The raw feed only carries author principals. Reading it therefore means
//! two steps: fetch the page, then resolve every author's username
//! concurrently and join the results back in order. A single failed lookup
//! degrades that one post to an anonymous author instead of failing the
//! whole page.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::warn;

use backend_api::{BackendApi, Post, Topic};
use query_cache::{MountedQuery, QueryClient, QuerySpec, QueryState, RetryPolicy};

use crate::display;
use crate::error::{ClientError, ClientResult};
use crate::keys;
use crate::session::IdentitySnapshot;
use crate::validation;

/// Default auto-refresh interval for the mounted feed.
pub const FEED_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// A feed post joined with its author's display username.
///
/// Derived on every fetch, never stored remotely. `author_username` is
/// `None` both when the author has no saved profile and when the lookup
/// failed; consumers cannot tell the two apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithUsername {
    pub post: Post,
    pub author_username: Option<String>,
}

impl PostWithUsername {
    /// Name to render for the author, with the anonymous fallback applied.
    pub fn display_name(&self) -> &str {
        display::display_username(self.author_username.as_deref())
    }
}

/// Resolve author usernames for a page of posts, concurrently.
///
/// Output length and order match the input exactly.
pub async fn assemble_feed(backend: &dyn BackendApi, posts: Vec<Post>) -> Vec<PostWithUsername> {
    let lookups = posts.iter().map(|post| {
        let author = post.author.clone();
        async move {
            match backend.get_username(&author).await {
                Ok(username) => username,
                Err(e) => {
                    warn!(
                        author = %author,
                        error = %e,
                        "Username lookup failed, showing author as anonymous"
                    );
                    None
                }
            }
        }
    });

    let usernames = join_all(lookups).await;

    posts
        .into_iter()
        .zip(usernames)
        .map(|(post, author_username)| PostWithUsername {
            post,
            author_username,
        })
        .collect()
}

/// Feed read and write surface over one query client.
#[derive(Clone)]
pub struct FeedService {
    backend: Arc<dyn BackendApi>,
    queries: QueryClient,
    refresh_interval: Duration,
    retry: RetryPolicy,
}

impl FeedService {
    pub fn new(backend: Arc<dyn BackendApi>, queries: QueryClient) -> Self {
        Self {
            backend,
            queries,
            refresh_interval: FEED_REFRESH_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Mount the public feed: fetch immediately, then auto-refresh on the
    /// configured interval and on every invalidation. Mounts disabled while
    /// the identity provider is still initializing.
    pub fn mount(&self, identity: &IdentitySnapshot) -> MountedQuery {
        let spec = QuerySpec::new(keys::public_feed())
            .with_refetch_interval(self.refresh_interval)
            .with_retry_policy(self.retry.clone())
            .with_enabled(identity.is_ready());

        let backend = self.backend.clone();
        self.queries.mount(spec, move || {
            let backend = backend.clone();
            async move {
                let posts = backend.get_public_feed().await.map_err(ClientError::from)?;
                Ok::<_, ClientError>(assemble_feed(backend.as_ref(), posts).await)
            }
        })
    }

    /// Current feed snapshot, straight from the cache.
    pub fn feed(&self) -> QueryState<Vec<PostWithUsername>> {
        self.queries.get(&keys::public_feed())
    }

    /// Validate and submit a new post.
    ///
    /// The raw content is submitted as typed. On success the feed is
    /// invalidated so the mounted query picks the post up; on failure the
    /// cache is left untouched.
    pub async fn create_post(&self, content: &str, topic: Option<Topic>) -> ClientResult<()> {
        let topic = validation::validate_post(content, topic)?;

        let key = keys::public_feed();
        let backend = self.backend.clone();
        self.queries
            .run_mutation("create_post", &[key.as_str()], || async move {
                backend
                    .create_post(content, topic)
                    .await
                    .map_err(ClientError::from)
            })
            .await
    }
}
