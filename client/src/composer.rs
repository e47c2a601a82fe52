//! Draft state for the post composer and the profile-setup prompt
//!
//! These are the state machines a widget binds to: hold the raw input,
//! expose live counts, submit through the owning service, and reset only
//! after the write lands. A failed submit leaves the draft untouched so
//! the author can correct it.

use backend_api::Topic;

use crate::error::{ClientError, ClientResult};
use crate::services::feed::FeedService;
use crate::services::profile::ProfileService;
use crate::session::Session;
use crate::validation::{self, ValidationError};

/// Topic preselected in a fresh composer.
pub const DEFAULT_TOPIC: Topic = Topic::Random;

/// Draft state of the post composer.
#[derive(Clone, Debug)]
pub struct Composer {
    content: String,
    topic: Option<Topic>,
    pending: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            topic: Some(DEFAULT_TOPIC),
            pending: false,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn topic(&self) -> Option<Topic> {
        self.topic
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn select_topic(&mut self, topic: Topic) {
        self.topic = Some(topic);
    }

    pub fn clear_topic(&mut self) {
        self.topic = None;
    }

    /// Characters used against the post limit, in the limit's own units.
    pub fn char_count(&self) -> usize {
        validation::text_length(&self.content)
    }

    /// Characters left before the limit. Negative once over it.
    pub fn remaining(&self) -> isize {
        validation::MAX_POST_LENGTH as isize - self.char_count() as isize
    }

    /// Validate the draft without submitting, for live widget state.
    pub fn validate(&self) -> Result<Topic, ValidationError> {
        validation::validate_post(&self.content, self.topic)
    }

    pub fn can_submit(&self) -> bool {
        !self.pending && self.validate().is_ok()
    }

    /// Submit the draft through the feed service.
    ///
    /// Requires a signed-in session. Resets to a pristine draft only on
    /// success.
    pub async fn submit(&mut self, session: &Session, feed: &FeedService) -> ClientResult<()> {
        if !session.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }

        self.pending = true;
        let result = feed.create_post(&self.content, self.topic).await;
        self.pending = false;
        result?;

        self.reset();
        Ok(())
    }

    /// Back to the pristine state: empty content, default topic.
    pub fn reset(&mut self) {
        self.content.clear();
        self.topic = Some(DEFAULT_TOPIC);
        self.pending = false;
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draft state of the first-run username prompt.
#[derive(Clone, Debug)]
pub struct ProfileSetupForm {
    username: String,
    pending: bool,
}

impl ProfileSetupForm {
    pub fn new() -> Self {
        Self {
            username: String::new(),
            pending: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    /// Submit the username through the profile service, which trims and
    /// validates it. The prompt itself disappears once the invalidated
    /// profile read comes back with the saved profile.
    pub async fn submit(&mut self, session: &Session, profile: &ProfileService) -> ClientResult<()> {
        if !session.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }

        self.pending = true;
        let result = profile
            .save_profile(&session.snapshot(), &self.username)
            .await;
        self.pending = false;
        result?;

        Ok(())
    }
}

impl Default for ProfileSetupForm {
    fn default() -> Self {
        Self::new()
    }
}
