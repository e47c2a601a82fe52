//! Pure validation rules for composer and profile input
//!
//! Every rule runs in-process before a remote call is made; a failure here
//! means the submission never left the client. Length limits are counted in
//! UTF-16 code units, the unit they were originally specified in, so an
//! astral-plane emoji costs two characters.

use thiserror::Error;

use backend_api::Topic;

/// Maximum post length in UTF-16 code units.
pub const MAX_POST_LENGTH: usize = 280;

/// Username length bounds, applied after trimming.
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("input must not be empty")]
    Empty,

    #[error("input must be at least {min} characters")]
    TooShort { min: usize },

    #[error("input must be at most {max} characters")]
    TooLong { max: usize },

    #[error("a topic must be selected")]
    MissingTopic,
}

/// Length of `text` in UTF-16 code units.
pub fn text_length(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Validate a post draft, returning the topic to submit with.
///
/// Emptiness is judged on the trimmed content, the length limit on the raw
/// content. The raw content is what gets submitted; whitespace the author
/// typed is preserved.
pub fn validate_post(content: &str, topic: Option<Topic>) -> Result<Topic, ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    if text_length(content) > MAX_POST_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_POST_LENGTH,
        });
    }
    topic.ok_or(ValidationError::MissingTopic)
}

/// Validate a username draft, returning the trimmed form to submit.
pub fn validate_username(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let length = text_length(trimmed);
    if length < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort {
            min: MIN_USERNAME_LENGTH,
        });
    }
    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_USERNAME_LENGTH,
        });
    }
    Ok(trimmed.to_string())
}
