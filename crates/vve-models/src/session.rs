//! Session (game) identifiers and clip indices.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Highest clip index accepted for a session.
pub const MAX_CLIP_INDEX: u8 = 10;

/// Maximum length of a caller-supplied session identifier.
const MAX_SESSION_ID_LEN: usize = 128;

/// Errors raised when parsing identifiers supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Game ID is required")]
    EmptySessionId,

    #[error("Game ID must be at most {MAX_SESSION_ID_LEN} characters")]
    SessionIdTooLong,

    #[error("Game ID may only contain letters, digits, '-' and '_'")]
    InvalidSessionId,

    #[error("Video index must be a number between 0 and {MAX_CLIP_INDEX}")]
    InvalidClipIndex,
}

/// Opaque identifier scoping one upload-through-analysis workflow.
///
/// The identifier doubles as a directory name under the output root, so it is
/// restricted to a single path component made of `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied identifier.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, IdError> {
        let s = s.as_ref();
        if s.is_empty() {
            return Err(IdError::EmptySessionId);
        }
        if s.len() > MAX_SESSION_ID_LEN {
            return Err(IdError::SessionIdTooLong);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(IdError::InvalidSessionId);
        }
        Ok(Self(s.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Position of a clip within a session, in `0..=MAX_CLIP_INDEX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "u8", into = "u8")]
pub struct ClipIndex(u8);

impl ClipIndex {
    pub fn new(index: u8) -> Result<Self, IdError> {
        if index > MAX_CLIP_INDEX {
            return Err(IdError::InvalidClipIndex);
        }
        Ok(Self(index))
    }

    /// Parse a path segment such as `"3"`.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let index: u8 = s.trim().parse().map_err(|_| IdError::InvalidClipIndex)?;
        Self::new(index)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ClipIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for ClipIndex {
    type Error = IdError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl From<ClipIndex> for u8 {
    fn from(index: ClipIndex) -> Self {
        index.0
    }
}
