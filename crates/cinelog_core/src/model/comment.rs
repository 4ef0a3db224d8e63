//! Comment metadata row.
//!
//! # Invariants
//! - A comment points at exactly one target (`target_type`, `target_id`).
//! - `content` is at most 500 chars.

use super::validation::{require_text, ValidationError};
use super::{Entity, EntityId, ProfileId};
use serde::{Deserialize, Serialize};

pub const COMMENT_CONTENT_MAX_CHARS: usize = 500;
pub const TARGET_ID_MAX_CHARS: usize = 64;

/// Kind of object a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Movie,
    Comment,
    Article,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Comment => "comment",
            Self::Article => "article",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(Self::Movie),
            "comment" => Some(Self::Comment),
            "article" => Some(Self::Article),
            _ => None,
        }
    }
}

/// Comment row as stored relationally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub comment_id: EntityId,
    pub target_id: String,
    pub target_type: TargetType,
    /// Author profile.
    pub profile_id: ProfileId,
    pub content: String,
    pub has_spoilers: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Entity for Comment {
    fn entity_id(&self) -> EntityId {
        self.comment_id
    }
}

/// Input for creating a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub target_id: String,
    pub target_type: TargetType,
    pub profile_id: ProfileId,
    pub content: String,
    pub has_spoilers: bool,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("target_id", &self.target_id, TARGET_ID_MAX_CHARS)?;
        require_text("content", &self.content, COMMENT_CONTENT_MAX_CHARS)
    }
}

/// Partial comment update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPatch {
    pub content: Option<String>,
    pub has_spoilers: Option<bool>,
}

impl CommentPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.has_spoilers.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.content.as_deref() {
            Some(content) => require_text("content", content, COMMENT_CONTENT_MAX_CHARS),
            None => Ok(()),
        }
    }
}
