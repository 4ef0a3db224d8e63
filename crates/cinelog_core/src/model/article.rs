//! Article metadata row and authorship link.
//!
//! The article body lives in the document store; only listing and
//! filtering columns are kept here.

use super::validation::{optional_text, require_text, ValidationError};
use super::{Entity, EntityId, ProfileId};
use serde::Serialize;

pub const ARTICLE_TITLE_MAX_CHARS: usize = 100;
pub const MOVIE_REF_MAX_CHARS: usize = 20;

/// Article row as stored relationally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub article_id: EntityId,
    pub article_title: String,
    pub movie_ref_id: Option<String>,
    pub section_id: i64,
    pub newsletter_id: Option<i64>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Entity for Article {
    fn entity_id(&self) -> EntityId {
        self.article_id
    }
}

/// Input for creating an article together with its main-author link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub article_title: String,
    pub movie_ref_id: Option<String>,
    pub section_id: i64,
    pub newsletter_id: Option<i64>,
    /// Profile linked as main author in the same transaction.
    pub author_profile_id: ProfileId,
}

impl NewArticle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("article_title", &self.article_title, ARTICLE_TITLE_MAX_CHARS)?;
        optional_text(
            "movie_ref_id",
            self.movie_ref_id.as_deref(),
            MOVIE_REF_MAX_CHARS,
        )
    }
}

/// Partial article update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePatch {
    pub article_title: Option<String>,
    pub movie_ref_id: Option<String>,
    pub section_id: Option<i64>,
    pub newsletter_id: Option<i64>,
}

impl ArticlePatch {
    pub fn is_empty(&self) -> bool {
        self.article_title.is_none()
            && self.movie_ref_id.is_none()
            && self.section_id.is_none()
            && self.newsletter_id.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = self.article_title.as_deref() {
            require_text("article_title", title, ARTICLE_TITLE_MAX_CHARS)?;
        }
        optional_text(
            "movie_ref_id",
            self.movie_ref_id.as_deref(),
            MOVIE_REF_MAX_CHARS,
        )
    }
}
