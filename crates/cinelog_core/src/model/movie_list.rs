//! Movie list metadata row.
//!
//! Movie references themselves are document payload; the row carries
//! ownership and the privacy flag that gates them on read.

use super::validation::{optional_text, require_text, ValidationError};
use super::{Entity, EntityId, ProfileId};
use serde::Serialize;

pub const LIST_NAME_MAX_CHARS: usize = 155;
pub const LIST_DESCRIPTION_MAX_CHARS: usize = 255;

/// Movie list row as stored relationally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieList {
    pub list_id: EntityId,
    /// Owner profile.
    pub profile_id: ProfileId,
    pub name: String,
    pub description: Option<String>,
    /// Private lists hide their movies from everyone but the owner.
    pub is_private: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Entity for MovieList {
    fn entity_id(&self) -> EntityId {
        self.list_id
    }
}

/// Input for creating a movie list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovieList {
    pub profile_id: ProfileId,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
}

impl NewMovieList {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, LIST_NAME_MAX_CHARS)?;
        optional_text(
            "description",
            self.description.as_deref(),
            LIST_DESCRIPTION_MAX_CHARS,
        )
    }
}

/// Partial movie list update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieListPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
}

impl MovieListPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_private.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            require_text("name", name, LIST_NAME_MAX_CHARS)?;
        }
        optional_text(
            "description",
            self.description.as_deref(),
            LIST_DESCRIPTION_MAX_CHARS,
        )
    }
}
