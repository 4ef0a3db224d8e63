//! Profile metadata row.
//!
//! # Invariants
//! - `username` is unique across profiles and limited to `[A-Za-z0-9_.-]`.
//! - One profile per `user_id`.

use super::validation::{optional_text, require_text, ValidationError};
use super::{Entity, EntityId, ProfileId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USERNAME_MAX_CHARS: usize = 30;
pub const PROFILE_DESCRIPTION_MAX_CHARS: usize = 255;
pub const IMAGE_PATH_MAX_CHARS: usize = 255;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid username regex"));

/// Role assigned to a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    /// Regular reader.
    #[default]
    Subscriber,
    /// Verified reviewer with higher visibility.
    Critic,
    /// Writes newsletter articles.
    Editor,
}

impl ProfileRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscriber => "subscriber",
            Self::Critic => "critic",
            Self::Editor => "editor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "subscriber" => Some(Self::Subscriber),
            "critic" => Some(Self::Critic),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }
}

/// Profile row as stored relationally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub profile_id: ProfileId,
    pub user_id: Uuid,
    pub username: String,
    pub description: Option<String>,
    pub profile_role: ProfileRole,
    pub image_rel_path: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Entity for Profile {
    fn entity_id(&self) -> EntityId {
        self.profile_id
    }
}

/// Input for creating a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub username: String,
    pub description: Option<String>,
    pub profile_role: ProfileRole,
    pub image_rel_path: Option<String>,
}

impl NewProfile {
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            description: None,
            profile_role: ProfileRole::default(),
            image_rel_path: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        optional_text(
            "description",
            self.description.as_deref(),
            PROFILE_DESCRIPTION_MAX_CHARS,
        )?;
        optional_text(
            "image_rel_path",
            self.image_rel_path.as_deref(),
            IMAGE_PATH_MAX_CHARS,
        )
    }
}

/// Partial profile update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub description: Option<String>,
    pub profile_role: Option<ProfileRole>,
    pub image_rel_path: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.description.is_none()
            && self.profile_role.is_none()
            && self.image_rel_path.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(username) = self.username.as_deref() {
            validate_username(username)?;
        }
        optional_text(
            "description",
            self.description.as_deref(),
            PROFILE_DESCRIPTION_MAX_CHARS,
        )?;
        optional_text(
            "image_rel_path",
            self.image_rel_path.as_deref(),
            IMAGE_PATH_MAX_CHARS,
        )
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    require_text("username", username, USERNAME_MAX_CHARS)?;
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::InvalidFormat {
            field: "username",
            value: username.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NewProfile, ProfilePatch, ProfileRole};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn username_with_spaces_is_rejected() {
        let input = NewProfile::new(Uuid::new_v4(), "film buff");
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidFormat {
                field: "username",
                ..
            })
        ));
    }

    #[test]
    fn role_roundtrips_through_db_text() {
        for role in [
            ProfileRole::Subscriber,
            ProfileRole::Critic,
            ProfileRole::Editor,
        ] {
            assert_eq!(ProfileRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(ProfileRole::parse("admin"), None);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ProfilePatch::default().is_empty());
        let patch = ProfilePatch {
            profile_role: Some(ProfileRole::Critic),
            ..ProfilePatch::default()
        };
        assert!(!patch.is_empty());
    }
}
