//! Canonical document shapes, one per entity kind.
//!
//! Every document is flat: payload fields are siblings of `id`.

use super::{Document, DocumentStore, StoreError, StoreResult};
use crate::model::{EntityId, ProfileId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Article body stored next to the relational article row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDocument {
    pub id: String,
    /// HTML body.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_rel_url: Option<String>,
}

impl ArticleDocument {
    pub fn new(
        article_id: EntityId,
        content: impl Into<String>,
        image_rel_url: Option<String>,
    ) -> Self {
        Self {
            id: article_id.to_string(),
            content: content.into(),
            image_rel_url,
        }
    }
}

impl Document for ArticleDocument {
    const KIND: &'static str = "article";

    fn document_id(&self) -> &str {
        &self.id
    }
}

/// One movie reference inside a list document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieEntry {
    pub movie_id: String,
    pub added_at: DateTime<Utc>,
}

/// Movie references and likes of one list. `movies` behaves as a set keyed
/// by `movie_id`, `like_by` as a set of profile ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieListDocument {
    pub id: String,
    /// Owner of the list; must match the relational row.
    pub profile_id: String,
    #[serde(default)]
    pub movies: Vec<MovieEntry>,
    #[serde(default)]
    pub like_by: Vec<String>,
}

impl MovieListDocument {
    pub fn empty(list_id: EntityId, profile_id: ProfileId) -> Self {
        Self {
            id: list_id.to_string(),
            profile_id: profile_id.to_string(),
            movies: Vec::new(),
            like_by: Vec::new(),
        }
    }

    pub fn like(&mut self, profile_id: &str) -> bool {
        insert_liker(&mut self.like_by, profile_id)
    }

    pub fn unlike(&mut self, profile_id: &str) -> bool {
        remove_liker(&mut self.like_by, profile_id)
    }

    pub fn contains_movie(&self, movie_id: &str) -> bool {
        self.movies.iter().any(|entry| entry.movie_id == movie_id)
    }

    /// Appends `movie_id` unless present. Returns whether it was appended.
    pub fn insert_movie(&mut self, movie_id: &str, added_at: DateTime<Utc>) -> bool {
        if self.contains_movie(movie_id) {
            return false;
        }
        self.movies.push(MovieEntry {
            movie_id: movie_id.to_string(),
            added_at,
        });
        true
    }

    /// Drops every entry for `movie_id`. Returns whether any was dropped.
    pub fn remove_movie(&mut self, movie_id: &str) -> bool {
        let before = self.movies.len();
        self.movies.retain(|entry| entry.movie_id != movie_id);
        self.movies.len() < before
    }
}

impl Document for MovieListDocument {
    const KIND: &'static str = "movie_list";

    fn document_id(&self) -> &str {
        &self.id
    }
}

/// Display fields mirrored from the profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

impl Document for ProfileDocument {
    const KIND: &'static str = "profile";

    fn document_id(&self) -> &str {
        &self.id
    }
}

/// Comment enrichment: author display name and the set of liking profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDocument {
    pub id: String,
    pub author_username: String,
    #[serde(default)]
    pub like_by: Vec<String>,
}

impl CommentDocument {
    pub fn new(comment_id: EntityId, author_username: impl Into<String>) -> Self {
        Self {
            id: comment_id.to_string(),
            author_username: author_username.into(),
            like_by: Vec::new(),
        }
    }

    pub fn like(&mut self, profile_id: &str) -> bool {
        insert_liker(&mut self.like_by, profile_id)
    }

    pub fn unlike(&mut self, profile_id: &str) -> bool {
        remove_liker(&mut self.like_by, profile_id)
    }
}

fn insert_liker(like_by: &mut Vec<String>, profile_id: &str) -> bool {
    if like_by.iter().any(|liker| liker == profile_id) {
        return false;
    }
    like_by.push(profile_id.to_string());
    true
}

fn remove_liker(like_by: &mut Vec<String>, profile_id: &str) -> bool {
    let before = like_by.len();
    like_by.retain(|liker| liker != profile_id);
    like_by.len() < before
}

impl Document for CommentDocument {
    const KIND: &'static str = "comment";

    fn document_id(&self) -> &str {
        &self.id
    }
}

impl DocumentStore<MovieListDocument> {
    /// Adds `movie_id` to the list, stamped with the current UTC time.
    ///
    /// Returns `false` without rewriting when the movie is already present.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] when the list document does not exist.
    pub fn add_movie(&self, list_id: &str, movie_id: &str) -> StoreResult<bool> {
        let now = Utc::now();
        self.update_with(list_id, |list| list.insert_movie(movie_id, now))?
            .ok_or_else(|| not_found::<MovieListDocument>(list_id))
    }

    /// Removes `movie_id` from the list. Returns `false` if it was absent.
    pub fn remove_movie(&self, list_id: &str, movie_id: &str) -> StoreResult<bool> {
        self.update_with(list_id, |list| list.remove_movie(movie_id))?
            .ok_or_else(|| not_found::<MovieListDocument>(list_id))
    }

    /// Records a like by `profile_id`. Returns `false` if already liked.
    pub fn add_like(&self, list_id: &str, profile_id: &str) -> StoreResult<bool> {
        self.update_with(list_id, |list| list.like(profile_id))?
            .ok_or_else(|| not_found::<MovieListDocument>(list_id))
    }

    pub fn remove_like(&self, list_id: &str, profile_id: &str) -> StoreResult<bool> {
        self.update_with(list_id, |list| list.unlike(profile_id))?
            .ok_or_else(|| not_found::<MovieListDocument>(list_id))
    }
}

impl DocumentStore<CommentDocument> {
    /// Records a like by `profile_id`. Returns `false` if already liked.
    pub fn add_like(&self, comment_id: &str, profile_id: &str) -> StoreResult<bool> {
        self.update_with(comment_id, |comment| comment.like(profile_id))?
            .ok_or_else(|| not_found::<CommentDocument>(comment_id))
    }

    /// Withdraws a like by `profile_id`. Returns `false` if not liked.
    pub fn remove_like(&self, comment_id: &str, profile_id: &str) -> StoreResult<bool> {
        self.update_with(comment_id, |comment| comment.unlike(profile_id))?
            .ok_or_else(|| not_found::<CommentDocument>(comment_id))
    }
}

fn not_found<D: Document>(id: &str) -> StoreError {
    StoreError::NotFound {
        kind: D::KIND,
        id: id.to_string(),
    }
}
