//! Relational domain model for the movie-review platform.
//!
//! # Responsibility
//! - Define the metadata rows owned by the relational store.
//! - Define create inputs and partial patches with input validation.
//!
//! # Invariants
//! - Every row is identified by a stable UUID assigned on insert.
//! - Inputs must pass `validate()` before any store is touched.

pub mod article;
pub mod comment;
pub mod movie_list;
pub mod profile;
pub mod validation;

use uuid::Uuid;

/// Stable identifier shared by a relational row and its document.
pub type EntityId = Uuid;

/// Identifier of a profile, used for ownership and authorship checks.
pub type ProfileId = Uuid;

/// Relational row addressable by one canonical id.
pub trait Entity {
    /// Returns the id the matching document is keyed by.
    fn entity_id(&self) -> EntityId;
}
