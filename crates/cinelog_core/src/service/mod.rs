//! Entity use-case services.
//!
//! # Responsibility
//! - Apply entity rules (uniqueness, authorship, ownership, privacy) around
//!   the dual-write coordinator and the merge reader.
//! - Map every lower-layer failure onto one [`ServiceError`].

pub mod article_service;
pub mod comment_service;
mod error;
pub mod movie_list_service;
pub mod profile_service;

pub use error::{ErrorClass, ServiceError, ServiceResult, RECONCILIATION_MESSAGE};

use serde_json::{Map, Value};

/// Collects the provided document fields, skipping `None`.
pub(crate) fn document_fields<const N: usize>(
    entries: [(&str, Option<Value>); N],
) -> Map<String, Value> {
    entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key.to_string(), value)))
        .collect()
}
