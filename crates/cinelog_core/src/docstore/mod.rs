//! File-backed JSON document store.
//!
//! # Responsibility
//! - Hold the per-entity payloads that are not kept relationally, one JSON
//!   array file per entity kind.
//! - Serialize every read-modify-write cycle on one file.
//!
//! # Invariants
//! - At most one document per `id` inside a store file.
//! - The file is replaced atomically; readers never observe a partial array.
//! - Mutations on the same canonical path are mutually exclusive across all
//!   `DocumentStore` instances in the process.
//! - Read paths downgrade corruption to "empty"; write paths never do.

mod documents;
mod lock;
mod store;

pub use documents::{
    ArticleDocument, CommentDocument, MovieEntry, MovieListDocument, ProfileDocument,
};
pub use store::DocumentStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;

/// Canonical key field inside every document.
pub const ID_FIELD: &str = "id";

pub type StoreResult<T> = Result<T, StoreError>;

/// A JSON document stored under a canonical string id.
pub trait Document: Serialize + DeserializeOwned + Clone + Debug {
    /// Entity kind used in errors and log events.
    const KIND: &'static str;

    /// Returns the value of the `id` field.
    fn document_id(&self) -> &str;
}

/// Document store error.
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem failure while reading, writing or renaming the store file.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Store file is not a JSON array of objects. Raised on write paths only.
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Input does not have the document shape this store accepts.
    InvalidDocument(String),
    DuplicateId(String),
    NotFound {
        kind: &'static str,
        id: String,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "document store io error at `{}`: {source}", path.display())
            }
            Self::Corrupt { path, source } => {
                write!(f, "document store `{}` is corrupt: {source}", path.display())
            }
            Self::InvalidDocument(message) => write!(f, "invalid document: {message}"),
            Self::DuplicateId(id) => write!(f, "document id already exists: {id}"),
            Self::NotFound { kind, id } => write!(f, "{kind} document not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Corrupt { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl StoreError {
    /// Stable code for log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "store_io",
            Self::Corrupt { .. } => "store_corrupt",
            Self::InvalidDocument(_) => "invalid_document",
            Self::DuplicateId(_) => "duplicate_id",
            Self::NotFound { .. } => "document_not_found",
        }
    }
}
