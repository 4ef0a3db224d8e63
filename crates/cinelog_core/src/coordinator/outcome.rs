use crate::docstore::StoreError;
use crate::model::EntityId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Terminal state of one coordinated create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Row and document were both written.
    Committed,
    /// Document write failed and the row was removed again.
    RolledBack,
    /// Document write failed and removing the row failed too.
    Inconsistent,
}

impl TerminalState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
            Self::Inconsistent => "inconsistent",
        }
    }
}

/// A relational row left behind without its document.
///
/// Requires operator reconciliation; never retried automatically.
#[derive(Debug)]
pub struct Inconsistency {
    pub entity_kind: &'static str,
    pub entity_id: EntityId,
    pub document_id: String,
    /// Why the document write failed.
    pub document_error: StoreError,
    /// Why the compensating delete failed.
    pub compensation_error: RepoError,
}

impl Display for Inconsistency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} has no document `{}` and could not be rolled back ({}; {})",
            self.entity_kind,
            self.entity_id,
            self.document_id,
            self.document_error,
            self.compensation_error
        )
    }
}

/// Result of [`super::DualWriteCoordinator::create`].
#[derive(Debug)]
#[must_use = "an inconsistent create must be surfaced to the caller"]
pub enum CreateOutcome<D> {
    Committed {
        entity_id: EntityId,
        document: D,
    },
    RolledBack {
        entity_id: EntityId,
        cause: StoreError,
    },
    Inconsistent(Inconsistency),
}

impl<D> CreateOutcome<D> {
    pub fn state(&self) -> TerminalState {
        match self {
            Self::Committed { .. } => TerminalState::Committed,
            Self::RolledBack { .. } => TerminalState::RolledBack,
            Self::Inconsistent(_) => TerminalState::Inconsistent,
        }
    }

    /// Id assigned by the relational insert, whatever the terminal state.
    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::Committed { entity_id, .. } | Self::RolledBack { entity_id, .. } => *entity_id,
            Self::Inconsistent(inconsistency) => inconsistency.entity_id,
        }
    }

    /// Converts every non-committed state into a [`DualWriteError`].
    pub fn into_result(self) -> Result<(EntityId, D), DualWriteError> {
        match self {
            Self::Committed {
                entity_id,
                document,
            } => Ok((entity_id, document)),
            Self::RolledBack { entity_id, cause } => {
                Err(DualWriteError::RolledBack { entity_id, cause })
            }
            Self::Inconsistent(inconsistency) => Err(DualWriteError::Inconsistent(inconsistency)),
        }
    }
}

/// Result of a coordinated delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub entity_id: EntityId,
    /// `false` when the document was already absent or its removal failed.
    pub document_removed: bool,
}

/// Failure of a coordinated write.
#[derive(Debug)]
pub enum DualWriteError {
    /// Relational step failed; the document store was not touched.
    Relational(RepoError),
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    /// Create failed and was fully compensated.
    RolledBack {
        entity_id: EntityId,
        cause: StoreError,
    },
    /// Create failed and compensation failed.
    Inconsistent(Inconsistency),
    /// Relational update committed but the document update did not.
    DocumentUpdate {
        entity_id: EntityId,
        cause: StoreError,
    },
}

impl DualWriteError {
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Self::Inconsistent(_))
    }
}

impl Display for DualWriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relational(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::RolledBack { entity_id, cause } => {
                write!(f, "create of {entity_id} rolled back: {cause}")
            }
            Self::Inconsistent(inconsistency) => write!(f, "{inconsistency}"),
            Self::DocumentUpdate { entity_id, cause } => {
                write!(f, "document update for {entity_id} failed: {cause}")
            }
        }
    }
}

impl Error for DualWriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Relational(err) => Some(err),
            Self::RolledBack { cause, .. } | Self::DocumentUpdate { cause, .. } => Some(cause),
            Self::Inconsistent(inconsistency) => Some(&inconsistency.document_error),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<RepoError> for DualWriteError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Relational(other),
        }
    }
}
