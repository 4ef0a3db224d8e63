use crate::coordinator::{DualWriteError, Inconsistency};
use crate::docstore::StoreError;
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Message returned for writes that need manual reconciliation.
pub const RECONCILIATION_MESSAGE: &str =
    "the write left the stores out of sync; administrator attention required";
const INTERNAL_MESSAGE: &str = "internal storage error";

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse failure class a transport layer maps to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Conflict,
    Forbidden,
    Internal,
    /// A create could not be compensated. Alert separately from `Internal`.
    NeedsReconciliation,
}

/// Use-case error returned by the entity services.
#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound { entity: &'static str, id: String },
    BadRequest(String),
    Conflict(String),
    Forbidden(String),
    Relational(RepoError),
    Document(StoreError),
    Inconsistent(Inconsistency),
}

impl ServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => ErrorClass::BadRequest,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Conflict(_) => ErrorClass::Conflict,
            Self::Forbidden(_) => ErrorClass::Forbidden,
            Self::Relational(_) => ErrorClass::Internal,
            Self::Document(err) => match err {
                StoreError::InvalidDocument(_) => ErrorClass::BadRequest,
                StoreError::DuplicateId(_) => ErrorClass::Conflict,
                StoreError::NotFound { .. } => ErrorClass::NotFound,
                StoreError::Io { .. } | StoreError::Corrupt { .. } => ErrorClass::Internal,
            },
            Self::Inconsistent(_) => ErrorClass::NeedsReconciliation,
        }
    }

    /// Message safe to show to an end user.
    pub fn public_message(&self) -> String {
        match self.class() {
            ErrorClass::NeedsReconciliation => RECONCILIATION_MESSAGE.to_string(),
            ErrorClass::Internal => INTERNAL_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::BadRequest(message) | Self::Conflict(message) | Self::Forbidden(message) => {
                write!(f, "{message}")
            }
            Self::Relational(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "{err}"),
            Self::Inconsistent(inconsistency) => write!(f, "{inconsistency}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Relational(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::Inconsistent(inconsistency) => Some(&inconsistency.document_error),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound {
                entity,
                id: id.to_string(),
            },
            RepoError::UniqueViolation(detail) => Self::Conflict(detail),
            RepoError::ForeignKeyViolation(detail) => Self::BadRequest(detail),
            other => Self::Relational(other),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => Self::NotFound { entity: kind, id },
            other => Self::Document(other),
        }
    }
}

impl From<DualWriteError> for ServiceError {
    fn from(value: DualWriteError) -> Self {
        match value {
            DualWriteError::Relational(err) => err.into(),
            DualWriteError::NotFound { entity, id } => Self::NotFound {
                entity,
                id: id.to_string(),
            },
            DualWriteError::RolledBack { cause, .. } => Self::Document(cause),
            DualWriteError::DocumentUpdate { cause, .. } => Self::Document(cause),
            DualWriteError::Inconsistent(inconsistency) => Self::Inconsistent(inconsistency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorClass, ServiceError, RECONCILIATION_MESSAGE};
    use crate::coordinator::Inconsistency;
    use crate::docstore::StoreError;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn constraint_failures_are_client_errors() {
        let conflict: ServiceError = RepoError::UniqueViolation("profiles.username".into()).into();
        assert_eq!(conflict.class(), ErrorClass::Conflict);

        let dangling: ServiceError = RepoError::ForeignKeyViolation("profile_id".into()).into();
        assert_eq!(dangling.class(), ErrorClass::BadRequest);
    }

    #[test]
    fn inconsistency_has_its_own_public_message() {
        let err = ServiceError::Inconsistent(Inconsistency {
            entity_kind: "article",
            entity_id: Uuid::new_v4(),
            document_id: "doc".to_string(),
            document_error: StoreError::InvalidDocument("boom".to_string()),
            compensation_error: RepoError::InvalidData("gone".to_string()),
        });
        let internal = ServiceError::Relational(RepoError::InvalidData("x".to_string()));

        assert_eq!(err.class(), ErrorClass::NeedsReconciliation);
        assert_eq!(err.public_message(), RECONCILIATION_MESSAGE);
        assert_ne!(err.public_message(), internal.public_message());
    }
}
