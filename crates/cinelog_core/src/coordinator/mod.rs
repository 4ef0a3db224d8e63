//! Dual-write coordination between the relational store and a document store.
//!
//! # Responsibility
//! - Sequence the relational step and the document step of each write.
//! - Compensate a failed create by deleting the freshly inserted row.
//!
//! # Invariants
//! - Create: row first, then document. A create ends in exactly one
//!   [`TerminalState`]; `Inconsistent` is never folded into a generic error.
//! - Update: a failed document update does not roll back the row.
//! - Delete: document removal is best-effort and runs before the row delete.
//! - Every operation runs to its terminal state on the calling thread.

mod outcome;

pub use outcome::{
    CreateOutcome, DeleteOutcome, DualWriteError, Inconsistency, TerminalState,
};

use crate::docstore::{Document, DocumentStore, StoreError};
use crate::model::{Entity, EntityId};
use crate::repo::{EntityRepository, RepoResult};
use log::{error, info, warn};
use serde_json::{Map, Value};

/// Coordinates writes for one entity kind.
pub struct DualWriteCoordinator<R, D> {
    repo: R,
    store: DocumentStore<D>,
}

impl<R, D> DualWriteCoordinator<R, D>
where
    R: EntityRepository,
    D: Document,
{
    pub fn new(repo: R, store: DocumentStore<D>) -> Self {
        Self { repo, store }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn store(&self) -> &DocumentStore<D> {
        &self.store
    }

    /// Inserts the row, then the document built from the assigned id.
    ///
    /// # Errors
    /// - Returns the relational error when the row insert itself fails; no
    ///   document is written in that case.
    ///
    /// Document failures are reported through the returned outcome.
    pub fn create<F>(&self, input: &R::Create, build: F) -> RepoResult<CreateOutcome<D>>
    where
        F: FnOnce(EntityId) -> D,
    {
        let entity_id = match self.repo.create(input) {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    "event=dual_write_create module=coordinator status=relational_error kind={} error_code={}",
                    R::KIND,
                    err.code()
                );
                return Err(err);
            }
        };

        let document = build(entity_id);
        let document_id = entity_id.to_string();
        let written = if document.document_id() == document_id {
            self.store.add(&document).map(|_| ())
        } else {
            Err(StoreError::InvalidDocument(format!(
                "document id `{}` does not match {} id `{document_id}`",
                document.document_id(),
                R::KIND
            )))
        };

        let document_error = match written {
            Ok(()) => {
                info!(
                    "event=dual_write_create module=coordinator status=committed kind={} entity_id={}",
                    R::KIND,
                    entity_id
                );
                return Ok(CreateOutcome::Committed {
                    entity_id,
                    document,
                });
            }
            Err(err) => err,
        };

        // A row that is already gone counts as compensated.
        match self.repo.delete(entity_id) {
            Ok(_) => {
                warn!(
                    "event=dual_write_create module=coordinator status=rolled_back kind={} entity_id={} error_code={}",
                    R::KIND,
                    entity_id,
                    document_error.code()
                );
                Ok(CreateOutcome::RolledBack {
                    entity_id,
                    cause: document_error,
                })
            }
            Err(compensation_error) => {
                error!(
                    "event=dual_write_create module=coordinator status=inconsistent kind={} entity_id={} document_id={} error_code={} compensation_error_code={}",
                    R::KIND,
                    entity_id,
                    document_id,
                    document_error.code(),
                    compensation_error.code()
                );
                Ok(CreateOutcome::Inconsistent(Inconsistency {
                    entity_kind: R::KIND,
                    entity_id,
                    document_id,
                    document_error,
                    compensation_error,
                }))
            }
        }
    }

    /// Updates the row, then shallow-merges `document_fields` into the
    /// document when there are any.
    ///
    /// # Errors
    /// - [`DualWriteError::NotFound`] / [`DualWriteError::Relational`] when
    ///   the row update fails; the document is untouched.
    /// - [`DualWriteError::DocumentUpdate`] when the row was updated but the
    ///   document was missing or could not be written.
    pub fn update(
        &self,
        id: EntityId,
        patch: &R::Patch,
        document_fields: Map<String, Value>,
    ) -> Result<R::Entity, DualWriteError> {
        let entity = self.repo.update(id, patch)?;
        if document_fields.is_empty() {
            info!(
                "event=dual_write_update module=coordinator status=ok kind={} entity_id={} document=skipped",
                R::KIND,
                id
            );
            return Ok(entity);
        }

        let document_id = entity.entity_id().to_string();
        let cause = match self.store.update_fields(&document_id, document_fields) {
            Ok(true) => {
                info!(
                    "event=dual_write_update module=coordinator status=ok kind={} entity_id={}",
                    R::KIND,
                    id
                );
                return Ok(entity);
            }
            Ok(false) => StoreError::NotFound {
                kind: D::KIND,
                id: document_id,
            },
            Err(err) => err,
        };

        error!(
            "event=dual_write_update module=coordinator status=document_error kind={} entity_id={} error_code={}",
            R::KIND,
            id,
            cause.code()
        );
        Err(DualWriteError::DocumentUpdate {
            entity_id: id,
            cause,
        })
    }

    /// Removes the document, then the row and its dependent rows.
    ///
    /// # Errors
    /// - [`DualWriteError::NotFound`] when the row does not exist.
    /// - [`DualWriteError::Relational`] when the row delete fails.
    pub fn delete(&self, id: EntityId) -> Result<DeleteOutcome, DualWriteError> {
        if self.repo.get(id)?.is_none() {
            return Err(DualWriteError::NotFound {
                entity: R::KIND,
                id,
            });
        }

        let document_removed = match self.store.remove(&id.to_string()) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(
                    "event=dual_write_delete module=coordinator status=document_error kind={} entity_id={} error_code={}",
                    R::KIND,
                    id,
                    err.code()
                );
                false
            }
        };

        if !self.repo.delete(id)? {
            return Err(DualWriteError::NotFound {
                entity: R::KIND,
                id,
            });
        }

        info!(
            "event=dual_write_delete module=coordinator status=ok kind={} entity_id={} document_removed={}",
            R::KIND,
            id,
            document_removed
        );
        Ok(DeleteOutcome {
            entity_id: id,
            document_removed,
        })
    }
}
