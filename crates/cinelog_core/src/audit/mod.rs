//! Cross-store consistency audit.
//!
//! # Responsibility
//! - Find rows without a document and documents without a row, per entity
//!   kind.
//! - Optionally prune orphan documents. Rows are never deleted here.

use crate::docstore::{Document, DocumentStore};
use crate::model::EntityId;
use crate::repo::article_repo::SqliteArticleRepository;
use crate::repo::comment_repo::SqliteCommentRepository;
use crate::repo::movie_list_repo::SqliteMovieListRepository;
use crate::repo::profile_repo::SqliteProfileRepository;
use crate::repo::EntityRepository;
use crate::service::ServiceResult;
use crate::storage::Platform;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;

/// Audit findings for one entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub kind: &'static str,
    /// Rows with no document, e.g. left by an inconsistent create.
    pub missing_documents: Vec<EntityId>,
    /// Documents whose id matches no row.
    pub orphan_documents: Vec<String>,
    pub pruned: usize,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_documents.is_empty() && self.orphan_documents.is_empty()
    }
}

/// Compares row ids of `repo` with document ids of `store`.
pub fn audit<R, D>(repo: &R, store: &DocumentStore<D>) -> ServiceResult<AuditReport>
where
    R: EntityRepository,
    D: Document,
{
    let row_ids = repo.all_ids()?;
    let document_ids: HashSet<String> = store.ids().into_iter().collect();
    let row_keys: HashSet<String> = row_ids.iter().map(ToString::to_string).collect();

    let missing_documents = row_ids
        .into_iter()
        .filter(|id| !document_ids.contains(&id.to_string()))
        .collect::<Vec<_>>();
    let mut orphan_documents = document_ids
        .into_iter()
        .filter(|id| !row_keys.contains(id))
        .collect::<Vec<_>>();
    orphan_documents.sort();

    Ok(AuditReport {
        kind: R::KIND,
        missing_documents,
        orphan_documents,
        pruned: 0,
    })
}

/// Removes the orphan documents listed in `report`.
pub fn prune_orphans<D: Document>(
    store: &DocumentStore<D>,
    report: &mut AuditReport,
) -> ServiceResult<usize> {
    if report.orphan_documents.is_empty() {
        return Ok(0);
    }
    let pruned = store.remove_many(&report.orphan_documents)?;
    report.pruned = pruned;
    Ok(pruned)
}

/// Audits every entity kind of `platform`, pruning orphans when asked.
pub fn run(platform: &Platform, prune: bool) -> ServiceResult<Vec<AuditReport>> {
    let conn = platform.connection();
    let stores = platform.stores();

    let mut reports = vec![
        audit_kind(&SqliteProfileRepository::try_new(conn)?, &stores.profiles, prune)?,
        audit_kind(&SqliteArticleRepository::try_new(conn)?, &stores.articles, prune)?,
        audit_kind(
            &SqliteMovieListRepository::try_new(conn)?,
            &stores.movie_lists,
            prune,
        )?,
        audit_kind(&SqliteCommentRepository::try_new(conn)?, &stores.comments, prune)?,
    ];
    reports.sort_by_key(|report| report.kind);
    Ok(reports)
}

fn audit_kind<R, D>(repo: &R, store: &DocumentStore<D>, prune: bool) -> ServiceResult<AuditReport>
where
    R: EntityRepository,
    D: Document,
{
    let mut report = audit(repo, store)?;
    if prune {
        prune_orphans(store, &mut report)?;
    }

    if report.is_consistent() {
        info!(
            "event=audit_run module=audit status=ok kind={}",
            report.kind
        );
    } else {
        warn!(
            "event=audit_run module=audit status=drift kind={} missing_documents={} orphan_documents={} pruned={}",
            report.kind,
            report.missing_documents.len(),
            report.orphan_documents.len(),
            report.pruned
        );
    }
    Ok(report)
}
