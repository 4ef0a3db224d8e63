//! Read path joining relational rows with their documents.
//!
//! # Responsibility
//! - Build the externally visible view of an entity from one row plus
//!   zero or one document.
//!
//! # Invariants
//! - A missing row is `NotFound`; a missing or unreadable document is not an
//!   error and yields defaulted document fields.
//! - List reads scan the document file once per page, never per table.
//! - Field visibility is decided per view type, not all-or-nothing.

mod views;

pub use views::{ArticleView, CommentView, MovieListView, ProfileView};

use crate::docstore::{Document, DocumentStore};
use crate::model::{Entity, EntityId, ProfileId};
use crate::repo::{EntityRepository, PageQuery, RepoError, RepoResult};
use log::debug;
use serde::Serialize;

/// Identity on whose behalf a read runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer {
    pub profile_id: Option<ProfileId>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { profile_id: None }
    }

    pub fn profile(profile_id: ProfileId) -> Self {
        Self {
            profile_id: Some(profile_id),
        }
    }

    pub fn is(&self, profile_id: ProfileId) -> bool {
        self.profile_id == Some(profile_id)
    }
}

/// One page of merged views plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<V> {
    pub items: Vec<V>,
    pub count: u64,
}

/// View built from a row and its optional document.
pub trait MergedView: Sized {
    type Row;
    type Doc;

    fn merge(row: Self::Row, document: Option<Self::Doc>, viewer: &Viewer) -> Self;
}

/// Read-only join over one repository and its document store.
pub struct MergeReader<'a, R, D> {
    repo: &'a R,
    store: &'a DocumentStore<D>,
}

impl<'a, R, D> MergeReader<'a, R, D>
where
    R: EntityRepository,
    D: Document,
{
    pub fn new(repo: &'a R, store: &'a DocumentStore<D>) -> Self {
        Self { repo, store }
    }

    /// Loads one row and merges its document into view `V`.
    pub fn get_one<V>(&self, id: EntityId, viewer: &Viewer) -> RepoResult<V>
    where
        V: MergedView<Row = R::Entity, Doc = D>,
    {
        let row = self.repo.get(id)?.ok_or(RepoError::NotFound {
            entity: R::KIND,
            id,
        })?;
        let document = self.store.get_by_id(&id.to_string());
        if document.is_none() {
            debug!(
                "event=merge_read module=merge status=document_missing kind={} entity_id={}",
                R::KIND,
                id
            );
        }
        Ok(V::merge(row, document, viewer))
    }

    /// Lists one page of rows and merges their documents.
    pub fn get_many<V>(
        &self,
        filter: &R::Filter,
        page: PageQuery,
        viewer: &Viewer,
    ) -> RepoResult<Page<V>>
    where
        V: MergedView<Row = R::Entity, Doc = D>,
    {
        let rows = self.repo.list(filter, page)?;
        let count = self.repo.count(filter)?;
        let ids: Vec<String> = rows.iter().map(|row| row.entity_id().to_string()).collect();
        let mut documents = if ids.is_empty() {
            Default::default()
        } else {
            self.store.get_many(&ids)
        };

        let missing = ids.len().saturating_sub(documents.len());
        if missing > 0 {
            debug!(
                "event=merge_read module=merge status=documents_missing kind={} missing={}",
                R::KIND,
                missing
            );
        }

        let items = rows
            .into_iter()
            .zip(ids)
            .map(|(row, id)| {
                let document = documents.remove(&id);
                V::merge(row, document, viewer)
            })
            .collect();
        Ok(Page { items, count })
    }
}
