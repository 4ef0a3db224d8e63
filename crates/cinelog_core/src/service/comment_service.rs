//! Comment use-case service.
//!
//! # Invariants
//! - Only the author may edit or delete a comment.
//! - `like_by` holds each profile at most once.

use crate::coordinator::{DeleteOutcome, DualWriteCoordinator};
use crate::docstore::{CommentDocument, DocumentStore, StoreError};
use crate::merge::{CommentView, MergeReader, Page, Viewer};
use crate::model::comment::{Comment, CommentPatch, NewComment};
use crate::model::{EntityId, ProfileId};
use crate::repo::comment_repo::{CommentFilter, CommentRepository};
use crate::repo::profile_repo::ProfileRepository;
use crate::repo::{EntityRepository, PageQuery};
use crate::service::{ServiceError, ServiceResult};
use log::warn;
use serde_json::Map;

pub struct CommentService<R: CommentRepository, P: ProfileRepository> {
    coordinator: DualWriteCoordinator<R, CommentDocument>,
    profiles: P,
}

impl<R: CommentRepository, P: ProfileRepository> CommentService<R, P> {
    pub fn new(repo: R, profiles: P, store: DocumentStore<CommentDocument>) -> Self {
        Self {
            coordinator: DualWriteCoordinator::new(repo, store),
            profiles,
        }
    }

    fn reader(&self) -> MergeReader<'_, R, CommentDocument> {
        MergeReader::new(self.coordinator.repo(), self.coordinator.store())
    }

    pub fn create_comment(&self, input: &NewComment) -> ServiceResult<CommentView> {
        input.validate()?;
        let author = self.author_username(input.profile_id)?;
        let (comment_id, _) = self
            .coordinator
            .create(input, |id| CommentDocument::new(id, author))?
            .into_result()?;
        self.get_comment(comment_id)
    }

    pub fn get_comment(&self, id: EntityId) -> ServiceResult<CommentView> {
        Ok(self.reader().get_one(id, &Viewer::anonymous())?)
    }

    pub fn list_comments(
        &self,
        filter: &CommentFilter,
        page: PageQuery,
    ) -> ServiceResult<Page<CommentView>> {
        Ok(self.reader().get_many(filter, page, &Viewer::anonymous())?)
    }

    pub fn update_comment(
        &self,
        id: EntityId,
        actor: ProfileId,
        patch: &CommentPatch,
    ) -> ServiceResult<CommentView> {
        patch.validate()?;
        self.authored_comment(id, actor)?;
        self.coordinator.update(id, patch, Map::new())?;
        self.get_comment(id)
    }

    pub fn delete_comment(&self, id: EntityId, actor: ProfileId) -> ServiceResult<DeleteOutcome> {
        self.authored_comment(id, actor)?;
        Ok(self.coordinator.delete(id)?)
    }

    /// Records a like. Returns `false` when `actor` already liked it.
    pub fn like(&self, id: EntityId, actor: ProfileId) -> ServiceResult<bool> {
        let comment = self.comment(id)?;
        let store = self.coordinator.store();
        let comment_id = id.to_string();
        let liker = actor.to_string();

        match store.add_like(&comment_id, &liker) {
            Err(StoreError::NotFound { .. }) => {
                warn!(
                    "event=doc_store_heal module=service status=start kind=comment entity_id={}",
                    id
                );
                let author = self.author_username(comment.profile_id)?;
                match store.add(&CommentDocument::new(id, author)) {
                    Ok(_) | Err(StoreError::DuplicateId(_)) => {}
                    Err(err) => return Err(err.into()),
                }
                Ok(store.add_like(&comment_id, &liker)?)
            }
            other => Ok(other?),
        }
    }

    /// Withdraws a like. Returns `false` when `actor` had not liked it.
    pub fn unlike(&self, id: EntityId, actor: ProfileId) -> ServiceResult<bool> {
        self.comment(id)?;
        match self
            .coordinator
            .store()
            .remove_like(&id.to_string(), &actor.to_string())
        {
            Err(StoreError::NotFound { .. }) => Ok(false),
            other => Ok(other?),
        }
    }

    fn author_username(&self, profile_id: ProfileId) -> ServiceResult<String> {
        self.profiles
            .get(profile_id)?
            .map(|profile| profile.username)
            .ok_or_else(|| ServiceError::BadRequest(format!("profile {profile_id} does not exist")))
    }

    fn comment(&self, id: EntityId) -> ServiceResult<Comment> {
        self.coordinator
            .repo()
            .get(id)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: R::KIND,
                id: id.to_string(),
            })
    }

    fn authored_comment(&self, id: EntityId, actor: ProfileId) -> ServiceResult<Comment> {
        let comment = self.comment(id)?;
        if comment.profile_id != actor {
            return Err(ServiceError::Forbidden(format!(
                "profile {actor} is not the author of comment {id}"
            )));
        }
        Ok(comment)
    }
}
