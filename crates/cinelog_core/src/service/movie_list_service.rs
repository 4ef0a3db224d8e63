//! Movie list use-case service.
//!
//! # Invariants
//! - Only the owner may update, delete, or change the movies of a list.
//! - Private lists never expose their movies to other viewers, and only
//!   their owner may like them.

use crate::coordinator::{DeleteOutcome, DualWriteCoordinator};
use crate::docstore::{DocumentStore, MovieListDocument, StoreError};
use crate::merge::{MergeReader, MovieListView, Page, Viewer};
use crate::model::movie_list::{MovieList, MovieListPatch, NewMovieList};
use crate::model::validation::require_text;
use crate::model::{EntityId, ProfileId};
use crate::repo::movie_list_repo::{MovieListFilter, MovieListRepository};
use crate::repo::{EntityRepository, PageQuery};
use crate::service::{ServiceError, ServiceResult};
use log::warn;
use serde_json::Map;

const MOVIE_ID_MAX_CHARS: usize = 64;

pub struct MovieListService<R: MovieListRepository> {
    coordinator: DualWriteCoordinator<R, MovieListDocument>,
}

impl<R: MovieListRepository> MovieListService<R> {
    pub fn new(repo: R, store: DocumentStore<MovieListDocument>) -> Self {
        Self {
            coordinator: DualWriteCoordinator::new(repo, store),
        }
    }

    fn reader(&self) -> MergeReader<'_, R, MovieListDocument> {
        MergeReader::new(self.coordinator.repo(), self.coordinator.store())
    }

    /// Creates a list with an empty movie document.
    pub fn create_list(&self, input: &NewMovieList) -> ServiceResult<MovieListView> {
        input.validate()?;
        let owner = input.profile_id;
        let (list_id, _) = self
            .coordinator
            .create(input, |id| MovieListDocument::empty(id, owner))?
            .into_result()?;
        self.get_list(list_id, &Viewer::profile(owner))
    }

    pub fn get_list(&self, id: EntityId, viewer: &Viewer) -> ServiceResult<MovieListView> {
        Ok(self.reader().get_one(id, viewer)?)
    }

    /// Public lists of every profile.
    pub fn list_public(
        &self,
        page: PageQuery,
        viewer: &Viewer,
    ) -> ServiceResult<Page<MovieListView>> {
        Ok(self
            .reader()
            .get_many(&MovieListFilter::default(), page, viewer)?)
    }

    /// Lists of one profile; private ones only when the owner asks.
    pub fn list_for_profile(
        &self,
        profile_id: ProfileId,
        page: PageQuery,
        viewer: &Viewer,
    ) -> ServiceResult<Page<MovieListView>> {
        let filter = MovieListFilter {
            profile_id: Some(profile_id),
            include_private: viewer.is(profile_id),
        };
        Ok(self.reader().get_many(&filter, page, viewer)?)
    }

    pub fn update_list(
        &self,
        id: EntityId,
        actor: ProfileId,
        patch: &MovieListPatch,
    ) -> ServiceResult<MovieListView> {
        patch.validate()?;
        self.owned_list(id, actor)?;
        self.coordinator.update(id, patch, Map::new())?;
        self.get_list(id, &Viewer::profile(actor))
    }

    pub fn delete_list(&self, id: EntityId, actor: ProfileId) -> ServiceResult<DeleteOutcome> {
        self.owned_list(id, actor)?;
        Ok(self.coordinator.delete(id)?)
    }

    /// Adds a movie. Returns `false` when the list already contains it.
    ///
    /// Recreates the list document first when only the row exists.
    pub fn add_movie(&self, id: EntityId, actor: ProfileId, movie_id: &str) -> ServiceResult<bool> {
        require_text("movie_id", movie_id, MOVIE_ID_MAX_CHARS)?;
        let list = self.owned_list(id, actor)?;
        let store = self.coordinator.store();
        let list_id = id.to_string();

        match store.add_movie(&list_id, movie_id) {
            Err(StoreError::NotFound { .. }) => {
                self.heal_document(&list)?;
                Ok(store.add_movie(&list_id, movie_id)?)
            }
            other => Ok(other?),
        }
    }

    /// Removes a movie. Returns `false` when it was not in the list.
    pub fn remove_movie(
        &self,
        id: EntityId,
        actor: ProfileId,
        movie_id: &str,
    ) -> ServiceResult<bool> {
        self.owned_list(id, actor)?;
        match self.coordinator.store().remove_movie(&id.to_string(), movie_id) {
            Err(StoreError::NotFound { .. }) => Ok(false),
            other => Ok(other?),
        }
    }

    /// Likes a list on behalf of `actor`. Returns `false` if already liked.
    ///
    /// Private lists can only be liked by their owner.
    pub fn like_list(&self, id: EntityId, actor: ProfileId) -> ServiceResult<bool> {
        let list = self.visible_list(id, actor)?;
        let store = self.coordinator.store();
        let list_id = id.to_string();
        let liker = actor.to_string();

        match store.add_like(&list_id, &liker) {
            Err(StoreError::NotFound { .. }) => {
                self.heal_document(&list)?;
                Ok(store.add_like(&list_id, &liker)?)
            }
            other => Ok(other?),
        }
    }

    /// Withdraws a like. Returns `false` when `actor` had not liked the list.
    pub fn unlike_list(&self, id: EntityId, actor: ProfileId) -> ServiceResult<bool> {
        self.visible_list(id, actor)?;
        match self
            .coordinator
            .store()
            .remove_like(&id.to_string(), &actor.to_string())
        {
            Err(StoreError::NotFound { .. }) => Ok(false),
            other => Ok(other?),
        }
    }

    /// Recreates an empty document for a row whose document is missing.
    fn heal_document(&self, list: &MovieList) -> ServiceResult<()> {
        warn!(
            "event=doc_store_heal module=service status=start kind=movie_list entity_id={}",
            list.list_id
        );
        match self
            .coordinator
            .store()
            .add(&MovieListDocument::empty(list.list_id, list.profile_id))
        {
            Ok(_) | Err(StoreError::DuplicateId(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn visible_list(&self, id: EntityId, actor: ProfileId) -> ServiceResult<MovieList> {
        let list = self.list_row(id)?;
        if list.is_private && list.profile_id != actor {
            return Err(ServiceError::Forbidden(format!(
                "movie list {id} is private"
            )));
        }
        Ok(list)
    }

    fn list_row(&self, id: EntityId) -> ServiceResult<MovieList> {
        self.coordinator
            .repo()
            .get(id)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: R::KIND,
                id: id.to_string(),
            })
    }

    fn owned_list(&self, id: EntityId, actor: ProfileId) -> ServiceResult<MovieList> {
        let list = self.list_row(id)?;
        if list.profile_id != actor {
            return Err(ServiceError::Forbidden(format!(
                "profile {actor} does not own movie list {id}"
            )));
        }
        Ok(list)
    }
}
