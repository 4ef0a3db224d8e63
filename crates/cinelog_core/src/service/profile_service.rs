//! Profile use-case service.
//!
//! # Invariants
//! - Usernames and user ids stay unique; checked before any store is touched.
//! - Display fields are mirrored into the profile document on every change.
//! - Deleting a profile removes the documents of the lists and comments the
//!   relational cascade is about to delete.

use crate::coordinator::{DeleteOutcome, DualWriteCoordinator};
use crate::docstore::{CommentDocument, DocumentStore, MovieListDocument, ProfileDocument};
use crate::merge::{MergeReader, Page, ProfileView, Viewer};
use crate::model::profile::{NewProfile, ProfilePatch};
use crate::model::validation::optional_text;
use crate::model::{EntityId, ProfileId};
use crate::repo::profile_repo::{ProfileFilter, ProfileRepository};
use crate::repo::{EntityRepository, PageQuery};
use crate::service::{document_fields, ServiceError, ServiceResult};
use log::warn;
use serde_json::{Map, Value};

const PROFILE_PIC_URL_MAX_CHARS: usize = 255;

/// Update request; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProfile {
    pub patch: ProfilePatch,
    pub profile_pic_url: Option<String>,
}

pub struct ProfileService<R: ProfileRepository> {
    coordinator: DualWriteCoordinator<R, ProfileDocument>,
    list_store: DocumentStore<MovieListDocument>,
    comment_store: DocumentStore<CommentDocument>,
}

impl<R: ProfileRepository> ProfileService<R> {
    pub fn new(
        repo: R,
        store: DocumentStore<ProfileDocument>,
        list_store: DocumentStore<MovieListDocument>,
        comment_store: DocumentStore<CommentDocument>,
    ) -> Self {
        Self {
            coordinator: DualWriteCoordinator::new(repo, store),
            list_store,
            comment_store,
        }
    }

    fn reader(&self) -> MergeReader<'_, R, ProfileDocument> {
        MergeReader::new(self.coordinator.repo(), self.coordinator.store())
    }

    pub fn create_profile(
        &self,
        input: &NewProfile,
        profile_pic_url: Option<String>,
    ) -> ServiceResult<ProfileView> {
        input.validate()?;
        optional_text(
            "profile_pic_url",
            profile_pic_url.as_deref(),
            PROFILE_PIC_URL_MAX_CHARS,
        )?;
        let repo = self.coordinator.repo();
        if repo.find_by_username(&input.username)?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "username already taken: {}",
                input.username
            )));
        }
        if repo.find_by_user_id(input.user_id)?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "user {} already has a profile",
                input.user_id
            )));
        }

        let (profile_id, _) = self
            .coordinator
            .create(input, |id| ProfileDocument {
                id: id.to_string(),
                username: input.username.clone(),
                description: input.description.clone(),
                profile_pic_url,
            })?
            .into_result()?;
        self.get_profile(profile_id)
    }

    pub fn get_profile(&self, id: EntityId) -> ServiceResult<ProfileView> {
        Ok(self.reader().get_one(id, &Viewer::anonymous())?)
    }

    pub fn get_by_username(&self, username: &str) -> ServiceResult<ProfileView> {
        let profile = self
            .coordinator
            .repo()
            .find_by_username(username)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: R::KIND,
                id: username.to_string(),
            })?;
        self.get_profile(profile.profile_id)
    }

    pub fn list_profiles(
        &self,
        filter: &ProfileFilter,
        page: PageQuery,
    ) -> ServiceResult<Page<ProfileView>> {
        Ok(self.reader().get_many(filter, page, &Viewer::anonymous())?)
    }

    /// Updates the profile of `actor`. Profiles are only self-editable.
    pub fn update_profile(
        &self,
        id: EntityId,
        actor: ProfileId,
        request: UpdateProfile,
    ) -> ServiceResult<ProfileView> {
        request.patch.validate()?;
        optional_text(
            "profile_pic_url",
            request.profile_pic_url.as_deref(),
            PROFILE_PIC_URL_MAX_CHARS,
        )?;
        self.ensure_self(id, actor)?;
        if let Some(username) = request.patch.username.as_deref() {
            if let Some(existing) = self.coordinator.repo().find_by_username(username)? {
                if existing.profile_id != id {
                    return Err(ServiceError::Conflict(format!(
                        "username already taken: {username}"
                    )));
                }
            }
        }

        let fields = document_fields([
            ("username", request.patch.username.clone().map(Value::String)),
            (
                "description",
                request.patch.description.clone().map(Value::String),
            ),
            ("profile_pic_url", request.profile_pic_url.map(Value::String)),
        ]);
        self.coordinator.update(id, &request.patch, fields)?;

        if let Some(username) = request.patch.username {
            self.rename_comment_author(id, username);
        }
        self.get_profile(id)
    }

    /// Deletes the profile of `actor` together with its dependent documents.
    pub fn delete_profile(&self, id: EntityId, actor: ProfileId) -> ServiceResult<DeleteOutcome> {
        self.ensure_self(id, actor)?;

        let dependents = self.coordinator.repo().dependent_ids(id)?;
        let list_ids = to_strings(&dependents.movie_list_ids);
        let comment_ids = to_strings(&dependents.comment_ids);
        if let Err(err) = self.list_store.remove_many(&list_ids) {
            warn!(
                "event=dual_write_delete module=service status=dependent_document_error kind=movie_list profile_id={} error_code={}",
                id,
                err.code()
            );
        }
        if let Err(err) = self.comment_store.remove_many(&comment_ids) {
            warn!(
                "event=dual_write_delete module=service status=dependent_document_error kind=comment profile_id={} error_code={}",
                id,
                err.code()
            );
        }

        Ok(self.coordinator.delete(id)?)
    }

    fn rename_comment_author(&self, id: EntityId, username: String) {
        let comment_ids = match self.coordinator.repo().dependent_ids(id) {
            Ok(dependents) => dependents.comment_ids,
            Err(err) => {
                warn!(
                    "event=dual_write_update module=service status=mirror_skipped kind=comment profile_id={} error_code={}",
                    id,
                    err.code()
                );
                return;
            }
        };
        for comment_id in comment_ids {
            let mut fields = Map::new();
            fields.insert("author_username".to_string(), Value::String(username.clone()));
            if let Err(err) = self
                .comment_store
                .update_fields(&comment_id.to_string(), fields)
            {
                warn!(
                    "event=dual_write_update module=service status=mirror_failed kind=comment entity_id={} error_code={}",
                    comment_id,
                    err.code()
                );
            }
        }
    }

    fn ensure_self(&self, id: EntityId, actor: ProfileId) -> ServiceResult<()> {
        if self.coordinator.repo().get(id)?.is_none() {
            return Err(ServiceError::NotFound {
                entity: R::KIND,
                id: id.to_string(),
            });
        }
        if id != actor {
            return Err(ServiceError::Forbidden(format!(
                "profile {actor} cannot modify profile {id}"
            )));
        }
        Ok(())
    }
}

fn to_strings(ids: &[EntityId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}
