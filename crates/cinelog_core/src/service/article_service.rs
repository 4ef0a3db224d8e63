//! Article use-case service.
//!
//! # Responsibility
//! - Enforce title uniqueness and authorship around coordinated writes.
//! - Return merged article views.
//!
//! # Invariants
//! - Only a linked author may update, delete, or add co-authors.
//! - Body changes go to the document; metadata changes go to the row.

use crate::coordinator::{DeleteOutcome, DualWriteCoordinator};
use crate::docstore::{ArticleDocument, DocumentStore};
use crate::merge::{ArticleView, MergeReader, Page, Viewer};
use crate::model::article::{ArticlePatch, NewArticle};
use crate::model::{EntityId, ProfileId};
use crate::repo::article_repo::{ArticleFilter, ArticleRepository};
use crate::repo::{EntityRepository, PageQuery};
use crate::service::{document_fields, ServiceError, ServiceResult};
use serde_json::Value;

/// Create request: relational metadata plus document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArticle {
    pub article: NewArticle,
    pub content: String,
    pub image_rel_url: Option<String>,
}

/// Update request; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateArticle {
    pub patch: ArticlePatch,
    pub content: Option<String>,
    pub image_rel_url: Option<String>,
}

pub struct ArticleService<R: ArticleRepository> {
    coordinator: DualWriteCoordinator<R, ArticleDocument>,
}

impl<R: ArticleRepository> ArticleService<R> {
    pub fn new(repo: R, store: DocumentStore<ArticleDocument>) -> Self {
        Self {
            coordinator: DualWriteCoordinator::new(repo, store),
        }
    }

    fn reader(&self) -> MergeReader<'_, R, ArticleDocument> {
        MergeReader::new(self.coordinator.repo(), self.coordinator.store())
    }

    /// Creates an article, its author link, and its body document.
    pub fn create_article(&self, request: CreateArticle) -> ServiceResult<ArticleView> {
        let CreateArticle {
            article,
            content,
            image_rel_url,
        } = request;
        article.validate()?;
        if self
            .coordinator
            .repo()
            .find_by_title(&article.article_title)?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "article title already exists: {}",
                article.article_title
            )));
        }

        let (article_id, _) = self
            .coordinator
            .create(&article, |id| ArticleDocument::new(id, content, image_rel_url))?
            .into_result()?;
        self.get_article(article_id)
    }

    pub fn get_article(&self, id: EntityId) -> ServiceResult<ArticleView> {
        Ok(self.reader().get_one(id, &Viewer::anonymous())?)
    }

    pub fn list_articles(
        &self,
        filter: &ArticleFilter,
        page: PageQuery,
    ) -> ServiceResult<Page<ArticleView>> {
        Ok(self.reader().get_many(filter, page, &Viewer::anonymous())?)
    }

    /// Updates metadata and/or body on behalf of `editor`.
    pub fn update_article(
        &self,
        id: EntityId,
        editor: ProfileId,
        request: UpdateArticle,
    ) -> ServiceResult<ArticleView> {
        request.patch.validate()?;
        self.ensure_author(id, editor)?;
        if let Some(title) = request.patch.article_title.as_deref() {
            if let Some(existing) = self.coordinator.repo().find_by_title(title)? {
                if existing.article_id != id {
                    return Err(ServiceError::Conflict(format!(
                        "article title already exists: {title}"
                    )));
                }
            }
        }

        let fields = document_fields([
            ("content", request.content.map(Value::String)),
            ("image_rel_url", request.image_rel_url.map(Value::String)),
        ]);
        self.coordinator.update(id, &request.patch, fields)?;
        self.get_article(id)
    }

    pub fn delete_article(&self, id: EntityId, editor: ProfileId) -> ServiceResult<DeleteOutcome> {
        self.ensure_author(id, editor)?;
        Ok(self.coordinator.delete(id)?)
    }

    /// Links `co_author` to the article. `editor` must already be an author.
    pub fn add_co_author(
        &self,
        id: EntityId,
        editor: ProfileId,
        co_author: ProfileId,
    ) -> ServiceResult<()> {
        self.ensure_author(id, editor)?;
        if self.coordinator.repo().is_author(id, co_author)? {
            return Ok(());
        }
        Ok(self.coordinator.repo().add_author(id, co_author)?)
    }

    fn ensure_author(&self, id: EntityId, profile_id: ProfileId) -> ServiceResult<()> {
        let repo = self.coordinator.repo();
        if repo.get(id)?.is_none() {
            return Err(ServiceError::NotFound {
                entity: R::KIND,
                id: id.to_string(),
            });
        }
        if !repo.is_author(id, profile_id)? {
            return Err(ServiceError::Forbidden(format!(
                "profile {profile_id} is not an author of article {id}"
            )));
        }
        Ok(())
    }
}
