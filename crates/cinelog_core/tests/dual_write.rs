use cinelog_core::coordinator::{
    CreateOutcome, DualWriteCoordinator, DualWriteError, TerminalState,
};
use cinelog_core::db::open_db_in_memory;
use cinelog_core::docstore::{ArticleDocument, DocumentStore, StoreError};
use cinelog_core::model::article::{ArticlePatch, NewArticle};
use cinelog_core::model::profile::NewProfile;
use cinelog_core::repo::article_repo::SqliteArticleRepository;
use cinelog_core::repo::profile_repo::SqliteProfileRepository;
use cinelog_core::{EntityId, EntityRepository, PageQuery, RepoError, RepoResult};
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

/// Delegates everything except `delete`, which always fails.
struct FailingDelete<R>(R);

/// Deletes the row, then reports it as already gone.
struct AlreadyGone<R>(R);

macro_rules! delegate_repository {
    ($wrapper:ident, |$this:ident, $id:ident| $delete:expr) => {
        impl<R: EntityRepository> EntityRepository for $wrapper<R> {
            type Entity = R::Entity;
            type Create = R::Create;
            type Patch = R::Patch;
            type Filter = R::Filter;

            const KIND: &'static str = R::KIND;

            fn create(&self, input: &Self::Create) -> RepoResult<EntityId> {
                self.0.create(input)
            }
            fn get(&self, id: EntityId) -> RepoResult<Option<Self::Entity>> {
                self.0.get(id)
            }
            fn update(&self, id: EntityId, patch: &Self::Patch) -> RepoResult<Self::Entity> {
                self.0.update(id, patch)
            }
            fn delete(&self, id: EntityId) -> RepoResult<bool> {
                let $this = self;
                let $id = id;
                $delete
            }
            fn list(
                &self,
                filter: &Self::Filter,
                page: PageQuery,
            ) -> RepoResult<Vec<Self::Entity>> {
                self.0.list(filter, page)
            }
            fn count(&self, filter: &Self::Filter) -> RepoResult<u64> {
                self.0.count(filter)
            }
            fn all_ids(&self) -> RepoResult<Vec<EntityId>> {
                self.0.all_ids()
            }
        }
    };
}

delegate_repository!(FailingDelete, |_this, _id| Err(RepoError::InvalidData(
    "delete disabled for test".to_string()
)));
delegate_repository!(AlreadyGone, |this, id| {
    this.0.delete(id)?;
    this.0.delete(id)
});

fn setup() -> (Connection, TempDir, Uuid) {
    let conn = open_db_in_memory().unwrap();
    let author = SqliteProfileRepository::try_new(&conn)
        .unwrap()
        .create(&NewProfile::new(Uuid::new_v4(), "author"))
        .unwrap();
    (conn, tempfile::tempdir().unwrap(), author)
}

fn article_store(dir: &TempDir) -> DocumentStore<ArticleDocument> {
    DocumentStore::open(dir.path().join("storage_article.json")).unwrap()
}

fn corrupt(path: &Path) {
    std::fs::write(path, "not json at all").unwrap();
}

fn new_article(title: &str, author: Uuid) -> NewArticle {
    NewArticle {
        article_title: title.to_string(),
        movie_ref_id: None,
        section_id: 3,
        newsletter_id: None,
        author_profile_id: author,
    }
}

fn body(id: EntityId) -> ArticleDocument {
    ArticleDocument::new(id, "<p>hi</p>", Some("img/a.png".to_string()))
}

fn content_field(content: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("content".to_string(), json!(content));
    fields
}

#[test]
fn create_commits_row_and_document() {
    let (conn, dir, author) = setup();
    let coordinator =
        DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), article_store(&dir));

    let outcome = coordinator
        .create(&new_article("Committed", author), body)
        .unwrap();
    assert_eq!(outcome.state(), TerminalState::Committed);
    let (id, document) = outcome.into_result().unwrap();

    assert!(coordinator.repo().get(id).unwrap().is_some());
    assert_eq!(coordinator.store().get_by_id(&id.to_string()), Some(document));
}

#[test]
fn document_failure_rolls_back_the_row() {
    let (conn, dir, author) = setup();
    let store = article_store(&dir);
    corrupt(store.path());
    let coordinator = DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), store);

    let outcome = coordinator
        .create(&new_article("Rolled back", author), body)
        .unwrap();

    let id = outcome.entity_id();
    assert!(matches!(
        outcome,
        CreateOutcome::RolledBack {
            cause: StoreError::Corrupt { .. },
            ..
        }
    ));
    assert!(coordinator.repo().get(id).unwrap().is_none());
}

#[test]
fn mismatched_document_id_counts_as_document_failure() {
    let (conn, dir, author) = setup();
    let coordinator =
        DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), article_store(&dir));

    let outcome = coordinator
        .create(&new_article("Wrong id", author), |_| body(Uuid::new_v4()))
        .unwrap();

    assert_eq!(outcome.state(), TerminalState::RolledBack);
    assert!(coordinator.repo().get(outcome.entity_id()).unwrap().is_none());
    assert!(coordinator.store().get_all().is_empty());
}

#[test]
fn failed_compensation_is_reported_as_inconsistent() {
    let (conn, dir, author) = setup();
    let store = article_store(&dir);
    corrupt(store.path());
    let coordinator = DualWriteCoordinator::new(
        FailingDelete(SqliteArticleRepository::try_new(&conn).unwrap()),
        store,
    );

    let outcome = coordinator
        .create(&new_article("Stuck", author), body)
        .unwrap();
    assert_eq!(outcome.state(), TerminalState::Inconsistent);

    let err = outcome.into_result().unwrap_err();
    assert!(err.is_inconsistent());
    let DualWriteError::Inconsistent(inconsistency) = err else {
        panic!("expected inconsistent outcome");
    };
    assert_eq!(inconsistency.entity_kind, "article");
    assert_eq!(inconsistency.document_id, inconsistency.entity_id.to_string());
    assert!(coordinator
        .repo()
        .get(inconsistency.entity_id)
        .unwrap()
        .is_some());
}

#[test]
fn compensation_tolerates_row_already_gone() {
    let (conn, dir, author) = setup();
    let store = article_store(&dir);
    corrupt(store.path());
    let coordinator = DualWriteCoordinator::new(
        AlreadyGone(SqliteArticleRepository::try_new(&conn).unwrap()),
        store,
    );

    let outcome = coordinator
        .create(&new_article("Gone twice", author), body)
        .unwrap();
    assert_eq!(outcome.state(), TerminalState::RolledBack);
}

#[test]
fn relational_failure_leaves_document_store_untouched() {
    let (conn, dir, _) = setup();
    let coordinator =
        DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), article_store(&dir));

    let err = coordinator
        .create(&new_article("No author", Uuid::new_v4()), body)
        .unwrap_err();
    assert!(matches!(err, RepoError::ForeignKeyViolation(_)));
    assert!(coordinator.store().get_all().is_empty());
}

#[test]
fn document_update_failure_keeps_relational_update() {
    let (conn, dir, author) = setup();
    let coordinator =
        DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), article_store(&dir));
    let (id, _) = coordinator
        .create(&new_article("Asymmetric", author), body)
        .unwrap()
        .into_result()
        .unwrap();
    coordinator.store().remove(&id.to_string()).unwrap();

    let patch = ArticlePatch {
        article_title: Some("Asymmetric v2".to_string()),
        ..ArticlePatch::default()
    };
    let err = coordinator
        .update(id, &patch, content_field("<p>v2</p>"))
        .unwrap_err();
    assert!(matches!(
        err,
        DualWriteError::DocumentUpdate {
            cause: StoreError::NotFound { .. },
            ..
        }
    ));
    assert_eq!(
        coordinator.repo().get(id).unwrap().unwrap().article_title,
        "Asymmetric v2"
    );
}

#[test]
fn update_writes_both_stores() {
    let (conn, dir, author) = setup();
    let coordinator =
        DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), article_store(&dir));
    let (id, _) = coordinator
        .create(&new_article("Both", author), body)
        .unwrap()
        .into_result()
        .unwrap();

    let patch = ArticlePatch {
        section_id: Some(9),
        ..ArticlePatch::default()
    };
    let row = coordinator
        .update(id, &patch, content_field("<p>v2</p>"))
        .unwrap();
    assert_eq!(row.section_id, 9);
    assert_eq!(
        coordinator.store().get_by_id(&id.to_string()).unwrap().content,
        "<p>v2</p>"
    );

    let missing = coordinator
        .update(Uuid::new_v4(), &patch, Map::new())
        .unwrap_err();
    assert!(matches!(missing, DualWriteError::NotFound { .. }));
}

#[test]
fn delete_removes_document_then_row() {
    let (conn, dir, author) = setup();
    let coordinator =
        DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), article_store(&dir));
    let (id, _) = coordinator
        .create(&new_article("Doomed", author), body)
        .unwrap()
        .into_result()
        .unwrap();

    let outcome = coordinator.delete(id).unwrap();
    assert!(outcome.document_removed);
    assert!(coordinator.repo().get(id).unwrap().is_none());
    assert!(coordinator.store().get_by_id(&id.to_string()).is_none());

    assert!(matches!(
        coordinator.delete(id),
        Err(DualWriteError::NotFound { .. })
    ));
}

#[test]
fn delete_proceeds_when_document_store_is_broken() {
    let (conn, dir, author) = setup();
    let coordinator =
        DualWriteCoordinator::new(SqliteArticleRepository::try_new(&conn).unwrap(), article_store(&dir));
    let (id, _) = coordinator
        .create(&new_article("Broken store", author), body)
        .unwrap()
        .into_result()
        .unwrap();
    corrupt(coordinator.store().path());

    let outcome = coordinator.delete(id).unwrap();
    assert!(!outcome.document_removed);
    assert!(coordinator.repo().get(id).unwrap().is_none());
}
