use cinelog_core::coordinator::DualWriteCoordinator;
use cinelog_core::db::open_db_in_memory;
use cinelog_core::docstore::{ArticleDocument, DocumentStore, MovieListDocument};
use cinelog_core::merge::{ArticleView, MergeReader, MovieListView, Viewer};
use cinelog_core::model::article::NewArticle;
use cinelog_core::model::movie_list::NewMovieList;
use cinelog_core::model::profile::NewProfile;
use cinelog_core::repo::article_repo::{ArticleFilter, SqliteArticleRepository};
use cinelog_core::repo::movie_list_repo::{MovieListFilter, SqliteMovieListRepository};
use cinelog_core::repo::profile_repo::SqliteProfileRepository;
use cinelog_core::{EntityRepository, PageQuery, RepoError};
use rusqlite::Connection;
use uuid::Uuid;

fn create_profile(conn: &Connection, username: &str) -> Uuid {
    SqliteProfileRepository::try_new(conn)
        .unwrap()
        .create(&NewProfile::new(Uuid::new_v4(), username))
        .unwrap()
}

fn new_article(title: &str, author: Uuid) -> NewArticle {
    NewArticle {
        article_title: title.to_string(),
        movie_ref_id: Some("tt0075314".to_string()),
        section_id: 2,
        newsletter_id: Some(11),
        author_profile_id: author,
    }
}

#[test]
fn article_end_to_end_create_read_delete() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let author = create_profile(&conn, "author");
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let coordinator = DualWriteCoordinator::new(repo, store);

    let (id, _) = coordinator
        .create(&new_article("Taxi Driver at 50", author), |id| {
            ArticleDocument::new(id, "<p>hi</p>", Some("img/a.png".to_string()))
        })
        .unwrap()
        .into_result()
        .unwrap();

    let reader = MergeReader::new(coordinator.repo(), coordinator.store());
    let view: ArticleView = reader.get_one(id, &Viewer::anonymous()).unwrap();
    assert_eq!(view.article_id, id);
    assert_eq!(view.article_title, "Taxi Driver at 50");
    assert_eq!(view.newsletter_id, Some(11));
    assert_eq!(view.content, "<p>hi</p>");
    assert_eq!(view.image_rel_url.as_deref(), Some("img/a.png"));

    coordinator.delete(id).unwrap();
    let err = reader
        .get_one::<ArticleView>(id, &Viewer::anonymous())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn missing_document_yields_defaulted_fields() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let author = create_profile(&conn, "author");
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let id = repo.create(&new_article("Row only", author)).unwrap();

    let view: ArticleView = MergeReader::new(&repo, &store)
        .get_one(id, &Viewer::anonymous())
        .unwrap();
    assert_eq!(view.article_title, "Row only");
    assert_eq!(view.content, "");
    assert_eq!(view.image_rel_url, None);
}

#[test]
fn corrupt_document_file_keeps_reads_available() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let author = create_profile(&conn, "author");
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let id = repo.create(&new_article("Survives", author)).unwrap();
    store
        .add(&ArticleDocument::new(id, "<p>body</p>", None))
        .unwrap();
    std::fs::write(store.path(), "[{{{").unwrap();

    assert!(store.get_all().is_empty());
    let reader = MergeReader::new(&repo, &store);
    let view: ArticleView = reader.get_one(id, &Viewer::anonymous()).unwrap();
    assert_eq!(view.content, "");

    let page = reader
        .get_many::<ArticleView>(&ArticleFilter::default(), PageQuery::default(), &Viewer::anonymous())
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].article_id, id);
}

#[test]
fn private_list_movies_are_visible_to_owner_only() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let owner = create_profile(&conn, "owner");
    let stranger = create_profile(&conn, "stranger");
    let repo = SqliteMovieListRepository::try_new(&conn).unwrap();
    let store = DocumentStore::<MovieListDocument>::open(dir.path().join("l.json")).unwrap();
    let coordinator = DualWriteCoordinator::new(repo, store);

    let (list_id, _) = coordinator
        .create(
            &NewMovieList {
                profile_id: owner,
                name: "Guilty pleasures".to_string(),
                description: None,
                is_private: true,
            },
            |id| MovieListDocument::empty(id, owner),
        )
        .unwrap()
        .into_result()
        .unwrap();
    coordinator
        .store()
        .add_movie(&list_id.to_string(), "tt0093779")
        .unwrap();

    let reader = MergeReader::new(coordinator.repo(), coordinator.store());
    let as_stranger: MovieListView = reader.get_one(list_id, &Viewer::profile(stranger)).unwrap();
    assert_eq!(as_stranger.name, "Guilty pleasures");
    assert_eq!(as_stranger.movies, None);
    let json = serde_json::to_value(&as_stranger).unwrap();
    assert!(json.get("movies").is_none());

    let as_owner: MovieListView = reader.get_one(list_id, &Viewer::profile(owner)).unwrap();
    let movies = as_owner.movies.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].movie_id, "tt0093779");
}

#[test]
fn get_many_pages_rows_and_counts_all_matches() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let owner = create_profile(&conn, "owner");
    let repo = SqliteMovieListRepository::try_new(&conn).unwrap();
    let store = DocumentStore::<MovieListDocument>::open(dir.path().join("l.json")).unwrap();
    for index in 0..5 {
        let id = repo
            .create(&NewMovieList {
                profile_id: owner,
                name: format!("List {index}"),
                description: None,
                is_private: false,
            })
            .unwrap();
        // Only even lists get a document.
        if index % 2 == 0 {
            store.add(&MovieListDocument::empty(id, owner)).unwrap();
            store.add_movie(&id.to_string(), "tt0000001").unwrap();
        }
    }

    let reader = MergeReader::new(&repo, &store);
    let page = reader
        .get_many::<MovieListView>(
            &MovieListFilter::default(),
            PageQuery::new(0, 3),
            &Viewer::anonymous(),
        )
        .unwrap();
    assert_eq!(page.count, 5);
    assert_eq!(page.items.len(), 3);
    for view in &page.items {
        let movies = view.movies.as_ref().unwrap();
        assert!(movies.len() <= 1);
    }

    let total_movies: usize = reader
        .get_many::<MovieListView>(
            &MovieListFilter::default(),
            PageQuery::default(),
            &Viewer::anonymous(),
        )
        .unwrap()
        .items
        .iter()
        .map(|view| view.movies.as_ref().map_or(0, Vec::len))
        .sum();
    assert_eq!(total_movies, 3);
}
