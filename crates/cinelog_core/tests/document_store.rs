use cinelog_core::docstore::{
    ArticleDocument, CommentDocument, DocumentStore, MovieListDocument, StoreError,
};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

fn article(content: &str) -> ArticleDocument {
    ArticleDocument::new(Uuid::new_v4(), content, Some("img/a.png".to_string()))
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn corrupt(path: &Path) {
    std::fs::write(path, "[{\"id\": \"half-written").unwrap();
}

#[test]
fn open_creates_empty_array_and_initialization_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("storage_article.json");
    let store = DocumentStore::<ArticleDocument>::open(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

    let doc = article("<p>hi</p>");
    store.add(&doc).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    for _ in 0..3 {
        store.ensure_initialized().unwrap();
    }
    DocumentStore::<ArticleDocument>::open(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn add_then_get_by_id_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let first = article("<p>one</p>");
    let second = article("<p>two</p>");

    assert_eq!(store.add(&first).unwrap(), first.id);
    store.add(&second).unwrap();

    assert_eq!(store.get_by_id(&first.id), Some(first.clone()));
    assert_eq!(store.get_all(), vec![first, second]);
    assert_eq!(store.get_by_id("missing"), None);
}

#[test]
fn add_rejects_duplicate_and_blank_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let doc = article("body");
    store.add(&doc).unwrap();

    assert!(matches!(store.add(&doc), Err(StoreError::DuplicateId(id)) if id == doc.id));

    let blank = ArticleDocument {
        id: "  ".to_string(),
        content: String::new(),
        image_rel_url: None,
    };
    assert!(matches!(
        store.add(&blank),
        Err(StoreError::InvalidDocument(_))
    ));
    assert_eq!(store.get_all().len(), 1);
}

#[test]
fn corrupt_file_reads_as_empty_but_fails_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.json");
    let store = DocumentStore::<ArticleDocument>::open(&path).unwrap();
    let doc = article("body");
    store.add(&doc).unwrap();
    corrupt(&path);

    assert!(store.get_all().is_empty());
    assert_eq!(store.get_by_id(&doc.id), None);
    assert!(store.ids().is_empty());

    assert!(matches!(
        store.add(&article("new")),
        Err(StoreError::Corrupt { .. })
    ));
    assert!(matches!(
        store.remove(&doc.id),
        Err(StoreError::Corrupt { .. })
    ));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[{\"id\": \"half-written"
    );
}

#[test]
fn update_fields_reports_found_and_merges_shallowly() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let doc = article("<p>old</p>");
    store.add(&doc).unwrap();

    let updated = store
        .update_fields(&doc.id, fields(json!({"content": "<p>new</p>"})))
        .unwrap();
    assert!(updated);
    let stored = store.get_by_id(&doc.id).unwrap();
    assert_eq!(stored.content, "<p>new</p>");
    assert_eq!(stored.image_rel_url.as_deref(), Some("img/a.png"));

    // Found but unchanged still reports true.
    assert!(store
        .update_fields(&doc.id, fields(json!({"content": "<p>new</p>"})))
        .unwrap());
    assert!(!store
        .update_fields("missing", fields(json!({"content": "x"})))
        .unwrap());
}

#[test]
fn update_fields_rejects_id_change_and_undecodable_result() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let doc = article("body");
    store.add(&doc).unwrap();

    assert!(matches!(
        store.update_fields(&doc.id, fields(json!({"id": "other"}))),
        Err(StoreError::InvalidDocument(_))
    ));
    assert!(matches!(
        store.update_fields(&doc.id, fields(json!({"content": 42}))),
        Err(StoreError::InvalidDocument(_))
    ));
    assert_eq!(store.get_by_id(&doc.id), Some(doc));
}

#[test]
fn remove_reports_whether_array_shrank() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let keep = article("keep");
    let gone = article("gone");
    store.add(&keep).unwrap();
    store.add(&gone).unwrap();

    assert!(store.remove(&gone.id).unwrap());
    assert!(!store.remove(&gone.id).unwrap());
    assert_eq!(store.get_all(), vec![keep]);
}

#[test]
fn get_many_returns_only_requested_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();
    let docs: Vec<_> = (0..4).map(|i| article(&format!("body {i}"))).collect();
    for doc in &docs {
        store.add(doc).unwrap();
    }

    let wanted = vec![docs[1].id.clone(), docs[3].id.clone(), "absent".to_string()];
    let found = store.get_many(&wanted);
    assert_eq!(found.len(), 2);
    assert_eq!(found.get(&docs[3].id), Some(&docs[3]));
}

#[test]
fn add_movie_keeps_movies_unique() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<MovieListDocument>::open(dir.path().join("l.json")).unwrap();
    let list = MovieListDocument::empty(Uuid::new_v4(), Uuid::new_v4());
    store.add(&list).unwrap();

    assert!(store.add_movie(&list.id, "tt0111161").unwrap());
    let before = store.get_by_id(&list.id).unwrap();

    assert!(!store.add_movie(&list.id, "tt0111161").unwrap());
    assert_eq!(store.get_by_id(&list.id).unwrap(), before);
    assert_eq!(before.movies.len(), 1);

    assert!(store.remove_movie(&list.id, "tt0111161").unwrap());
    assert!(!store.remove_movie(&list.id, "tt0111161").unwrap());
    assert!(matches!(
        store.add_movie("missing", "tt0111161"),
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
fn comment_likes_are_unique_per_profile() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<CommentDocument>::open(dir.path().join("c.json")).unwrap();
    let comment = CommentDocument::new(Uuid::new_v4(), "reviewer");
    store.add(&comment).unwrap();

    assert!(store.add_like(&comment.id, "p1").unwrap());
    assert!(!store.add_like(&comment.id, "p1").unwrap());
    assert!(store.remove_like(&comment.id, "p1").unwrap());
    assert!(store.get_by_id(&comment.id).unwrap().like_by.is_empty());
}

#[test]
fn concurrent_add_movie_loses_no_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("l.json");
    let store = DocumentStore::<MovieListDocument>::open(&path).unwrap();
    let list = MovieListDocument::empty(Uuid::new_v4(), Uuid::new_v4());
    store.add(&list).unwrap();

    const WRITERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|index| {
            // Half the writers use a separately opened store on the same file.
            let store = if index % 2 == 0 {
                store.clone()
            } else {
                DocumentStore::<MovieListDocument>::open(&path).unwrap()
            };
            let barrier = Arc::clone(&barrier);
            let list_id = list.id.clone();
            thread::spawn(move || {
                barrier.wait();
                store.add_movie(&list_id, &format!("tt{index:07}")).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let stored = store.get_by_id(&list.id).unwrap();
    assert_eq!(stored.movies.len(), WRITERS);
    for index in 0..WRITERS {
        assert!(stored.contains_movie(&format!("tt{index:07}")));
    }
}

#[test]
fn concurrent_adds_of_distinct_documents_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::<ArticleDocument>::open(dir.path().join("a.json")).unwrap();

    const WRITERS: usize = 6;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|index| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let doc = article(&format!("body {index}"));
                barrier.wait();
                store.add(&doc).unwrap()
            })
        })
        .collect();

    let mut ids: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let mut stored = store.ids();
    ids.sort();
    stored.sort();
    assert_eq!(ids, stored);
}
