use cinelog_core::audit::{self, AuditReport};
use cinelog_core::db::open_db_in_memory;
use cinelog_core::docstore::ArticleDocument;
use cinelog_core::model::article::NewArticle;
use cinelog_core::model::profile::NewProfile;
use cinelog_core::repo::article_repo::SqliteArticleRepository;
use cinelog_core::{EntityRepository, Platform};
use uuid::Uuid;

fn report_for<'a>(reports: &'a [AuditReport], kind: &str) -> &'a AuditReport {
    reports
        .iter()
        .find(|report| report.kind == kind)
        .unwrap_or_else(|| panic!("no report for {kind}"))
}

#[test]
fn audit_reports_drift_and_prunes_orphans() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Platform::from_parts(open_db_in_memory().unwrap(), dir.path()).unwrap();
    let author = platform
        .profiles()
        .unwrap()
        .create_profile(&NewProfile::new(Uuid::new_v4(), "auditor"), None)
        .unwrap()
        .profile_id;

    // Row without a document, as left by an inconsistent create.
    let row_only = SqliteArticleRepository::try_new(platform.connection())
        .unwrap()
        .create(&NewArticle {
            article_title: "Half written".to_string(),
            movie_ref_id: None,
            section_id: 1,
            newsletter_id: None,
            author_profile_id: author,
        })
        .unwrap();
    let orphan = ArticleDocument::new(Uuid::new_v4(), "<p>lost</p>", None);
    platform.stores().articles.add(&orphan).unwrap();

    let reports = audit::run(&platform, false).unwrap();
    assert_eq!(reports.len(), 4);
    assert!(report_for(&reports, "profile").is_consistent());
    let articles = report_for(&reports, "article");
    assert_eq!(articles.missing_documents, vec![row_only]);
    assert_eq!(articles.orphan_documents, vec![orphan.id.clone()]);
    assert_eq!(articles.pruned, 0);

    let pruned = audit::run(&platform, true).unwrap();
    assert_eq!(report_for(&pruned, "article").pruned, 1);
    assert!(platform.stores().articles.get_by_id(&orphan.id).is_none());

    let after = audit::run(&platform, false).unwrap();
    let articles = report_for(&after, "article");
    assert!(articles.orphan_documents.is_empty());
    assert_eq!(articles.missing_documents, vec![row_only]);
}
