//! Article repository contract and SQLite implementation.
//!
//! # Invariants
//! - An article and its main-author link are inserted in one transaction.
//! - Deleting an article removes its `author_articles` rows in the same
//!   transaction.

use crate::model::article::{Article, ArticlePatch, NewArticle};
use crate::model::{EntityId, ProfileId};
use crate::repo::{
    bool_to_int, collect_ids, ensure_connection_ready, parse_uuid, Assignments, EntityRepository,
    PageQuery, RepoError, RepoResult, WhereClause,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const ARTICLE_SELECT_SQL: &str = "SELECT
    article_id,
    article_title,
    movie_ref_id,
    section_id,
    newsletter_id,
    created_at,
    updated_at
FROM articles";

/// Listing filter for articles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub section_id: Option<i64>,
    pub newsletter_id: Option<i64>,
    /// Only articles linked to this author profile.
    pub author_profile_id: Option<ProfileId>,
}

/// Article-specific queries on top of the shared contract.
pub trait ArticleRepository:
    EntityRepository<
    Entity = Article,
    Create = NewArticle,
    Patch = ArticlePatch,
    Filter = ArticleFilter,
>
{
    /// Finds an article by exact title, used for the uniqueness pre-check.
    fn find_by_title(&self, title: &str) -> RepoResult<Option<Article>>;
    /// Returns whether `profile_id` is linked as an author of the article.
    fn is_author(&self, article_id: EntityId, profile_id: ProfileId) -> RepoResult<bool>;
    /// Links an additional, non-main author to an existing article.
    fn add_author(&self, article_id: EntityId, profile_id: ProfileId) -> RepoResult<()>;
}

/// SQLite-backed article repository.
pub struct SqliteArticleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["articles", "author_articles"])?;
        Ok(Self { conn })
    }
}

impl EntityRepository for SqliteArticleRepository<'_> {
    type Entity = Article;
    type Create = NewArticle;
    type Patch = ArticlePatch;
    type Filter = ArticleFilter;

    const KIND: &'static str = "article";

    fn create(&self, input: &NewArticle) -> RepoResult<EntityId> {
        input.validate()?;

        let article_id = Uuid::new_v4();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO articles (
                article_id,
                article_title,
                movie_ref_id,
                section_id,
                newsletter_id
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                article_id.to_string(),
                input.article_title.as_str(),
                input.movie_ref_id.as_deref(),
                input.section_id,
                input.newsletter_id,
            ],
        )?;
        tx.execute(
            "INSERT INTO author_articles (profile_id, article_id, main_author)
             VALUES (?1, ?2, 1);",
            params![input.author_profile_id.to_string(), article_id.to_string()],
        )?;
        tx.commit()?;

        Ok(article_id)
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE article_id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_article_row(row)?)),
            None => Ok(None),
        }
    }

    fn update(&self, id: EntityId, patch: &ArticlePatch) -> RepoResult<Article> {
        patch.validate()?;

        let mut assignments = Assignments::default();
        if let Some(title) = patch.article_title.as_ref() {
            assignments.set("article_title", Value::Text(title.clone()));
        }
        if let Some(movie_ref_id) = patch.movie_ref_id.as_ref() {
            assignments.set("movie_ref_id", Value::Text(movie_ref_id.clone()));
        }
        if let Some(section_id) = patch.section_id {
            assignments.set("section_id", Value::Integer(section_id));
        }
        if let Some(newsletter_id) = patch.newsletter_id {
            assignments.set("newsletter_id", Value::Integer(newsletter_id));
        }

        let changed = assignments.execute(self.conn, "articles", "article_id", id)?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: Self::KIND,
                id,
            });
        }

        self.get(id)?.ok_or(RepoError::NotFound {
            entity: Self::KIND,
            id,
        })
    }

    fn delete(&self, id: EntityId) -> RepoResult<bool> {
        let id_text = id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM author_articles WHERE article_id = ?1;",
            [id_text.as_str()],
        )?;
        let removed = tx.execute(
            "DELETE FROM articles WHERE article_id = ?1;",
            [id_text.as_str()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn list(&self, filter: &ArticleFilter, page: PageQuery) -> RepoResult<Vec<Article>> {
        let (sql, values) = article_where(filter).page_query(
            ARTICLE_SELECT_SQL,
            "created_at DESC, article_id ASC",
            page,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut articles = Vec::new();
        while let Some(row) = rows.next()? {
            articles.push(parse_article_row(row)?);
        }
        Ok(articles)
    }

    fn count(&self, filter: &ArticleFilter) -> RepoResult<u64> {
        article_where(filter).count(self.conn, "articles")
    }

    fn all_ids(&self) -> RepoResult<Vec<EntityId>> {
        collect_ids(
            self.conn,
            "SELECT article_id FROM articles ORDER BY article_id;",
            "articles.article_id",
        )
    }
}

impl ArticleRepository for SqliteArticleRepository<'_> {
    fn find_by_title(&self, title: &str) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE article_title = ?1;"))?;
        let mut rows = stmt.query([title])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_article_row(row)?)),
            None => Ok(None),
        }
    }

    fn is_author(&self, article_id: EntityId, profile_id: ProfileId) -> RepoResult<bool> {
        let linked = self
            .conn
            .query_row(
                "SELECT main_author
                 FROM author_articles
                 WHERE article_id = ?1 AND profile_id = ?2;",
                params![article_id.to_string(), profile_id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(linked.is_some())
    }

    fn add_author(&self, article_id: EntityId, profile_id: ProfileId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO author_articles (profile_id, article_id, main_author)
             VALUES (?1, ?2, ?3);",
            params![
                profile_id.to_string(),
                article_id.to_string(),
                bool_to_int(false)
            ],
        )?;
        Ok(())
    }
}

fn article_where(filter: &ArticleFilter) -> WhereClause {
    let mut clause = WhereClause::default();
    if let Some(section_id) = filter.section_id {
        clause.push("section_id = ?", Value::Integer(section_id));
    }
    if let Some(newsletter_id) = filter.newsletter_id {
        clause.push("newsletter_id = ?", Value::Integer(newsletter_id));
    }
    if let Some(profile_id) = filter.author_profile_id {
        clause.push(
            "EXISTS (
                SELECT 1
                FROM author_articles aa
                WHERE aa.article_id = articles.article_id
                  AND aa.profile_id = ?
            )",
            Value::Text(profile_id.to_string()),
        );
    }
    clause
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let id_text: String = row.get("article_id")?;
    Ok(Article {
        article_id: parse_uuid(&id_text, "articles.article_id")?,
        article_title: row.get("article_title")?,
        movie_ref_id: row.get("movie_ref_id")?,
        section_id: row.get("section_id")?,
        newsletter_id: row.get("newsletter_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
