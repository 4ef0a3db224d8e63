//! Comment repository (SQLite).

use crate::model::comment::{Comment, CommentPatch, NewComment, TargetType};
use crate::model::{EntityId, ProfileId};
use crate::repo::{
    bool_to_int, collect_ids, ensure_connection_ready, parse_flag, parse_uuid, Assignments,
    EntityRepository, PageQuery, RepoError, RepoResult, WhereClause,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const COMMENT_SELECT_SQL: &str = "SELECT
    comment_id,
    target_id,
    target_type,
    profile_id,
    content,
    has_spoilers,
    created_at,
    updated_at
FROM comments";

/// Listing filter for comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFilter {
    /// Only comments attached to this target.
    pub target: Option<(TargetType, String)>,
    /// Only comments written by this profile.
    pub profile_id: Option<ProfileId>,
}

/// Marker trait binding the shared contract to comment types.
pub trait CommentRepository:
    EntityRepository<Entity = Comment, Create = NewComment, Patch = CommentPatch, Filter = CommentFilter>
{
}

impl<R> CommentRepository for R where
    R: EntityRepository<
        Entity = Comment,
        Create = NewComment,
        Patch = CommentPatch,
        Filter = CommentFilter,
    >
{
}

/// SQLite-backed comment repository.
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["comments"])?;
        Ok(Self { conn })
    }
}

impl EntityRepository for SqliteCommentRepository<'_> {
    type Entity = Comment;
    type Create = NewComment;
    type Patch = CommentPatch;
    type Filter = CommentFilter;

    const KIND: &'static str = "comment";

    fn create(&self, input: &NewComment) -> RepoResult<EntityId> {
        input.validate()?;

        let comment_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO comments (
                comment_id,
                target_id,
                target_type,
                profile_id,
                content,
                has_spoilers
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                comment_id.to_string(),
                input.target_id.as_str(),
                input.target_type.as_str(),
                input.profile_id.to_string(),
                input.content.as_str(),
                bool_to_int(input.has_spoilers),
            ],
        )?;
        Ok(comment_id)
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<Comment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COMMENT_SELECT_SQL} WHERE comment_id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_comment_row(row)?)),
            None => Ok(None),
        }
    }

    fn update(&self, id: EntityId, patch: &CommentPatch) -> RepoResult<Comment> {
        patch.validate()?;

        let mut assignments = Assignments::default();
        if let Some(content) = patch.content.as_ref() {
            assignments.set("content", Value::Text(content.clone()));
        }
        if let Some(has_spoilers) = patch.has_spoilers {
            assignments.set("has_spoilers", Value::Integer(bool_to_int(has_spoilers)));
        }

        if assignments.execute(self.conn, "comments", "comment_id", id)? == 0 {
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
        let removed = self
            .conn
            .execute("DELETE FROM comments WHERE comment_id = ?1;", [id.to_string()])?;
        Ok(removed > 0)
    }

    fn list(&self, filter: &CommentFilter, page: PageQuery) -> RepoResult<Vec<Comment>> {
        let (sql, values) = comment_where(filter).page_query(
            COMMENT_SELECT_SQL,
            "created_at DESC, comment_id ASC",
            page,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(parse_comment_row(row)?);
        }
        Ok(comments)
    }

    fn count(&self, filter: &CommentFilter) -> RepoResult<u64> {
        comment_where(filter).count(self.conn, "comments")
    }

    fn all_ids(&self) -> RepoResult<Vec<EntityId>> {
        collect_ids(
            self.conn,
            "SELECT comment_id FROM comments ORDER BY comment_id;",
            "comments.comment_id",
        )
    }
}

fn comment_where(filter: &CommentFilter) -> WhereClause {
    let mut clause = WhereClause::default();
    if let Some((target_type, target_id)) = filter.target.as_ref() {
        clause.push(
            "target_type = ?",
            Value::Text(target_type.as_str().to_string()),
        );
        clause.push("target_id = ?", Value::Text(target_id.clone()));
    }
    if let Some(profile_id) = filter.profile_id {
        clause.push("profile_id = ?", Value::Text(profile_id.to_string()));
    }
    clause
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let comment_id: String = row.get("comment_id")?;
    let profile_id: String = row.get("profile_id")?;
    let target_type_text: String = row.get("target_type")?;
    let target_type = TargetType::parse(&target_type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid target type `{target_type_text}` in comments.target_type"
        ))
    })?;

    Ok(Comment {
        comment_id: parse_uuid(&comment_id, "comments.comment_id")?,
        target_id: row.get("target_id")?,
        target_type,
        profile_id: parse_uuid(&profile_id, "comments.profile_id")?,
        content: row.get("content")?,
        has_spoilers: parse_flag(row.get("has_spoilers")?, "comments.has_spoilers")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
