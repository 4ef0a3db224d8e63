//! Profile repository contract and SQLite implementation.
//!
//! # Invariants
//! - Deleting a profile cascades to its movie lists, comments and
//!   authorship links through foreign keys.

use crate::model::profile::{NewProfile, Profile, ProfilePatch, ProfileRole};
use crate::model::{EntityId, ProfileId};
use crate::repo::{
    collect_ids, ensure_connection_ready, parse_uuid, Assignments, EntityRepository, PageQuery,
    RepoError, RepoResult, WhereClause,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const PROFILE_SELECT_SQL: &str = "SELECT
    profile_id,
    user_id,
    username,
    description,
    profile_role,
    image_rel_path,
    created_at,
    updated_at
FROM profiles";

/// Listing filter for profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFilter {
    pub role: Option<ProfileRole>,
}

/// Ids of documents owned by rows that cascade with a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependentIds {
    pub movie_list_ids: Vec<EntityId>,
    pub comment_ids: Vec<EntityId>,
}

/// Profile-specific queries on top of the shared contract.
pub trait ProfileRepository:
    EntityRepository<
    Entity = Profile,
    Create = NewProfile,
    Patch = ProfilePatch,
    Filter = ProfileFilter,
>
{
    fn find_by_username(&self, username: &str) -> RepoResult<Option<Profile>>;
    fn find_by_user_id(&self, user_id: Uuid) -> RepoResult<Option<Profile>>;
    /// Lists rows that the relational cascade removes with this profile.
    fn dependent_ids(&self, profile_id: ProfileId) -> RepoResult<DependentIds>;
}

/// SQLite-backed profile repository.
pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["profiles", "movie_lists", "comments"])?;
        Ok(Self { conn })
    }

    fn find_one(&self, column_sql: &str, value: String) -> RepoResult<Option<Profile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE {column_sql} = ?1;"))?;
        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_profile_row(row)?)),
            None => Ok(None),
        }
    }
}

impl EntityRepository for SqliteProfileRepository<'_> {
    type Entity = Profile;
    type Create = NewProfile;
    type Patch = ProfilePatch;
    type Filter = ProfileFilter;

    const KIND: &'static str = "profile";

    fn create(&self, input: &NewProfile) -> RepoResult<EntityId> {
        input.validate()?;

        let profile_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO profiles (
                profile_id,
                user_id,
                username,
                description,
                profile_role,
                image_rel_path
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                profile_id.to_string(),
                input.user_id.to_string(),
                input.username.as_str(),
                input.description.as_deref(),
                input.profile_role.as_str(),
                input.image_rel_path.as_deref(),
            ],
        )?;
        Ok(profile_id)
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<Profile>> {
        self.find_one("profile_id", id.to_string())
    }

    fn update(&self, id: EntityId, patch: &ProfilePatch) -> RepoResult<Profile> {
        patch.validate()?;

        let mut assignments = Assignments::default();
        if let Some(username) = patch.username.as_ref() {
            assignments.set("username", Value::Text(username.clone()));
        }
        if let Some(description) = patch.description.as_ref() {
            assignments.set("description", Value::Text(description.clone()));
        }
        if let Some(role) = patch.profile_role {
            assignments.set("profile_role", Value::Text(role.as_str().to_string()));
        }
        if let Some(image_rel_path) = patch.image_rel_path.as_ref() {
            assignments.set("image_rel_path", Value::Text(image_rel_path.clone()));
        }

        if assignments.execute(self.conn, "profiles", "profile_id", id)? == 0 {
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
            .execute("DELETE FROM profiles WHERE profile_id = ?1;", [id.to_string()])?;
        Ok(removed > 0)
    }

    fn list(&self, filter: &ProfileFilter, page: PageQuery) -> RepoResult<Vec<Profile>> {
        let (sql, values) =
            profile_where(filter).page_query(PROFILE_SELECT_SQL, "username ASC", page);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next()? {
            profiles.push(parse_profile_row(row)?);
        }
        Ok(profiles)
    }

    fn count(&self, filter: &ProfileFilter) -> RepoResult<u64> {
        profile_where(filter).count(self.conn, "profiles")
    }

    fn all_ids(&self) -> RepoResult<Vec<EntityId>> {
        collect_ids(
            self.conn,
            "SELECT profile_id FROM profiles ORDER BY profile_id;",
            "profiles.profile_id",
        )
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn find_by_username(&self, username: &str) -> RepoResult<Option<Profile>> {
        self.find_one("username", username.to_string())
    }

    fn find_by_user_id(&self, user_id: Uuid) -> RepoResult<Option<Profile>> {
        self.find_one("user_id", user_id.to_string())
    }

    fn dependent_ids(&self, profile_id: ProfileId) -> RepoResult<DependentIds> {
        Ok(DependentIds {
            movie_list_ids: ids_for_profile(
                self.conn,
                "SELECT list_id FROM movie_lists WHERE profile_id = ?1;",
                profile_id,
                "movie_lists.list_id",
            )?,
            comment_ids: ids_for_profile(
                self.conn,
                "SELECT comment_id FROM comments WHERE profile_id = ?1;",
                profile_id,
                "comments.comment_id",
            )?,
        })
    }
}

fn ids_for_profile(
    conn: &Connection,
    sql: &str,
    profile_id: ProfileId,
    column: &str,
) -> RepoResult<Vec<EntityId>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([profile_id.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.push(parse_uuid(&text, column)?);
    }
    Ok(ids)
}

fn profile_where(filter: &ProfileFilter) -> WhereClause {
    let mut clause = WhereClause::default();
    if let Some(role) = filter.role {
        clause.push("profile_role = ?", Value::Text(role.as_str().to_string()));
    }
    clause
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<Profile> {
    let profile_id: String = row.get("profile_id")?;
    let user_id: String = row.get("user_id")?;
    let role_text: String = row.get("profile_role")?;
    let profile_role = ProfileRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid role `{role_text}` in profiles.profile_role"
        ))
    })?;

    Ok(Profile {
        profile_id: parse_uuid(&profile_id, "profiles.profile_id")?,
        user_id: parse_uuid(&user_id, "profiles.user_id")?,
        username: row.get("username")?,
        description: row.get("description")?,
        profile_role,
        image_rel_path: row.get("image_rel_path")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
