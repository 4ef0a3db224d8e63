//! Movie list repository (SQLite).

use crate::model::movie_list::{MovieList, MovieListPatch, NewMovieList};
use crate::model::{EntityId, ProfileId};
use crate::repo::{
    bool_to_int, collect_ids, ensure_connection_ready, parse_flag, parse_uuid, Assignments,
    EntityRepository, PageQuery, RepoError, RepoResult, WhereClause,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const MOVIE_LIST_SELECT_SQL: &str = "SELECT
    list_id,
    profile_id,
    name,
    description,
    privacy,
    created_at,
    updated_at
FROM movie_lists";

/// Listing filter for movie lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieListFilter {
    /// Only lists owned by this profile.
    pub profile_id: Option<ProfileId>,
    /// Private lists are excluded unless set.
    pub include_private: bool,
}

/// Marker trait binding the shared contract to movie list types.
pub trait MovieListRepository:
    EntityRepository<
    Entity = MovieList,
    Create = NewMovieList,
    Patch = MovieListPatch,
    Filter = MovieListFilter,
>
{
}

impl<R> MovieListRepository for R where
    R: EntityRepository<
        Entity = MovieList,
        Create = NewMovieList,
        Patch = MovieListPatch,
        Filter = MovieListFilter,
    >
{
}

/// SQLite-backed movie list repository.
pub struct SqliteMovieListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMovieListRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["movie_lists"])?;
        Ok(Self { conn })
    }
}

impl EntityRepository for SqliteMovieListRepository<'_> {
    type Entity = MovieList;
    type Create = NewMovieList;
    type Patch = MovieListPatch;
    type Filter = MovieListFilter;

    const KIND: &'static str = "movie_list";

    fn create(&self, input: &NewMovieList) -> RepoResult<EntityId> {
        input.validate()?;

        let list_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO movie_lists (
                list_id,
                profile_id,
                name,
                description,
                privacy
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                list_id.to_string(),
                input.profile_id.to_string(),
                input.name.as_str(),
                input.description.as_deref(),
                bool_to_int(input.is_private),
            ],
        )?;
        Ok(list_id)
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<MovieList>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MOVIE_LIST_SELECT_SQL} WHERE list_id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_movie_list_row(row)?)),
            None => Ok(None),
        }
    }

    fn update(&self, id: EntityId, patch: &MovieListPatch) -> RepoResult<MovieList> {
        patch.validate()?;

        let mut assignments = Assignments::default();
        if let Some(name) = patch.name.as_ref() {
            assignments.set("name", Value::Text(name.clone()));
        }
        if let Some(description) = patch.description.as_ref() {
            assignments.set("description", Value::Text(description.clone()));
        }
        if let Some(is_private) = patch.is_private {
            assignments.set("privacy", Value::Integer(bool_to_int(is_private)));
        }

        if assignments.execute(self.conn, "movie_lists", "list_id", id)? == 0 {
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
            .execute("DELETE FROM movie_lists WHERE list_id = ?1;", [id.to_string()])?;
        Ok(removed > 0)
    }

    fn list(&self, filter: &MovieListFilter, page: PageQuery) -> RepoResult<Vec<MovieList>> {
        let (sql, values) = movie_list_where(filter).page_query(
            MOVIE_LIST_SELECT_SQL,
            "created_at DESC, list_id ASC",
            page,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values))?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(parse_movie_list_row(row)?);
        }
        Ok(lists)
    }

    fn count(&self, filter: &MovieListFilter) -> RepoResult<u64> {
        movie_list_where(filter).count(self.conn, "movie_lists")
    }

    fn all_ids(&self) -> RepoResult<Vec<EntityId>> {
        collect_ids(
            self.conn,
            "SELECT list_id FROM movie_lists ORDER BY list_id;",
            "movie_lists.list_id",
        )
    }
}

fn movie_list_where(filter: &MovieListFilter) -> WhereClause {
    let mut clause = WhereClause::default();
    if let Some(profile_id) = filter.profile_id {
        clause.push("profile_id = ?", Value::Text(profile_id.to_string()));
    }
    if !filter.include_private {
        clause.push_static("privacy = 0");
    }
    clause
}

fn parse_movie_list_row(row: &Row<'_>) -> RepoResult<MovieList> {
    let list_id: String = row.get("list_id")?;
    let profile_id: String = row.get("profile_id")?;
    Ok(MovieList {
        list_id: parse_uuid(&list_id, "movie_lists.list_id")?,
        profile_id: parse_uuid(&profile_id, "movie_lists.profile_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_private: parse_flag(row.get("privacy")?, "movie_lists.privacy")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
