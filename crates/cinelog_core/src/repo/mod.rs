//! Relational repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the narrow per-entity contract the dual-write layer consumes:
//!   create, get, update, delete, list.
//! - Isolate SQL details from coordination and merge logic.
//!
//! # Invariants
//! - Each call runs inside SQLite's own transaction boundary and is atomic.
//! - Write paths validate inputs before SQL mutations.
//! - Constraint failures surface as semantic errors (`UniqueViolation`,
//!   `ForeignKeyViolation`), never as opaque DB errors.

pub mod article_repo;
pub mod comment_repo;
pub mod movie_list_repo;
pub mod profile_repo;

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::validation::ValidationError;
use crate::model::{Entity, EntityId};
use rusqlite::types::Value;
use rusqlite::{ffi, params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;
/// Upper bound applied to caller-provided page sizes.
pub const MAX_PAGE_LIMIT: u32 = 500;

pub type RepoResult<T> = Result<T, RepoError>;

/// Relational repository error.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    /// `UNIQUE` or `PRIMARY KEY` constraint rejected the write.
    UniqueViolation(String),
    /// Referenced row does not exist.
    ForeignKeyViolation(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UniqueViolation(detail) => write!(f, "uniqueness violated: {detail}"),
            Self::ForeignKeyViolation(detail) => {
                write!(f, "referenced row does not exist: {detail}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl RepoError {
    /// Stable code for log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Db(_) => "db_error",
            Self::NotFound { .. } => "not_found",
            Self::UniqueViolation(_) => "unique_violation",
            Self::ForeignKeyViolation(_) => "foreign_key_violation",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::MissingRequiredTable(_) => "missing_required_table",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::UniqueViolation(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return Self::ForeignKeyViolation(detail);
                }
                _ => {}
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Offset pagination for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// Number of rows to skip.
    pub skip: u32,
    /// Maximum rows to return. Defaults to 100 and clamps to 500.
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn new(skip: u32, limit: u32) -> Self {
        Self {
            skip,
            limit: Some(limit),
        }
    }

    /// Returns the effective page size after defaulting and clamping.
    pub fn applied_limit(&self) -> u32 {
        match self.limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT,
            Some(value) if value > MAX_PAGE_LIMIT => MAX_PAGE_LIMIT,
            Some(value) => value,
        }
    }
}

/// Per-entity contract of the relational collaborator.
///
/// Implementations execute every call atomically; the dual-write layer
/// treats each one as a single synchronous step.
pub trait EntityRepository {
    type Entity: Entity;
    type Create;
    type Patch;
    type Filter;

    /// Entity kind used in errors and log events.
    const KIND: &'static str;

    /// Inserts one row and returns its canonical id.
    fn create(&self, input: &Self::Create) -> RepoResult<EntityId>;
    /// Loads one row by id.
    fn get(&self, id: EntityId) -> RepoResult<Option<Self::Entity>>;
    /// Applies a partial update and returns the updated row.
    fn update(&self, id: EntityId, patch: &Self::Patch) -> RepoResult<Self::Entity>;
    /// Deletes one row and its dependent rows. Returns `false` when absent.
    fn delete(&self, id: EntityId) -> RepoResult<bool>;
    /// Lists one page of rows matching `filter`.
    fn list(&self, filter: &Self::Filter, page: PageQuery) -> RepoResult<Vec<Self::Entity>>;
    /// Counts all rows matching `filter`.
    fn count(&self, filter: &Self::Filter) -> RepoResult<u64>;
    /// Returns every row id, used by the consistency audit.
    fn all_ids(&self) -> RepoResult<Vec<EntityId>>;
}

/// SQL `WHERE` clause accumulator with positional bind values.
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    conditions: Vec<&'static str>,
    values: Vec<Value>,
}

impl WhereClause {
    pub(crate) fn push(&mut self, condition: &'static str, value: Value) {
        self.conditions.push(condition);
        self.values.push(value);
    }

    pub(crate) fn push_static(&mut self, condition: &'static str) {
        self.conditions.push(condition);
    }

    fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Builds `SELECT ... WHERE ... ORDER BY ... LIMIT ? OFFSET ?`.
    pub(crate) fn page_query(
        self,
        select_sql: &str,
        order_by: &str,
        page: PageQuery,
    ) -> (String, Vec<Value>) {
        let mut sql = format!("{select_sql}{} ORDER BY {order_by} LIMIT ? OFFSET ?", self.sql());
        sql.push(';');
        let mut values = self.values;
        values.push(Value::Integer(i64::from(page.applied_limit())));
        values.push(Value::Integer(i64::from(page.skip)));
        (sql, values)
    }

    pub(crate) fn count(self, conn: &Connection, table: &str) -> RepoResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table}{};", self.sql());
        let count: i64 = conn.query_row(&sql, params_from_iter(self.values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count} in {table}")))
    }
}

/// Column assignments for a partial `UPDATE`.
#[derive(Debug, Default)]
pub(crate) struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    pub(crate) fn set(&mut self, column: &'static str, value: Value) {
        self.columns.push(column);
        self.values.push(value);
    }

    /// Runs the update and bumps `updated_at`. Returns changed row count.
    pub(crate) fn execute(
        self,
        conn: &Connection,
        table: &str,
        id_column: &str,
        id: EntityId,
    ) -> RepoResult<usize> {
        let mut set_sql: Vec<String> = self
            .columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect();
        set_sql.push("updated_at = (strftime('%s', 'now') * 1000)".to_string());

        let sql = format!(
            "UPDATE {table} SET {} WHERE {id_column} = ?;",
            set_sql.join(", ")
        );
        let mut values = self.values;
        values.push(Value::Text(id.to_string()));
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }
}

/// Rejects connections that were not bootstrapped through `db::open_db*`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

pub(crate) fn collect_ids(conn: &Connection, sql: &str, column: &str) -> RepoResult<Vec<EntityId>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.push(parse_uuid(&text, column)?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::{PageQuery, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

    #[test]
    fn page_limit_defaults_and_clamps() {
        assert_eq!(PageQuery::default().applied_limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(PageQuery::new(0, 0).applied_limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(PageQuery::new(0, 10_000).applied_limit(), MAX_PAGE_LIMIT);
        assert_eq!(PageQuery::new(5, 20).applied_limit(), 20);
    }
}
