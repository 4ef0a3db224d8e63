//! Wiring of the relational connection and the four document stores.
//!
//! # Invariants
//! - Each entity kind has exactly one store file inside `data_dir`.
//! - Services borrow the platform connection; they never open their own.

use crate::config::CoreConfig;
use crate::db::{open_db, DbError};
use crate::docstore::{
    ArticleDocument, CommentDocument, DocumentStore, MovieListDocument, ProfileDocument,
    StoreError,
};
use crate::repo::article_repo::SqliteArticleRepository;
use crate::repo::comment_repo::SqliteCommentRepository;
use crate::repo::movie_list_repo::SqliteMovieListRepository;
use crate::repo::profile_repo::SqliteProfileRepository;
use crate::repo::RepoResult;
use crate::service::article_service::ArticleService;
use crate::service::comment_service::CommentService;
use crate::service::movie_list_service::MovieListService;
use crate::service::profile_service::ProfileService;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const ARTICLE_STORE_FILE: &str = "storage_article.json";
pub const MOVIE_LIST_STORE_FILE: &str = "storage_movie_lists.json";
pub const PROFILE_STORE_FILE: &str = "storage_profile.json";
pub const COMMENT_STORE_FILE: &str = "storage_comment.json";

#[derive(Debug)]
pub enum PlatformError {
    Db(DbError),
    Store(StoreError),
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlatformError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<DbError> for PlatformError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<StoreError> for PlatformError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// The four document stores of one data directory.
#[derive(Clone)]
pub struct DocumentStores {
    pub articles: DocumentStore<ArticleDocument>,
    pub movie_lists: DocumentStore<MovieListDocument>,
    pub profiles: DocumentStore<ProfileDocument>,
    pub comments: DocumentStore<CommentDocument>,
}

impl DocumentStores {
    /// Opens (and initializes when missing) every store file in `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        Ok(Self {
            articles: DocumentStore::open(data_dir.join(ARTICLE_STORE_FILE))?,
            movie_lists: DocumentStore::open(data_dir.join(MOVIE_LIST_STORE_FILE))?,
            profiles: DocumentStore::open(data_dir.join(PROFILE_STORE_FILE))?,
            comments: DocumentStore::open(data_dir.join(COMMENT_STORE_FILE))?,
        })
    }
}

/// Open relational connection plus document stores.
pub struct Platform {
    conn: Connection,
    stores: DocumentStores,
}

impl Platform {
    pub fn open(config: &CoreConfig) -> Result<Self, PlatformError> {
        Self::from_parts(open_db(&config.database_path)?, &config.data_dir)
    }

    /// Builds a platform from an already bootstrapped connection.
    pub fn from_parts(conn: Connection, data_dir: impl AsRef<Path>) -> Result<Self, PlatformError> {
        Ok(Self {
            conn,
            stores: DocumentStores::open(data_dir)?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn stores(&self) -> &DocumentStores {
        &self.stores
    }

    pub fn articles(&self) -> RepoResult<ArticleService<SqliteArticleRepository<'_>>> {
        Ok(ArticleService::new(
            SqliteArticleRepository::try_new(&self.conn)?,
            self.stores.articles.clone(),
        ))
    }

    pub fn movie_lists(&self) -> RepoResult<MovieListService<SqliteMovieListRepository<'_>>> {
        Ok(MovieListService::new(
            SqliteMovieListRepository::try_new(&self.conn)?,
            self.stores.movie_lists.clone(),
        ))
    }

    pub fn profiles(&self) -> RepoResult<ProfileService<SqliteProfileRepository<'_>>> {
        Ok(ProfileService::new(
            SqliteProfileRepository::try_new(&self.conn)?,
            self.stores.profiles.clone(),
            self.stores.movie_lists.clone(),
            self.stores.comments.clone(),
        ))
    }

    pub fn comments(
        &self,
    ) -> RepoResult<CommentService<SqliteCommentRepository<'_>, SqliteProfileRepository<'_>>> {
        Ok(CommentService::new(
            SqliteCommentRepository::try_new(&self.conn)?,
            SqliteProfileRepository::try_new(&self.conn)?,
            self.stores.comments.clone(),
        ))
    }
}
