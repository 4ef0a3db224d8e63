use super::{MergedView, Viewer};
use crate::docstore::{
    ArticleDocument, CommentDocument, MovieEntry, MovieListDocument, ProfileDocument,
};
use crate::model::article::Article;
use crate::model::comment::{Comment, TargetType};
use crate::model::movie_list::MovieList;
use crate::model::profile::{Profile, ProfileRole};
use crate::model::{EntityId, ProfileId};
use serde::Serialize;
use uuid::Uuid;

/// Article metadata with its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub article_id: EntityId,
    pub article_title: String,
    pub movie_ref_id: Option<String>,
    pub section_id: i64,
    pub newsletter_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub content: String,
    pub image_rel_url: Option<String>,
}

impl MergedView for ArticleView {
    type Row = Article;
    type Doc = ArticleDocument;

    fn merge(row: Article, document: Option<ArticleDocument>, _viewer: &Viewer) -> Self {
        let (content, image_rel_url) = document
            .map(|document| (document.content, document.image_rel_url))
            .unwrap_or_default();
        Self {
            article_id: row.article_id,
            article_title: row.article_title,
            movie_ref_id: row.movie_ref_id,
            section_id: row.section_id,
            newsletter_id: row.newsletter_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            content,
            image_rel_url,
        }
    }
}

/// Movie list metadata with its movies.
///
/// `movies` is `None` when the list is private and the viewer is not the
/// owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieListView {
    pub list_id: EntityId,
    pub profile_id: ProfileId,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movies: Option<Vec<MovieEntry>>,
    pub like_by: Vec<String>,
    pub likes_count: usize,
}

impl MergedView for MovieListView {
    type Row = MovieList;
    type Doc = MovieListDocument;

    fn merge(row: MovieList, document: Option<MovieListDocument>, viewer: &Viewer) -> Self {
        let visible = !row.is_private || viewer.is(row.profile_id);
        let (movies, like_by) = document
            .filter(|document| owned_by(document, row.profile_id))
            .map(|document| (document.movies, document.like_by))
            .unwrap_or_default();
        Self {
            list_id: row.list_id,
            profile_id: row.profile_id,
            name: row.name,
            description: row.description,
            is_private: row.is_private,
            created_at: row.created_at,
            updated_at: row.updated_at,
            movies: visible.then_some(movies),
            likes_count: like_by.len(),
            like_by,
        }
    }
}

fn owned_by(document: &MovieListDocument, owner: ProfileId) -> bool {
    Uuid::parse_str(&document.profile_id)
        .map(|profile_id| profile_id == owner)
        .unwrap_or(false)
}

/// Profile metadata with mirrored display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub profile_id: ProfileId,
    pub username: String,
    pub description: Option<String>,
    pub profile_role: ProfileRole,
    pub profile_pic_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MergedView for ProfileView {
    type Row = Profile;
    type Doc = ProfileDocument;

    fn merge(row: Profile, document: Option<ProfileDocument>, _viewer: &Viewer) -> Self {
        Self {
            profile_id: row.profile_id,
            username: row.username,
            description: row.description,
            profile_role: row.profile_role,
            profile_pic_url: document.and_then(|document| document.profile_pic_url),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Comment with author name and likes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub comment_id: EntityId,
    pub target_id: String,
    pub target_type: TargetType,
    pub profile_id: ProfileId,
    pub content: String,
    pub has_spoilers: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub author_username: Option<String>,
    pub like_by: Vec<String>,
    pub likes_count: usize,
}

impl MergedView for CommentView {
    type Row = Comment;
    type Doc = CommentDocument;

    fn merge(row: Comment, document: Option<CommentDocument>, _viewer: &Viewer) -> Self {
        let (author_username, like_by) = match document {
            Some(document) => (Some(document.author_username), document.like_by),
            None => (None, Vec::new()),
        };
        Self {
            comment_id: row.comment_id,
            target_id: row.target_id,
            target_type: row.target_type,
            profile_id: row.profile_id,
            content: row.content,
            has_spoilers: row.has_spoilers,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author_username,
            likes_count: like_by.len(),
            like_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MergedView, MovieListView, Viewer};
    use crate::docstore::MovieListDocument;
    use crate::model::movie_list::MovieList;
    use chrono::Utc;
    use uuid::Uuid;

    fn private_list(owner: Uuid) -> MovieList {
        MovieList {
            list_id: Uuid::new_v4(),
            profile_id: owner,
            name: "Noir".to_string(),
            description: None,
            is_private: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn private_movies_are_hidden_from_strangers() {
        let owner = Uuid::new_v4();
        let row = private_list(owner);
        let mut document = MovieListDocument::empty(row.list_id, owner);
        document.insert_movie("tt0033870", Utc::now());
        document.like(&owner.to_string());

        let stranger =
            MovieListView::merge(row.clone(), Some(document.clone()), &Viewer::anonymous());
        assert_eq!(stranger.movies, None);
        assert_eq!(stranger.likes_count, 1);

        let own = MovieListView::merge(row, Some(document), &Viewer::profile(owner));
        assert_eq!(own.movies.map(|movies| movies.len()), Some(1));
    }

    #[test]
    fn document_of_another_owner_is_ignored() {
        let owner = Uuid::new_v4();
        let mut row = private_list(owner);
        row.is_private = false;
        let mut foreign = MovieListDocument::empty(row.list_id, Uuid::new_v4());
        foreign.insert_movie("tt0033870", Utc::now());
        foreign.like("intruder");

        let view = MovieListView::merge(row, Some(foreign), &Viewer::anonymous());
        assert_eq!(view.movies, Some(Vec::new()));
        assert_eq!(view.likes_count, 0);
    }
}
