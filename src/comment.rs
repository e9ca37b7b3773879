use chrono::{NaiveDateTime, Utc};
use diesel::insert_into;
use diesel::prelude::*;
use log::info;
use rocket::post;
use rocket::serde::json::Json;

use crate::db::schema::{comments, users};
use crate::db::DbConnection;
use crate::post::Post;
use crate::types::{ApiError, Reply, Validate, ValidationError};
use crate::users::{CurrentUser, User};
use crate::utils::serialize_date;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(Post))]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created: NaiveDateTime,
}

#[derive(Serialize, Debug)]
pub struct CommentView {
    id: i32,
    author: String,
    text: String,
    #[serde(serialize_with = "serialize_date")]
    created: NaiveDateTime,
}

impl From<(Comment, User)> for CommentView {
    fn from(comment_and_author: (Comment, User)) -> Self {
        let (comment, author) = comment_and_author;
        CommentView {
            id: comment.id,
            author: author.username,
            text: comment.text,
            created: comment.created,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentContainer<T> {
    comment: T,
}

impl Validate for CommentBody {
    type Error = ValidationError;
    fn validate(self, _connection: &mut SqliteConnection) -> Result<Self, ValidationError> {
        if self.text.trim().is_empty() {
            Err(ValidationError::from("text", "This field is required."))
        } else {
            Ok(self)
        }
    }
}

impl Comment {
    /// Comments of a post with their authors, oldest first.
    pub fn for_post(post_id: i32, connection: &mut SqliteConnection) -> QueryResult<Vec<CommentView>> {
        let data = comments::table
            .inner_join(users::table)
            .filter(comments::post_id.eq(post_id))
            .order((comments::created.asc(), comments::id.asc()))
            .load::<(Comment, User)>(connection)?;
        Ok(data.into_iter().map(CommentView::from).collect())
    }
}

impl NewComment {
    pub fn insert(&self, connection: &mut SqliteConnection) -> QueryResult<Comment> {
        insert_into(comments::table)
            .values(self)
            .get_result::<Comment>(connection)
    }
}

#[post("/posts/<post_id>/comment", data = "<details>")]
pub fn add(
    user: CurrentUser,
    mut conn: DbConnection,
    post_id: i32,
    details: Option<Json<CommentContainer<CommentBody>>>,
) -> Result<Reply, ApiError> {
    let user = user?;
    let post = Post::load(post_id, &mut conn)?;
    let details = details.ok_or(ApiError::Malformed)?;
    let body = details.into_inner().comment.validate(&mut conn)?;

    let comment = NewComment {
        post_id: post.id,
        author_id: user.id,
        text: body.text,
        created: Utc::now().naive_utc(),
    }
    .insert(&mut conn)?;
    info!("{} commented on post {} ({})", user.username, post.id, comment.id);
    Ok(Reply::redirect(format!("/posts/{}/", post.id)))
}
