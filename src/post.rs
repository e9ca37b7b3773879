use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::{delete as diesel_delete, insert_into, update as diesel_update};
use log::info;
use rocket::serde::json::{Json, Value};
use rocket::{get, post, State};

use crate::comment::Comment;
use crate::db::schema::posts;
use crate::db::DbConnection;
use crate::feed::describe;
use crate::group::{Group, GroupLink};
use crate::media::{media_url, ImageUpload, MediaStore};
use crate::types::{ApiError, ApiResult, Reply, Validate, ValidationError};
use crate::users::{CurrentUser, User};
use crate::utils::serialize_date;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(User, foreign_key = author_id))]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub created: NaiveDateTime,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i32,
    pub text: String,
    #[serde(serialize_with = "serialize_date")]
    pub created: NaiveDateTime,
    pub author: String,
    pub group: Option<GroupLink>,
    pub image: Option<String>,
}

impl PostView {
    pub fn new(post: Post, author: &User, group: Option<&Group>) -> PostView {
        PostView {
            id: post.id,
            text: post.text,
            created: post.created,
            author: author.username.clone(),
            group: group.map(Group::link),
            image: post.image.as_deref().map(media_url),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub text: String,
    pub created: NaiveDateTime,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
}

impl NewPost {
    pub fn insert(&self, connection: &mut SqliteConnection) -> QueryResult<Post> {
        insert_into(posts::table).values(self).get_result::<Post>(connection)
    }
}

impl Post {
    pub fn load(post_id: i32, connection: &mut SqliteConnection) -> QueryResult<Post> {
        posts::table.find(post_id).first::<Post>(connection)
    }

    fn url(&self) -> String {
        format!("/posts/{}/", self.id)
    }
}

#[derive(Debug, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    text: String,
    #[serde(default)]
    group: Option<i32>,
    #[serde(default)]
    image: Option<ImageUpload>,
}

#[derive(Debug, Deserialize)]
pub struct PostSubmission {
    post: PostForm,
}

impl PostForm {
    /// The submitted values, echoed back when the form is rejected.
    fn echo(&self) -> Value {
        json!({ "text": self.text, "group": self.group })
    }

    fn store_image(&self, media: &MediaStore) -> Result<Option<String>, ApiError> {
        match &self.image {
            Some(upload) => {
                let image = upload.decode()?;
                Ok(Some(media.save(&image)?))
            }
            None => Ok(None),
        }
    }
}

impl Validate for PostForm {
    type Error = ApiError;
    fn validate(self, connection: &mut SqliteConnection) -> Result<Self, ApiError> {
        let mut errors = ValidationError::default();
        if self.text.trim().is_empty() {
            errors.add_error("text", "This field is required.");
        }

        if let Some(group_id) = self.group {
            if !Group::exists(group_id, connection)? {
                errors.add_error(
                    "group",
                    "Select a valid choice. That choice is not one of the available choices.",
                );
            }
        }

        if let Some(upload) = &self.image {
            if let Err(e) = upload.decode() {
                errors.merge(e);
            }
        }

        if errors.empty() {
            Ok(self)
        } else {
            Err(errors.into())
        }
    }
}

fn validated(form: PostForm, connection: &mut SqliteConnection) -> Result<PostForm, ApiError> {
    let echo = form.echo();
    form.validate(connection).map_err(|e| match e {
        ApiError::Validation(errors) => ApiError::Form(errors, echo),
        other => other,
    })
}

fn form_page(connection: &mut SqliteConnection, form: Value, post: Option<&Post>) -> Result<Reply, ApiError> {
    let groups = Group::choices(connection)?;
    Ok(Reply::Page(Json(json!({
        "form": form,
        "is_edit": post.is_some(),
        "post_id": post.map(|p| p.id),
        "groups": groups,
    }))))
}

#[get("/posts/<post_id>")]
pub fn detail(mut connection: DbConnection, post_id: i32) -> ApiResult<Value> {
    let post = Post::load(post_id, &mut connection)?;
    let author = posts_author(&post, &mut connection)?;
    let comments = Comment::for_post(post.id, &mut connection)?;
    let view = describe(&mut connection, vec![post])?
        .pop()
        .ok_or(ApiError::NotFound)?;

    Ok(Json(json!({
        "post": view,
        "author": author.author(&mut connection)?,
        "comments": comments,
    })))
}

fn posts_author(post: &Post, connection: &mut SqliteConnection) -> QueryResult<User> {
    use crate::db::schema::users;
    users::table.find(post.author_id).first::<User>(connection)
}

/// Removes a freshly stored image when the write it belongs to failed.
fn discard_on_error<T>(media: &MediaStore, image: &Option<String>, result: QueryResult<T>) -> QueryResult<T> {
    if result.is_err() {
        if let Some(path) = image {
            media.remove(path);
        }
    }
    result
}

#[get("/create")]
pub fn create_form(current_user: CurrentUser, mut connection: DbConnection) -> Result<Reply, ApiError> {
    let _user = current_user?;
    let form = json!({ "text": "", "group": null, "image": null });
    form_page(&mut connection, form, None)
}

#[post("/create", data = "<submission>")]
pub fn create(
    current_user: CurrentUser,
    mut connection: DbConnection,
    media: &State<MediaStore>,
    submission: Option<Json<PostSubmission>>,
) -> Result<Reply, ApiError> {
    let user = current_user?;
    let submission = submission.ok_or(ApiError::Malformed)?;
    let form = validated(submission.into_inner().post, &mut connection)?;
    let image = form.store_image(media)?;

    let inserted = NewPost {
        text: form.text,
        created: Utc::now().naive_utc(),
        author_id: user.id,
        group_id: form.group,
        image: image.clone(),
    }
    .insert(&mut connection);
    let post = discard_on_error(media, &image, inserted)?;
    info!("{} created post {}", user.username, post.id);
    Ok(Reply::redirect(format!("/profile/{}/", user.username)))
}

#[get("/posts/<post_id>/edit")]
pub fn edit_form(current_user: CurrentUser, mut connection: DbConnection, post_id: i32) -> Result<Reply, ApiError> {
    let user = current_user?;
    let post = Post::load(post_id, &mut connection)?;
    if post.author_id != user.id {
        return Ok(Reply::redirect(post.url()));
    }
    let form = json!({
        "text": post.text,
        "group": post.group_id,
        "image": post.image.as_deref().map(media_url),
    });
    form_page(&mut connection, form, Some(&post))
}

#[post("/posts/<post_id>/edit", data = "<submission>")]
pub fn edit(
    current_user: CurrentUser,
    mut connection: DbConnection,
    media: &State<MediaStore>,
    post_id: i32,
    submission: Option<Json<PostSubmission>>,
) -> Result<Reply, ApiError> {
    let user = current_user?;
    let post = Post::load(post_id, &mut connection)?;
    if post.author_id != user.id {
        return Ok(Reply::redirect(post.url()));
    }

    let submission = submission.ok_or(ApiError::Malformed)?;
    let form = validated(submission.into_inner().post, &mut connection)?;
    let image = form.store_image(media)?;
    let updated = connection.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel_update(posts::table.find(post.id))
            .set((posts::text.eq(&form.text), posts::group_id.eq(form.group)))
            .execute(conn)?;
        if let Some(image) = &image {
            diesel_update(posts::table.find(post.id))
                .set(posts::image.eq(image))
                .execute(conn)?;
        }
        Ok(())
    });
    discard_on_error(media, &image, updated)?;
    info!("{} edited post {}", user.username, post.id);
    Ok(Reply::redirect(post.url()))
}

/// Only the author may delete; anyone else is sent back to the post.
#[post("/posts/<post_id>/delete")]
pub fn delete(current_user: CurrentUser, mut connection: DbConnection, post_id: i32) -> Result<Reply, ApiError> {
    let user = current_user?;
    let post = Post::load(post_id, &mut connection)?;
    if post.author_id != user.id {
        return Ok(Reply::redirect(post.url()));
    }

    diesel_delete(posts::table.find(post.id)).execute(&mut *connection)?;
    info!("{} deleted post {}", user.username, post.id);
    Ok(Reply::redirect(format!("/profile/{}/", user.username)))
}
