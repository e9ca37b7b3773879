use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::{delete, insert_into, select};
use log::info;
use rocket::serde::json::{Json, Value};
use rocket::{get, State};

use crate::config::Config;
use crate::db::schema::follows;
use crate::db::DbConnection;
use crate::feed::{self, Scope};
use crate::types::{ApiError, ApiResult, Reply};
use crate::users::{CurrentUser, User};

/// Whether `viewer` is subscribed to `author`. Anonymous viewers and
/// authors looking at themselves never follow.
pub fn is_following(
    connection: &mut SqliteConnection,
    viewer: Option<&User>,
    author: &User,
) -> QueryResult<bool> {
    let viewer = match viewer {
        Some(viewer) if viewer.id != author.id => viewer,
        _ => return Ok(false),
    };
    select(exists(
        follows::table
            .filter(follows::user_id.eq(viewer.id))
            .filter(follows::author_id.eq(author.id)),
    ))
    .get_result::<bool>(connection)
}

/// Creates the edge unless it exists already. Following yourself is ignored.
pub fn follow_author(connection: &mut SqliteConnection, viewer: &User, author: &User) -> QueryResult<bool> {
    if viewer.id == author.id {
        return Ok(false);
    }
    let inserted = insert_into(follows::table)
        .values((follows::user_id.eq(viewer.id), follows::author_id.eq(author.id)))
        .on_conflict((follows::user_id, follows::author_id))
        .do_nothing()
        .execute(connection)?;
    Ok(inserted > 0)
}

/// Removes the edge; a missing edge is `NotFound`.
pub fn unfollow_author(connection: &mut SqliteConnection, viewer: &User, author: &User) -> Result<(), ApiError> {
    let removed = delete(
        follows::table
            .filter(follows::user_id.eq(viewer.id))
            .filter(follows::author_id.eq(author.id)),
    )
    .execute(connection)?;
    if removed == 0 {
        Err(ApiError::NotFound)
    } else {
        Ok(())
    }
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

#[get("/profile/<name>?<page>")]
pub fn profile(
    current_user: Option<User>,
    mut connection: DbConnection,
    config: &State<Config>,
    name: String,
    page: Option<String>,
) -> ApiResult<Value> {
    let author = User::load_by_name(&name, &mut connection)?;
    let following = is_following(&mut connection, current_user.as_ref(), &author)?;
    let page = feed::assemble(
        &mut connection,
        &Scope::Author(&author),
        page.as_deref(),
        config.posts_on_pages,
    )?;

    Ok(Json(json!({
        "author": author.author(&mut connection)?,
        "following": following,
        "page": page,
    })))
}

#[get("/profile/<name>/follow")]
pub fn follow(current_user: CurrentUser, mut connection: DbConnection, name: String) -> Result<Reply, ApiError> {
    let current = current_user?;
    let author = User::load_by_name(&name, &mut connection)?;
    if follow_author(&mut connection, &current, &author)? {
        info!("{} follows {}", current.username, author.username);
    }
    Ok(Reply::redirect(profile_url(&author.username)))
}

#[get("/profile/<name>/unfollow")]
pub fn unfollow(current_user: CurrentUser, mut connection: DbConnection, name: String) -> Result<Reply, ApiError> {
    let current = current_user?;
    let author = User::load_by_name(&name, &mut connection)?;
    unfollow_author(&mut connection, &current, &author)?;
    info!("{} unfollowed {}", current.username, author.username);
    Ok(Reply::redirect(profile_url(&author.username)))
}
