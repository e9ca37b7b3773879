//! Paginated post listings: the global index, a group, an author and the
//! authors a user follows. Every listing is newest first.

use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use log::debug;
use rocket::http::uri::Origin;
use rocket::response::content::RawJson;
use rocket::serde::json::{Json, Value};
use rocket::{get, State};
use std::collections::HashMap;

use crate::cache::PageCache;
use crate::config::Config;
use crate::db::schema::{follows, groups, posts, users};
use crate::db::DbConnection;
use crate::group::Group;
use crate::post::{Post, PostView};
use crate::types::{ApiError, ApiResult};
use crate::users::{CurrentUser, User};

/// Which posts a feed shows.
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    All,
    Group(&'a Group),
    Author(&'a User),
    /// Posts by every author the given user follows.
    Following(&'a User),
}

impl<'a> Scope<'a> {
    fn query(&self) -> posts::BoxedQuery<'static, Sqlite> {
        let query = posts::table.into_boxed();
        match *self {
            Scope::All => query,
            Scope::Group(group) => query.filter(posts::group_id.eq(group.id)),
            Scope::Author(author) => query.filter(posts::author_id.eq(author.id)),
            Scope::Following(viewer) => query.filter(
                posts::author_id.eq_any(
                    follows::table
                        .filter(follows::user_id.eq(viewer.id))
                        .select(follows::author_id),
                ),
            ),
        }
    }
}

/// Splits `count` items into pages of `per_page`. There is always at least
/// one page, even when it is empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paginator {
    count: i64,
    per_page: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Paginator {
        Paginator {
            count: count.max(0),
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> i64 {
        if self.count == 0 {
            1
        } else {
            (self.count + self.per_page - 1) / self.per_page
        }
    }

    /// Turns a raw `page` query value into a valid page number. Missing or
    /// non-numeric values mean the first page, out of range numbers the last.
    pub fn page_number(&self, raw: Option<&str>) -> i64 {
        match raw.and_then(|raw| raw.trim().parse::<i64>().ok()) {
            None => 1,
            Some(number) if number < 1 || number > self.num_pages() => self.num_pages(),
            Some(number) => number,
        }
    }

    pub fn offset(&self, number: i64) -> i64 {
        (number - 1) * self.per_page
    }

    pub fn page<T>(&self, number: i64, items: Vec<T>) -> Page<T> {
        Page {
            number,
            num_pages: self.num_pages(),
            count: self.count,
            has_next: number < self.num_pages(),
            has_previous: number > 1,
            posts: items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub posts: Vec<T>,
}

/// Loads one page of `scope`.
pub fn assemble(
    connection: &mut SqliteConnection,
    scope: &Scope<'_>,
    raw_page: Option<&str>,
    per_page: i64,
) -> QueryResult<Page<PostView>> {
    let count = scope.query().count().get_result::<i64>(connection)?;
    let paginator = Paginator::new(count, per_page);
    let number = paginator.page_number(raw_page);

    let posts = scope
        .query()
        .order((posts::created.desc(), posts::id.desc()))
        .limit(per_page.max(1))
        .offset(paginator.offset(number))
        .load::<Post>(connection)?;

    Ok(paginator.page(number, describe(connection, posts)?))
}

/// Attaches authors and groups to posts, keeping their order.
pub fn describe(connection: &mut SqliteConnection, posts: Vec<Post>) -> QueryResult<Vec<PostView>> {
    let author_ids = posts.iter().map(|post| post.author_id).collect::<Vec<i32>>();
    let group_ids = posts.iter().filter_map(|post| post.group_id).collect::<Vec<i32>>();

    let authors = users::table
        .filter(users::id.eq_any(author_ids))
        .load::<User>(connection)?
        .into_iter()
        .map(|user| (user.id, user))
        .collect::<HashMap<_, _>>();
    let groups = groups::table
        .filter(groups::id.eq_any(group_ids))
        .load::<Group>(connection)?
        .into_iter()
        .map(|group| (group.id, group))
        .collect::<HashMap<_, _>>();

    posts
        .into_iter()
        .map(|post| -> QueryResult<PostView> {
            let author = authors.get(&post.author_id).ok_or(diesel::result::Error::NotFound)?;
            let group = post.group_id.and_then(|id| groups.get(&id));
            Ok(PostView::new(post, author, group))
        })
        .collect()
}

#[get("/?<page>")]
pub fn index(
    mut connection: DbConnection,
    config: &State<Config>,
    cache: &State<PageCache>,
    uri: &Origin<'_>,
    page: Option<String>,
) -> Result<RawJson<String>, ApiError> {
    let key = format!("index:{}", uri);
    if let Some(body) = cache.get(&key) {
        debug!("cache hit for {}", key);
        return Ok(RawJson(body));
    }

    debug!("cache miss for {}", key);
    let page = assemble(&mut connection, &Scope::All, page.as_deref(), config.posts_on_pages)?;
    let body = serde_json::to_string(&json!({ "page": page }))?;
    cache.insert(key, body.clone());
    Ok(RawJson(body))
}

#[get("/follow?<page>")]
pub fn follow_index(
    current_user: CurrentUser,
    mut connection: DbConnection,
    config: &State<Config>,
    page: Option<String>,
) -> ApiResult<Value> {
    let user = current_user?;
    let page = assemble(
        &mut connection,
        &Scope::Following(&user),
        page.as_deref(),
        config.posts_on_pages,
    )?;
    Ok(Json(json!({ "page": page })))
}
