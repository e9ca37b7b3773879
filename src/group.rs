use diesel::insert_into;
use diesel::prelude::*;
use log::info;
use rocket::serde::json::{Json, Value};
use rocket::{get, State};
use slug::slugify;

use crate::config::Config;
use crate::db::schema::groups;
use crate::db::DbConnection;
use crate::feed::{self, Scope};
use crate::types::ApiResult;

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = groups)]
pub struct Group {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// How a post refers to its group in listings.
#[derive(Debug, Serialize)]
pub struct GroupLink {
    pub slug: String,
    pub title: String,
}

#[derive(Insertable)]
#[diesel(table_name = groups)]
struct NewGroup<'a> {
    title: &'a str,
    slug: String,
    description: &'a str,
}

impl Group {
    /// Creates a group. Without an explicit slug one is derived from the title.
    pub fn create(
        connection: &mut SqliteConnection,
        title: &str,
        slug: Option<&str>,
        description: &str,
    ) -> QueryResult<Group> {
        let slug = match slug {
            Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
            _ => slugify(title),
        };
        let group = insert_into(groups::table)
            .values(&NewGroup {
                title,
                slug,
                description,
            })
            .get_result::<Group>(connection)?;
        info!("created group {}", group.slug);
        Ok(group)
    }

    pub fn load_by_slug(slug_: &str, connection: &mut SqliteConnection) -> QueryResult<Group> {
        use crate::db::schema::groups::dsl::*;
        groups.filter(slug.eq(slug_)).get_result::<Group>(connection)
    }

    pub fn exists(group_id: i32, connection: &mut SqliteConnection) -> QueryResult<bool> {
        diesel::select(diesel::dsl::exists(groups::table.find(group_id))).get_result(connection)
    }

    /// Every group, for the post form's group choice.
    pub fn choices(connection: &mut SqliteConnection) -> QueryResult<Vec<Group>> {
        groups::table.order(groups::title.asc()).load::<Group>(connection)
    }

    pub fn link(&self) -> GroupLink {
        GroupLink {
            slug: self.slug.clone(),
            title: self.title.clone(),
        }
    }
}

#[get("/group/<slug>?<page>")]
pub fn group_posts(
    mut connection: DbConnection,
    config: &State<Config>,
    slug: String,
    page: Option<String>,
) -> ApiResult<Value> {
    let group = Group::load_by_slug(&slug, &mut connection)?;
    let page = feed::assemble(
        &mut connection,
        &Scope::Group(&group),
        page.as_deref(),
        config.posts_on_pages,
    )?;
    Ok(Json(json!({ "group": group, "page": page })))
}
