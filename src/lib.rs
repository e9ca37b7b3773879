#[macro_use]
extern crate diesel;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;

pub mod cache;
pub mod comment;
pub mod config;
pub mod db;
pub mod errors;
pub mod feed;
pub mod group;
pub mod media;
pub mod post;
pub mod profile;
pub mod types;
pub mod users;
pub mod utils;

use rocket::fs::FileServer;
use rocket::request::Request;
use rocket::response::content::RawJson;
use rocket::{catch, catchers, routes, Build, Rocket};
use std::fs;

use crate::cache::PageCache;
use crate::config::Config;
use crate::media::MediaStore;

#[catch(422)]
fn handle_422(_req: &Request) -> RawJson<String> {
    let json = json!({
        "errors": [
            "malformed request body"
        ]
    });
    RawJson(json.to_string())
}

#[catch(404)]
fn not_found(_req: &Request) -> RawJson<String> {
    let json = json!({
        "errors": [
            "entity not found"
        ]
    });
    RawJson(json.to_string())
}

/// Builds the application: database pool, schema, caches, routes.
pub fn rocket(config: Config) -> errors::Result<Rocket<Build>> {
    let pool = db::init_pool(&config)?;
    db::create_schema(&pool)?;
    fs::create_dir_all(&config.media_root)?;

    let media = MediaStore::new(config.media_root.clone());
    let files = FileServer::from(media.root());
    let cache = PageCache::new(config.index_cache_ttl);

    Ok(rocket::build()
        .manage(pool)
        .manage(cache)
        .manage(media)
        .manage(config)
        .mount(
            "/",
            routes![
                feed::index,
                feed::follow_index,
                group::group_posts,
                profile::profile,
                profile::follow,
                profile::unfollow,
                post::detail,
                post::create_form,
                post::create,
                post::edit_form,
                post::edit,
                post::delete,
                comment::add,
            ],
        )
        .mount("/auth", routes![users::signup, users::login_form, users::login])
        .mount("/media", files)
        .register("/", catchers![not_found, handle_422]))
}
