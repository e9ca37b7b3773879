#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use yatube::cache::PageCache;
use yatube::config::Config;
use yatube::db::schema::{comments, follows, posts};
use yatube::db::Pool;
use yatube::group::Group;
use yatube::post::{NewPost, Post};
use yatube::users::models::NewUser;
use yatube::users::User;

pub const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

static NEXT_APP: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub client: Client,
    database: PathBuf,
    media_root: PathBuf,
}

impl TestApp {
    pub fn new() -> TestApp {
        TestApp::with_page_size(10)
    }

    pub fn with_page_size(posts_on_pages: i64) -> TestApp {
        TestApp::build(posts_on_pages, 4)
    }

    pub fn with_pool_size(db_pool_size: u32) -> TestApp {
        TestApp::build(10, db_pool_size)
    }

    fn build(posts_on_pages: i64, db_pool_size: u32) -> TestApp {
        let name = format!(
            "yatube-test-{}-{}",
            std::process::id(),
            NEXT_APP.fetch_add(1, Ordering::SeqCst)
        );
        let database = env::temp_dir().join(format!("{}.sqlite3", name));
        let media_root = env::temp_dir().join(format!("{}-media", name));
        fs::remove_file(&database).ok();
        fs::remove_dir_all(&media_root).ok();

        let config = Config {
            database_url: database.to_string_lossy().into_owned(),
            posts_on_pages,
            index_cache_ttl: Duration::from_secs(20),
            media_root: media_root.clone(),
            db_pool_size,
        };
        let rocket = yatube::rocket(config).expect("valid rocket instance");
        let client = Client::tracked(rocket).expect("valid client");
        TestApp {
            client,
            database,
            media_root,
        }
    }

    pub fn conn(&self) -> r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>> {
        self.client
            .rocket()
            .state::<Pool>()
            .expect("managed pool")
            .get()
            .expect("pooled connection")
    }

    pub fn clear_cache(&self) {
        self.client
            .rocket()
            .state::<PageCache>()
            .expect("managed cache")
            .clear();
    }

    pub fn media_root(&self) -> &PathBuf {
        &self.media_root
    }

    pub fn user(&self, username: &str) -> User {
        NewUser {
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: format!("unusable-password-of-{}", username),
        }
        .insert(&mut self.conn())
        .expect("user inserted")
    }

    pub fn group(&self, title: &str, slug: &str) -> Group {
        Group::create(&mut self.conn(), title, Some(slug), "group description").expect("group inserted")
    }

    /// Inserts a post `age_minutes` in the past, so callers control ordering.
    pub fn post_aged(&self, author: &User, text: &str, group: Option<&Group>, age_minutes: i64) -> Post {
        NewPost {
            text: text.to_string(),
            created: (Utc::now() - ChronoDuration::minutes(age_minutes)).naive_utc(),
            author_id: author.id,
            group_id: group.map(|g| g.id),
            image: None,
        }
        .insert(&mut self.conn())
        .expect("post inserted")
    }

    pub fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.post_aged(author, text, group, 0)
    }

    pub fn follow_edge(&self, user: &User, author: &User) {
        diesel::insert_into(follows::table)
            .values((follows::user_id.eq(user.id), follows::author_id.eq(author.id)))
            .execute(&mut *self.conn())
            .expect("follow inserted");
    }

    pub fn follow_count(&self, user: &User, author: &User) -> i64 {
        follows::table
            .filter(follows::user_id.eq(user.id))
            .filter(follows::author_id.eq(author.id))
            .count()
            .get_result(&mut *self.conn())
            .expect("follow count")
    }

    pub fn post_count(&self) -> i64 {
        posts::table.count().get_result(&mut *self.conn()).expect("post count")
    }

    pub fn comment_count(&self) -> i64 {
        comments::table.count().get_result(&mut *self.conn()).expect("comment count")
    }

    pub fn load_post(&self, post_id: i32) -> Option<Post> {
        posts::table
            .find(post_id)
            .first::<Post>(&mut *self.conn())
            .optional()
            .expect("post query")
    }

    pub fn get(&self, uri: &str, user: Option<&User>) -> LocalResponse<'_> {
        let mut request = self.client.get(uri.to_string());
        if let Some(user) = user {
            request = request.header(auth(user));
        }
        request.dispatch()
    }

    pub fn get_json(&self, uri: &str, user: Option<&User>) -> Value {
        let response = self.get(uri, user);
        assert_eq!(response.status(), Status::Ok, "GET {}", uri);
        response.into_json::<Value>().expect("json body")
    }

    /// Lists the files stored under the upload directory.
    pub fn uploads(&self) -> Vec<String> {
        match fs::read_dir(self.media_root.join("posts")) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn post_json(&self, uri: &str, user: Option<&User>, body: Value) -> LocalResponse<'_> {
        let mut request = self
            .client
            .post(uri.to_string())
            .header(ContentType::JSON)
            .body(body.to_string());
        if let Some(user) = user {
            request = request.header(auth(user));
        }
        request.dispatch()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        fs::remove_file(&self.database).ok();
        fs::remove_dir_all(&self.media_root).ok();
    }
}

pub fn auth(user: &User) -> Header<'static> {
    Header::new("Authorization", format!("Token {}", user.token().expect("token")))
}

pub fn location(response: &LocalResponse<'_>) -> String {
    response
        .headers()
        .get_one("Location")
        .expect("redirect location")
        .to_string()
}

pub fn texts(page: &Value) -> Vec<String> {
    page["posts"]
        .as_array()
        .expect("posts array")
        .iter()
        .map(|post| post["text"].as_str().expect("post text").to_string())
        .collect()
}
