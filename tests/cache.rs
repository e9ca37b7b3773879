mod common;

use diesel::prelude::*;

use common::{texts, TestApp};

#[test]
fn index_is_served_from_cache() {
    let app = TestApp::new();
    let author = app.user("author");
    let post = app.post(&author, "cached text", None);

    let first = app.get_json("/", None);
    assert_eq!(texts(&first["page"]), vec!["cached text"]);

    diesel::delete(yatube::db::schema::posts::table)
        .execute(&mut *app.conn())
        .expect("posts removed");
    assert!(app.load_post(post.id).is_none());

    let cached = app.get_json("/", None);
    assert_eq!(cached, first);

    app.clear_cache();
    let fresh = app.get_json("/", None);
    assert!(texts(&fresh["page"]).is_empty());
}

#[test]
fn each_page_has_its_own_entry() {
    let app = TestApp::with_page_size(1);
    let author = app.user("author");
    app.post_aged(&author, "older", None, 5);
    app.post(&author, "newer", None);

    assert_eq!(texts(&app.get_json("/", None)["page"]), vec!["newer"]);
    assert_eq!(texts(&app.get_json("/?page=2", None)["page"]), vec!["older"]);
}

#[test]
fn other_feeds_are_not_cached() {
    let app = TestApp::new();
    let author = app.user("author");
    app.post(&author, "first", None);
    assert_eq!(texts(&app.get_json("/profile/author/", None)["page"]), vec!["first"]);

    app.post(&author, "second", None);
    assert_eq!(app.get_json("/profile/author/", None)["page"]["count"], 2);
}
