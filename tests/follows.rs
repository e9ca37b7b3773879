mod common;

use rocket::http::Status;

use common::{location, texts, TestApp};

#[test]
fn follow_creates_single_edge() {
    let app = TestApp::new();
    let author = app.user("author");
    let reader = app.user("reader");

    let response = app.get("/profile/author/follow/", Some(&reader));
    assert_eq!(response.status(), Status::Found);
    assert_eq!(location(&response), "/profile/author/");
    assert_eq!(app.follow_count(&reader, &author), 1);

    app.get("/profile/author/follow/", Some(&reader));
    assert_eq!(app.follow_count(&reader, &author), 1);
}

#[test]
fn following_yourself_is_ignored() {
    let app = TestApp::new();
    let author = app.user("author");

    let response = app.get("/profile/author/follow/", Some(&author));
    assert_eq!(response.status(), Status::Found);
    assert_eq!(app.follow_count(&author, &author), 0);

    let page = app.get_json("/profile/author/", Some(&author));
    assert_eq!(page["following"], false);
}

#[test]
fn unfollow_removes_edge() {
    let app = TestApp::new();
    let author = app.user("author");
    let reader = app.user("reader");
    app.follow_edge(&reader, &author);

    let response = app.get("/profile/author/unfollow/", Some(&reader));
    assert_eq!(response.status(), Status::Found);
    assert_eq!(location(&response), "/profile/author/");
    assert_eq!(app.follow_count(&reader, &author), 0);
}

#[test]
fn unfollow_without_edge_is_missing() {
    let app = TestApp::new();
    app.user("author");
    let reader = app.user("reader");

    let response = app.get("/profile/author/unfollow/", Some(&reader));
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn profile_reports_follow_state() {
    let app = TestApp::new();
    let author = app.user("author");
    let reader = app.user("reader");
    let stranger = app.user("stranger");
    app.follow_edge(&reader, &author);

    assert_eq!(app.get_json("/profile/author/", Some(&reader))["following"], true);
    assert_eq!(app.get_json("/profile/author/", Some(&stranger))["following"], false);
    assert_eq!(app.get_json("/profile/author/", None)["following"], false);
}

#[test]
fn follow_feed_shows_followed_authors_only() {
    let app = TestApp::new();
    let author = app.user("author");
    let reader = app.user("reader");
    let stranger = app.user("stranger");
    app.follow_edge(&reader, &author);
    app.post(&author, "for followers", None);
    app.post(&stranger, "unrelated", None);

    let page = app.get_json("/follow/", Some(&reader));
    assert_eq!(texts(&page["page"]), vec!["for followers"]);

    let page = app.get_json("/follow/", Some(&stranger));
    assert!(texts(&page["page"]).is_empty());
}

#[test]
fn follow_routes_require_login() {
    let app = TestApp::new();
    app.user("author");

    for (uri, next) in [
        ("/follow/", "/follow/"),
        ("/profile/author/follow/", "/profile/author/follow/"),
        ("/profile/author/unfollow/", "/profile/author/unfollow/"),
    ]
    .iter()
    {
        let response = app.get(uri, None);
        assert_eq!(response.status(), Status::Found, "{}", uri);
        assert_eq!(location(&response), format!("/auth/login/?next={}", next));
    }
}

#[test]
fn follow_unknown_author_is_missing() {
    let app = TestApp::new();
    let reader = app.user("reader");
    assert_eq!(app.get("/profile/ghost/follow/", Some(&reader)).status(), Status::NotFound);
}

#[test]
fn logged_in_pages_work_with_single_connection() {
    let app = TestApp::with_pool_size(1);
    let author = app.user("author");
    let reader = app.user("reader");
    app.post(&author, "only post", None);

    let response = app.get("/profile/author/follow/", Some(&reader));
    assert_eq!(response.status(), Status::Found);

    let page = app.get_json("/follow/", Some(&reader));
    assert_eq!(texts(&page["page"]), vec!["only post"]);
    assert_eq!(app.get_json("/profile/author/", Some(&reader))["following"], true);
    assert_eq!(app.get("/create/", Some(&reader)).status(), Status::Ok);
}
