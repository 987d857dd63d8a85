//! Integration tests for the feed command against a mock backend.


use fixtures::{can_bind_localhost, page_response, quill, read_storage, temp_quill_home};
use predicates::prelude::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_visit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/visit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_feed_pages_until_last() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;
    mount_visit(&server).await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "0"))
        .respond_with(page_response(1..11, &[], false))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "1"))
        .respond_with(page_response(11..21, &[], true))
        .expect(1)
        .mount(&server)
        .await;

    quill(home.path(), &server)
        .args(["feed", "--pages", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Post 1 "))
        .stdout(predicate::str::contains("Post 20"))
        .stdout(predicate::str::contains("(end of feed)"));

    assert!(read_storage(home.path()).get("last_visit").is_some());
}

#[tokio::test]
async fn test_feed_interactive_filter_change() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;
    mount_visit(&server).await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "0"))
        .and(query_param("tags", "go"))
        .respond_with(page_response(100..102, &["go"], true))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "0"))
        .respond_with(page_response(1..11, &[], false))
        .expect(1)
        .mount(&server)
        .await;

    quill(home.path(), &server)
        .arg("feed")
        .write_stdin("tags go\n\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing posts tagged go"))
        .stdout(predicate::str::contains("Post 101"))
        .stdout(predicate::str::contains("(end of feed)"));
}

#[tokio::test]
async fn test_feed_reports_server_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;
    mount_visit(&server).await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    quill(home.path(), &server)
        .args(["feed", "--pages", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP 503"));
}
