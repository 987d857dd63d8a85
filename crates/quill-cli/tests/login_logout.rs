//! Integration tests for login/logout commands.


use fixtures::{can_bind_localhost, quill, read_storage, temp_quill_home, write_storage};
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_stores_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"email": "kim@example.com", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("authorization", "Bearer issued-token-value")
                .set_body_json(json!({"id": 7, "username": "kim", "email": "kim@example.com"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Password comes from stdin when not passed as a flag.
    quill(home.path(), &server)
        .args(["login", "--email", "kim@example.com"])
        .write_stdin("secret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as kim"))
        .stdout(predicate::str::contains("issued-token-value").not());

    let storage = read_storage(home.path());
    assert_eq!(storage["access_token"], "issued-token-value");
    assert_eq!(storage["user_id"], "7");
}

#[tokio::test]
async fn test_login_rejected() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    quill(home.path(), &server)
        .args(["login", "--email", "kim@example.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid email or password"));

    assert!(read_storage(home.path()).get("access_token").is_none());
}

#[tokio::test]
async fn test_logout_clears_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;
    write_storage(
        home.path(),
        &json!({"access_token": "tok", "user_id": "7", "device_id": "dev-1"}),
    );

    quill(home.path(), &server)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out"));

    let storage = read_storage(home.path());
    assert!(storage.get("access_token").is_none());
    assert!(storage.get("user_id").is_none());
    // The device id outlives the session.
    assert_eq!(storage["device_id"], "dev-1");

    quill(home.path(), &server)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[tokio::test]
async fn test_expired_session_hints_login() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;
    write_storage(home.path(), &json!({"access_token": "stale"}));

    Mock::given(method("POST"))
        .and(path("/secure/role-change-request"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    quill(home.path(), &server)
        .arg("request-author")
        .assert()
        .failure()
        .stderr(predicate::str::contains("quill login"));

    assert!(read_storage(home.path()).get("access_token").is_none());
}

#[tokio::test]
async fn test_whoami_when_logged_out() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_quill_home();
    let server = MockServer::start().await;

    quill(home.path(), &server)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}
