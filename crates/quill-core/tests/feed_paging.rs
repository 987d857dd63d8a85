//! Integration tests for feed paging against a mock backend.

mod fixtures;

use fixtures::{can_bind_localhost, client, page_response};
use quill_core::feed::{Feed, FetchOutcome, TagFilter};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_two_pages_then_exhausted() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "0"))
        .and(query_param("size", "10"))
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

    let (client, _store) = client(&server);
    let feed = Feed::new(client, 10);

    assert_eq!(
        feed.change_filter(TagFilter::default()).await,
        FetchOutcome::Replaced { count: 10 }
    );
    assert!(feed.has_more());

    let outcome = feed.load_more().await;
    assert_eq!(
        outcome,
        Some(FetchOutcome::Appended {
            added: 10,
            duplicates: 0
        })
    );

    let ids: Vec<i64> = feed.posts().iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..21).collect::<Vec<_>>());
    assert!(!feed.has_more());
    assert_eq!(feed.load_more().await, None);
}

#[tokio::test]
async fn test_tag_filter_resets_to_page_zero() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "0"))
        .and(query_param("tags", "go"))
        .respond_with(page_response(50..53, &["go"], true))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "1"))
        .respond_with(page_response(11..21, &[], false))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "0"))
        .respond_with(page_response(1..11, &[], false))
        .mount(&server)
        .await;

    let (client, _store) = client(&server);
    let feed = Feed::new(client, 10);

    feed.change_filter(TagFilter::default()).await;
    feed.load_more().await;
    assert_eq!(feed.posts().len(), 20);

    let outcome = feed.change_filter(TagFilter::parse("go")).await;

    assert_eq!(outcome, FetchOutcome::Replaced { count: 3 });
    let posts = feed.posts();
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().all(|p| p.tags == ["go"]));
    assert_eq!(feed.with_state(|s| s.current_page()), 0);
    assert!(!feed.has_more());
}

#[tokio::test]
async fn test_failed_page_keeps_list_and_has_more() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "0"))
        .respond_with(page_response(1..11, &[], false))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client(&server);
    let feed = Feed::new(client, 10);
    feed.change_filter(TagFilter::default()).await;

    let outcome = feed.load_more().await;

    assert!(matches!(outcome, Some(FetchOutcome::Failed(_))));
    assert_eq!(feed.posts().len(), 10);
    assert!(feed.has_more());
    assert!(feed.with_state(|s| s.last_error().is_some()));
}

#[tokio::test]
async fn test_empty_feed_is_not_an_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(page_response(0..0, &[], true))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client(&server);
    let feed = Feed::new(client, 10);
    feed.change_filter(TagFilter::parse("nothing")).await;

    assert!(feed.with_state(|s| s.is_empty_feed()));
    assert_eq!(feed.load_more().await, None);
}
