//! Shared helpers for quill-core integration tests.

#![allow(dead_code)]

use std::ops::Range;
use std::sync::Arc;

use quill_core::api::{BlogClient, RequestPipeline};
use quill_core::session::CredentialStore;
use quill_core::storage::{KeyValueStore, MemoryStore, SharedStore};
use serde_json::{Value, json};
use wiremock::{MockServer, ResponseTemplate};

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Client pointed at `server`, with state kept in a fresh in-memory store.
pub fn client(server: &MockServer) -> (BlogClient, SharedStore) {
    let store = MemoryStore::shared();
    (client_with_store(server, Arc::clone(&store)), store)
}

pub fn client_with_store(server: &MockServer, store: SharedStore) -> BlogClient {
    let pipeline = RequestPipeline::new(server.uri(), CredentialStore::new(store), None)
        .expect("build pipeline");
    BlogClient::new(pipeline)
}

/// Store already holding `token` as the access credential.
pub fn store_with_token(token: &str) -> SharedStore {
    let store = MemoryStore::shared();
    store.set("access_token", token).unwrap();
    store
}

pub fn post_json(id: i64, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "title": format!("Post {id}"),
        "content": "preview",
        "authorName": "kim",
        "createdAt": "2024-05-01T10:00:00",
        "likeCount": 0,
        "tags": tags,
    })
}

/// Spring-style page body.
pub fn page_json(ids: Range<i64>, tags: &[&str], last: bool) -> Value {
    let content: Vec<Value> = ids.map(|id| post_json(id, tags)).collect();
    json!({ "content": content, "last": last })
}

pub fn page_response(ids: Range<i64>, tags: &[&str], last: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(page_json(ids, tags, last))
}

pub fn detail_json(title: &str) -> Value {
    json!({
        "title": title,
        "content": "body",
        "createdAt": "2024-05-01T10:00:00",
        "likeCount": 3,
        "tags": ["go"],
        "authorName": "kim",
        "commentListDtoList": []
    })
}
