//! Wire types consumed from the blog backend.
//!
//! Timestamps are server-local (`LocalDateTime` on the backend), so they
//! decode as [`NaiveDateTime`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type PostId = i64;
pub type CommentId = i64;

/// Post summary as listed in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    /// Content preview
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_name: String,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub like_count: u64,
    /// Display order is preserved
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub content: Vec<PostSummary>,
    /// True when no page follows this one
    pub last: bool,
}

/// Full post as shown on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub title: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author_name: String,
    #[serde(rename = "commentListDtoList", default)]
    pub comments: Vec<Comment>,
}

/// Comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub anonymous_name: Option<String>,
}

impl Comment {
    /// Name shown next to the comment.
    pub fn display_name(&self) -> &str {
        let name = if self.anonymous {
            self.anonymous_name.as_deref()
        } else {
            self.author_name.as_deref()
        };
        name.filter(|n| !n.trim().is_empty()).unwrap_or("anonymous")
    }
}

/// Body of `POST /comments` and `PUT /comments/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    pub post_id: PostId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_password: Option<String>,
}

impl NewComment {
    /// Comment by a registered user.
    pub fn by_user(post_id: PostId, user_id: i64, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            post_id,
            user_id: Some(user_id),
            anonymous: false,
            anonymous_name: None,
            delete_password: None,
        }
    }

    /// Anonymous comment guarded by a delete password.
    pub fn anonymous(
        post_id: PostId,
        name: impl Into<String>,
        delete_password: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            post_id,
            user_id: None,
            anonymous: true,
            anonymous_name: Some(name.into()),
            delete_password: Some(delete_password.into()),
        }
    }
}

/// Proof of authorship for editing or deleting a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAuth {
    /// Registered author
    User(i64),
    /// Anonymous author's delete password
    Password(String),
}

impl CommentAuth {
    /// Query parameter carrying the proof.
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            CommentAuth::User(id) => ("userId", id.to_string()),
            CommentAuth::Password(password) => ("deletePassword", password.clone()),
        }
    }
}

/// Body of `POST /posts/create` and `PUT /posts/update/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tags: &str) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tags: parse_tags(tags),
        }
    }
}

/// Splits a comma-separated tag list, trimming entries and dropping blanks and repeats.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Response of post create/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdResponse {
    #[serde(alias = "id")]
    pub post_id: PostId,
}

/// Response of `POST /posts/upload-image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
}

/// Response of `POST /posts/{id}/like`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub total_likes: u64,
    #[serde(default)]
    pub post_id: Option<PostId>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /posts/{id}/like`.
///
/// Some servers also return the current total; it is used when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    #[serde(default)]
    pub total_likes: Option<u64>,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Account returned by login and signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Response of `GET /verify-auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub role: Option<String>,
}

/// Response of `GET /sidebar-data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarData {
    pub visitor_counts: VisitorCounts,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorCounts {
    pub total: u64,
    pub today: u64,
    pub yesterday: u64,
}
