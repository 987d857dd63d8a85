//! Typed blog API client.
//!
//! Thin endpoint wrappers; all calls go through [`RequestPipeline`].

use std::sync::Arc;

use anyhow::Context;
use reqwest::multipart::{Form, Part};
use tracing::info;

use super::error::{ApiError, ApiErrorKind, ApiResult};
use super::pipeline::{RequestPipeline, decode_json, renewed_credential};
use super::types::{
    AuthStatus, Comment, CommentAuth, CommentId, FeedPage, LikeResponse, LikeStatus,
    LoginRequest, NewComment, PostDetail, PostDraft, PostId, PostIdResponse, SidebarData,
    SignupRequest, UploadedImage, UserProfile,
};
use crate::config::Config;
use crate::session::{CredentialStore, DeviceId};
use crate::storage::SharedStore;

/// Blog API client.
#[derive(Debug, Clone)]
pub struct BlogClient {
    pipeline: Arc<RequestPipeline>,
}

impl BlogClient {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Builds a client from config, with credentials kept in `store`.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn from_config(config: &Config, store: SharedStore) -> anyhow::Result<Self> {
        let base_url = config.effective_base_url()?;
        let pipeline = RequestPipeline::new(
            base_url,
            CredentialStore::new(store),
            config.request_timeout(),
        )
        .context("create request pipeline")?;
        Ok(Self::new(pipeline))
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.pipeline.credentials()
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// `GET /posts?page=&size=&tags=`. An empty tag list means no tag constraint.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn list_posts(&self, page: u32, size: u32, tags: &[String]) -> ApiResult<FeedPage> {
        let url = self.pipeline.url("/posts");
        let joined = tags.join(",");
        self.pipeline
            .send_json(|http| {
                let request = http
                    .get(&url)
                    .query(&[("page", page.to_string()), ("size", size.to_string())]);
                if joined.is_empty() {
                    request
                } else {
                    request.query(&[("tags", joined.as_str())])
                }
            })
            .await
    }

    /// `GET /posts/{id}`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn get_post(&self, post_id: PostId) -> ApiResult<PostDetail> {
        let url = self.pipeline.url(&format!("/posts/{post_id}"));
        self.pipeline.send_json(|http| http.get(&url)).await
    }

    /// `POST /posts/create`.
    ///
    /// # Errors
    /// Returns a precondition error for an empty title or body, otherwise an
    /// [`ApiError`] if the request fails.
    pub async fn create_post(&self, draft: &PostDraft) -> ApiResult<PostId> {
        validate_draft(draft)?;
        let url = self.pipeline.url("/posts/create");
        let response: PostIdResponse = self
            .pipeline
            .send_json(|http| http.post(&url).json(draft))
            .await?;
        info!(post_id = response.post_id, "post created");
        Ok(response.post_id)
    }

    /// `PUT /posts/update/{id}`.
    ///
    /// # Errors
    /// Returns a precondition error for an empty title or body, otherwise an
    /// [`ApiError`] if the request fails.
    pub async fn update_post(&self, post_id: PostId, draft: &PostDraft) -> ApiResult<PostId> {
        validate_draft(draft)?;
        let url = self.pipeline.url(&format!("/posts/update/{post_id}"));
        let response: PostIdResponse = self
            .pipeline
            .send_json(|http| http.put(&url).json(draft))
            .await?;
        Ok(response.post_id)
    }

    /// `DELETE /posts/{id}`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn delete_post(&self, post_id: PostId) -> ApiResult<()> {
        let url = self.pipeline.url(&format!("/posts/{post_id}"));
        self.pipeline.send_unit(|http| http.delete(&url)).await
    }

    /// `POST /posts/upload-image` as multipart field `image`. Returns the image URL.
    ///
    /// # Errors
    /// Returns a precondition error for an empty file, otherwise an
    /// [`ApiError`] if the request fails.
    pub async fn upload_image(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<String> {
        if bytes.is_empty() {
            return Err(ApiError::precondition("Image file is empty"));
        }
        let url = self.pipeline.url("/posts/upload-image");
        let file_name = file_name.to_string();
        let uploaded: UploadedImage = self
            .pipeline
            .send_json(|http| {
                let part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                http.post(&url).multipart(Form::new().part("image", part))
            })
            .await?;
        Ok(uploaded.url)
    }

    // ------------------------------------------------------------------
    // Likes
    // ------------------------------------------------------------------

    /// `POST /posts/{id}/like?deviceId=`. The server flips the like for this device.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn toggle_like(&self, post_id: PostId, device: &DeviceId) -> ApiResult<LikeResponse> {
        let url = self.pipeline.url(&format!("/posts/{post_id}/like"));
        self.pipeline
            .send_json(|http| http.post(&url).query(&[("deviceId", device.as_str())]))
            .await
    }

    /// `GET /posts/{id}/like?deviceId=`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn like_status(&self, post_id: PostId, device: &DeviceId) -> ApiResult<LikeStatus> {
        let url = self.pipeline.url(&format!("/posts/{post_id}/like"));
        self.pipeline
            .send_json(|http| http.get(&url).query(&[("deviceId", device.as_str())]))
            .await
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// `GET /comments/post/{postId}`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn list_comments(&self, post_id: PostId) -> ApiResult<Vec<Comment>> {
        let url = self.pipeline.url(&format!("/comments/post/{post_id}"));
        self.pipeline.send_json(|http| http.get(&url)).await
    }

    /// `POST /comments`.
    ///
    /// # Errors
    /// Returns a precondition error for an incomplete comment, otherwise an
    /// [`ApiError`] if the request fails.
    pub async fn create_comment(&self, comment: &NewComment) -> ApiResult<Comment> {
        validate_comment(comment)?;
        let url = self.pipeline.url("/comments");
        self.pipeline
            .send_json(|http| http.post(&url).json(comment))
            .await
    }

    /// `PUT /comments/{id}?userId=|deletePassword=`.
    ///
    /// # Errors
    /// Returns a precondition error for an incomplete comment, otherwise an
    /// [`ApiError`] if the request fails.
    pub async fn update_comment(
        &self,
        comment_id: CommentId,
        comment: &NewComment,
        auth: &CommentAuth,
    ) -> ApiResult<Comment> {
        validate_comment(comment)?;
        let url = self.pipeline.url(&format!("/comments/{comment_id}"));
        let pair = auth.query_pair();
        self.pipeline
            .send_json(|http| http.put(&url).query(&[(pair.0, pair.1.as_str())]).json(comment))
            .await
    }

    /// `DELETE /comments/{id}?userId=|deletePassword=`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn delete_comment(&self, comment_id: CommentId, auth: &CommentAuth) -> ApiResult<()> {
        let url = self.pipeline.url(&format!("/comments/{comment_id}"));
        let pair = auth.query_pair();
        self.pipeline
            .send_unit(|http| http.delete(&url).query(&[(pair.0, pair.1.as_str())]))
            .await
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// `POST /login`. Stores the issued credential on success.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails or no credential was issued.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<UserProfile> {
        let url = self.pipeline.url("/login");
        let body = LoginRequest { email, password };
        let response = self
            .pipeline
            .send_unauthenticated(|http| http.post(&url).json(&body))
            .await
            .map_err(|e| {
                if e.is_unauthenticated() {
                    ApiError::unauthenticated("Invalid email or password")
                } else {
                    e
                }
            })?;
        self.accept_issued_credential(response).await
    }

    /// `POST /signup`. Stores the issued credential on success.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails or no credential was issued.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<UserProfile> {
        let url = self.pipeline.url("/signup");
        let body = SignupRequest {
            username,
            email,
            password,
        };
        let response = self
            .pipeline
            .send_unauthenticated(|http| http.post(&url).json(&body))
            .await?;
        self.accept_issued_credential(response).await
    }

    async fn accept_issued_credential(&self, response: reqwest::Response) -> ApiResult<UserProfile> {
        let token = renewed_credential(response.headers()).ok_or_else(|| {
            ApiError::new(
                ApiErrorKind::HttpStatus,
                "Server did not issue a credential (Authorization header missing)",
            )
        })?;
        let profile: UserProfile = decode_json(response).await?;
        self.credentials()
            .set(&token)
            .and_then(|()| self.credentials().set_user_id(profile.id))
            .map_err(|e| ApiError::storage(&e))?;
        info!(user_id = profile.id, "logged in");
        Ok(profile)
    }

    /// Forgets the local session. Returns whether a credential was present.
    ///
    /// # Errors
    /// Returns a storage error if the removal cannot be persisted.
    pub fn logout(&self) -> ApiResult<bool> {
        self.credentials()
            .clear()
            .map_err(|e| ApiError::storage(&e))
    }

    /// `GET /verify-auth`. A rejected session reads as unauthenticated rather than an error.
    ///
    /// # Errors
    /// Returns an [`ApiError`] for failures other than authentication.
    pub async fn verify_auth(&self) -> ApiResult<AuthStatus> {
        let url = self.pipeline.url("/verify-auth");
        match self.pipeline.send_json(|http| http.get(&url)).await {
            Ok(status) => Ok(status),
            Err(e) if e.is_unauthenticated() => Ok(AuthStatus {
                authenticated: false,
                role: None,
            }),
            Err(e) => Err(e),
        }
    }

    /// `POST /secure/role-change-request`: asks an admin for author permission.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn request_author_role(&self) -> ApiResult<()> {
        let url = self.pipeline.url("/secure/role-change-request");
        self.pipeline.send_unit(|http| http.post(&url)).await
    }

    // ------------------------------------------------------------------
    // Sidebar and visits
    // ------------------------------------------------------------------

    /// `GET /sidebar-data`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn sidebar(&self) -> ApiResult<SidebarData> {
        let url = self.pipeline.url("/sidebar-data");
        self.pipeline.send_json(|http| http.get(&url)).await
    }

    /// `POST /visit`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the request fails.
    pub async fn record_visit(&self) -> ApiResult<()> {
        let url = self.pipeline.url("/visit");
        self.pipeline.send_unit(|http| http.post(&url)).await
    }
}

fn validate_draft(draft: &PostDraft) -> ApiResult<()> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::precondition("Post title must not be empty"));
    }
    if draft.content.trim().is_empty() {
        return Err(ApiError::precondition("Post content must not be empty"));
    }
    Ok(())
}

fn validate_comment(comment: &NewComment) -> ApiResult<()> {
    if comment.content.trim().is_empty() {
        return Err(ApiError::precondition("Comment must not be empty"));
    }
    if comment.anonymous {
        let has_name = comment
            .anonymous_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        let has_password = comment
            .delete_password
            .as_deref()
            .is_some_and(|p| !p.is_empty());
        if !has_name || !has_password {
            return Err(ApiError::precondition(
                "Anonymous comments need a name and a delete password",
            ));
        }
    } else if comment.user_id.is_none() {
        return Err(ApiError::precondition(
            "Comments need a user id or must be anonymous",
        ));
    }
    Ok(())
}
