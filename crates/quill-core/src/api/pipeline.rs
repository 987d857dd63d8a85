//! Authenticated request pipeline.
//!
//! Every backend call goes through [`RequestPipeline::send`]. Outbound, the
//! stored credential is attached as a bearer header. Inbound:
//!
//! - success passes through unchanged; a renewed credential the server attached
//!   to it is stored for later calls;
//! - 401 carrying `Authorization: Bearer <new>` is a renewal: the new credential
//!   is stored and the original request is rebuilt and sent exactly once more;
//! - 401 without that header clears the session and fails as unauthenticated;
//! - anything else is surfaced to the caller as an [`ApiError`].
//!
//! Requests are described by a builder closure rather than a built request so
//! the original call can be re-issued after a renewal (multipart bodies cannot
//! be cloned).

use std::time::Duration;

use anyhow::Context;
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use crate::session::CredentialStore;

/// Standard User-Agent header for quill API requests.
pub const USER_AGENT: &str = concat!("quill/", env!("CARGO_PKG_VERSION"));

/// Cookie the server renews credentials from.
pub const REFRESH_COOKIE_NAME: &str = "my_blog_refresh_token";

const BEARER_PREFIX: &str = "Bearer ";

/// Wraps every outgoing call to the backend.
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
}

impl RequestPipeline {
    /// Creates a pipeline for `base_url` (including any path prefix, e.g. `/api`).
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        credentials: CredentialStore,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Joins an endpoint path (starting with `/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Sends a request, renewing the credential and retrying once if the server asks.
    ///
    /// `build` must not set the `Authorization` header; the pipeline owns it.
    ///
    /// # Errors
    /// Returns an [`ApiError`] for transport failures, non-success statuses,
    /// and terminal authentication failures.
    pub async fn send<F>(&self, build: F) -> ApiResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let sent = self.credentials.get();
        let response = self.dispatch(&build, sent.as_deref()).await?;

        let status = response.status();
        if status.is_success() {
            self.accept_renewal(sent.as_deref(), response.headers());
            return Ok(response);
        }
        if status != StatusCode::UNAUTHORIZED {
            return Err(ApiError::from_response(response).await);
        }

        let Some(fresh) = renewed_credential(response.headers()) else {
            warn!("unauthorized without renewal; clearing session");
            self.clear_session();
            return Err(ApiError::unauthenticated("Authentication required"));
        };

        let token = self
            .credentials
            .renew(sent.as_deref(), &fresh)
            .map_err(|e| ApiError::storage(&e))?;
        info!("retrying request with renewed credential");

        let retried = self.dispatch(&build, Some(&token)).await?;
        let status = retried.status();
        if status.is_success() {
            self.accept_renewal(Some(&token), retried.headers());
            Ok(retried)
        } else if status == StatusCode::UNAUTHORIZED {
            warn!("unauthorized after renewal; clearing session");
            self.clear_session();
            Err(ApiError::unauthenticated(
                "Authentication rejected after credential renewal",
            ))
        } else {
            Err(ApiError::from_response(retried).await)
        }
    }

    /// Sends a request that establishes a session (login, signup).
    ///
    /// No credential is attached and a 401 is returned as is: a rejected
    /// password must not end the session that is already stored.
    ///
    /// # Errors
    /// Returns an [`ApiError`] for transport failures and non-success statuses.
    pub async fn send_unauthenticated<F>(&self, build: F) -> ApiResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let response = self.dispatch(&build, None).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response).await)
        }
    }

    /// Sends a request and decodes a JSON body.
    ///
    /// # Errors
    /// Same as [`Self::send`], plus [`super::ApiErrorKind::Parse`] for bodies
    /// that do not match `T`.
    pub async fn send_json<T, F>(&self, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let response = self.send(build).await?;
        decode_json(response).await
    }

    /// Sends a request whose response body is ignored.
    ///
    /// # Errors
    /// Same as [`Self::send`].
    pub async fn send_unit<F>(&self, build: F) -> ApiResult<()>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        self.send(build).await.map(drop)
    }

    async fn dispatch<F>(&self, build: &F, token: Option<&str>) -> ApiResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut builder = build(&self.http);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(cookie) = self.credentials.refresh_cookie() {
            builder = builder.header(COOKIE, cookie);
        }

        let request = builder.build().map_err(|e| ApiError::transport(&e))?;
        debug!(method = %request.method(), url = %request.url(), authenticated = token.is_some(), "sending request");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| ApiError::transport(&e))?;
        debug!(status = response.status().as_u16(), url = %response.url(), "received response");

        self.capture_refresh_cookie(response.headers());
        Ok(response)
    }

    fn capture_refresh_cookie(&self, headers: &HeaderMap) {
        let Some(cookie) = refresh_cookie(headers) else {
            return;
        };
        if let Err(e) = self.credentials.set_refresh_cookie(&cookie) {
            warn!("failed to persist refresh cookie: {e:#}");
        }
    }

    /// Stores a credential the server renewed on a successful response.
    fn accept_renewal(&self, sent: Option<&str>, headers: &HeaderMap) {
        let Some(fresh) = renewed_credential(headers) else {
            return;
        };
        if sent == Some(fresh.as_str()) {
            return;
        }
        if let Err(e) = self.credentials.renew(sent, &fresh) {
            warn!("failed to persist renewed credential: {e:#}");
        }
    }

    fn clear_session(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!("failed to clear session: {e:#}");
        }
    }
}

/// Extracts the renewed credential from an `Authorization: Bearer <token>` response header.
pub fn renewed_credential(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix(BEARER_PREFIX)
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Extracts `name=value` of the refresh cookie from `Set-Cookie` headers.
/// Deletions (empty value) are ignored.
fn refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .is_some_and(|(name, value)| name == REFRESH_COOKIE_NAME && !value.is_empty())
        })
        .map(str::to_string)
}

/// Reads a response body as JSON.
///
/// # Errors
/// Returns a transport error if the body cannot be read, or a parse error if it
/// does not decode as `T`.
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.text().await.map_err(|e| ApiError::transport(&e))?;
    serde_json::from_str(&body)
        .map_err(|e| ApiError::parse(format!("Failed to parse response: {e}"), &body))
}
