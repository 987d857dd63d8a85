//! Like toggling for a single post.
//!
//! The server owns the like state. The coordinator never predicts the result
//! of a toggle; it only applies what the server returns. Every call is
//! numbered when issued, and a response is applied only if no later-issued
//! call has already been applied, so a slow response cannot overwrite a newer
//! one when toggles race.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use crate::api::{ApiError, ApiResult, BlogClient, LikeResponse, LikeStatus, PostId};
use crate::session::DeviceId;

/// Like state of one post as last reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    /// Whether this device has liked the post
    pub liked: bool,
    pub total_likes: u64,
}

/// Backend operations the coordinator needs.
pub trait LikeSource {
    fn toggle(
        &self,
        post_id: PostId,
        device: &DeviceId,
    ) -> impl Future<Output = ApiResult<LikeResponse>> + Send;

    fn status(
        &self,
        post_id: PostId,
        device: &DeviceId,
    ) -> impl Future<Output = ApiResult<LikeStatus>> + Send;
}

impl LikeSource for BlogClient {
    async fn toggle(&self, post_id: PostId, device: &DeviceId) -> ApiResult<LikeResponse> {
        self.toggle_like(post_id, device).await
    }

    async fn status(&self, post_id: PostId, device: &DeviceId) -> ApiResult<LikeStatus> {
        self.like_status(post_id, device).await
    }
}

#[derive(Debug, Default)]
struct Tracker {
    state: LikeState,
    issued: u64,
    applied: u64,
}

impl Tracker {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Applies `next` if `seq` is newer than anything applied so far.
    fn apply(&mut self, seq: u64, next: LikeState) -> LikeState {
        if seq > self.applied {
            self.applied = seq;
            self.state = next;
        } else {
            debug!(seq, applied = self.applied, "ignoring superseded like response");
        }
        self.state
    }
}

/// Reconciles the like state of one post with the server.
#[derive(Debug)]
pub struct LikeCoordinator<S> {
    source: S,
    post_id: PostId,
    tracker: Mutex<Tracker>,
}

impl<S: LikeSource> LikeCoordinator<S> {
    /// Starts with the total from the post detail and `liked = false` until
    /// [`Self::load_status`] reports otherwise.
    pub fn new(source: S, post_id: PostId, total_likes: u64) -> Self {
        Self {
            source,
            post_id,
            tracker: Mutex::new(Tracker {
                state: LikeState {
                    liked: false,
                    total_likes,
                },
                ..Tracker::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn state(&self) -> LikeState {
        self.lock().state
    }

    /// Reads whether this device already liked the post. Does not change server state.
    ///
    /// Without a device id there is nothing to look up; the current state is returned.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the status request fails.
    pub async fn load_status(&self, device: Option<&DeviceId>) -> ApiResult<LikeState> {
        let Some(device) = device else {
            debug!(post_id = self.post_id, "no device id; skipping like status");
            return Ok(self.state());
        };

        let seq = self.lock().issue();
        let status = self.source.status(self.post_id, device).await?;

        let mut tracker = self.lock();
        let next = LikeState {
            liked: status.liked,
            total_likes: status.total_likes.unwrap_or(tracker.state.total_likes),
        };
        Ok(tracker.apply(seq, next))
    }

    /// Asks the server to flip the like for this device and applies its answer.
    ///
    /// # Errors
    /// Returns a precondition error, without any network call, when `device`
    /// is None. Otherwise returns an [`ApiError`] if the toggle request fails;
    /// the state is left unchanged in that case.
    pub async fn toggle(&self, device: Option<&DeviceId>) -> ApiResult<LikeState> {
        let Some(device) = device else {
            return Err(ApiError::precondition(
                "No device id available; cannot toggle like",
            ));
        };

        let seq = self.lock().issue();
        let response = self.source.toggle(self.post_id, device).await?;
        debug!(
            post_id = self.post_id,
            liked = response.liked,
            total_likes = response.total_likes,
            "like toggled"
        );

        Ok(self.lock().apply(
            seq,
            LikeState {
                liked: response.liked,
                total_likes: response.total_likes,
            },
        ))
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
