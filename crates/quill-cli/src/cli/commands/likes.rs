//! Like command handlers.

use anyhow::Result;
use quill_core::api::PostId;
use quill_core::likes::{LikeCoordinator, LikeState};

use crate::cli::context::AppContext;

fn describe(state: LikeState) -> String {
    let verb = if state.liked { "Liked" } else { "Not liked" };
    format!("{verb} ({} likes)", state.total_likes)
}

pub async fn toggle(app: &AppContext, id: PostId) -> Result<()> {
    let likes = LikeCoordinator::new(app.client.clone(), id, 0);
    let state = likes.toggle(app.device_id().as_ref()).await?;
    println!("{}", describe(state));
    Ok(())
}

pub async fn status(app: &AppContext, id: PostId) -> Result<()> {
    let post = app.client.get_post(id).await?;
    let likes = LikeCoordinator::new(app.client.clone(), id, post.like_count);
    let state = likes.load_status(app.device_id().as_ref()).await?;
    println!("{}", describe(state));
    Ok(())
}
