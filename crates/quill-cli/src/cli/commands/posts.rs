//! Post command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use quill_core::api::{Comment, PostDraft, PostId};
use quill_core::likes::LikeCoordinator;
use tracing::warn;

use crate::cli::context::AppContext;

pub async fn show(app: &AppContext, id: PostId) -> Result<()> {
    let post = app.client.get_post(id).await?;

    let likes = LikeCoordinator::new(app.client.clone(), id, post.like_count);
    let like = match likes.load_status(app.device_id().as_ref()).await {
        Ok(state) => state,
        Err(e) => {
            warn!("like status unavailable: {e}");
            likes.state()
        }
    };

    println!("{}", post.title);
    println!(
        "by {}  {}{}",
        post.author_name,
        post.created_at.format("%Y-%m-%d %H:%M"),
        post.updated_at
            .map(|at| format!("  (edited {})", at.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default()
    );
    if !post.tags.is_empty() {
        println!("tags: {}", post.tags.join(", "));
    }
    println!(
        "♥ {}{}",
        like.total_likes,
        if like.liked { "  (you like this)" } else { "" }
    );
    println!();
    println!("{}", post.content);
    println!();
    print_comments(&post.comments);
    Ok(())
}

pub(super) fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No comments yet.");
        return;
    }
    println!("Comments ({}):", comments.len());
    for comment in comments {
        let when = comment
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("  [{}] {}  {}", comment.id, comment.display_name(), when);
        for line in comment.content.lines() {
            println!("      {line}");
        }
    }
}

pub async fn create(app: &AppContext, draft: &PostDraft) -> Result<()> {
    let id = app.client.create_post(draft).await?;
    println!("✓ Created post {id}");
    Ok(())
}

pub async fn update(app: &AppContext, id: PostId, draft: &PostDraft) -> Result<()> {
    let id = app.client.update_post(id, draft).await?;
    println!("✓ Updated post {id}");
    Ok(())
}

pub async fn delete(app: &AppContext, id: PostId) -> Result<()> {
    app.client.delete_post(id).await?;
    println!("✓ Deleted post {id}");
    Ok(())
}

pub async fn upload_image(app: &AppContext, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |name| name.to_string_lossy().to_string());

    let url = app.client.upload_image(&file_name, bytes).await?;
    println!("{url}");
    Ok(())
}
