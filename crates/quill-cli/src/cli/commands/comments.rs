//! Comment command handlers.
//!
//! Comments are written either as the logged-in account or anonymously with a
//! display name and a password that later authorizes edits and deletion.

use anyhow::Result;
use quill_core::api::{CommentAuth, CommentId, NewComment, PostId};

use super::posts::print_comments;
use crate::cli::context::AppContext;

pub async fn list(app: &AppContext, post_id: PostId) -> Result<()> {
    let comments = app.client.list_comments(post_id).await?;
    print_comments(&comments);
    Ok(())
}

/// Builds the comment body and the proof of authorship for it.
fn authored(
    app: &AppContext,
    post_id: PostId,
    content: &str,
    name: Option<String>,
    password: Option<String>,
) -> Result<(NewComment, CommentAuth)> {
    if let Some(name) = name {
        let password = password.unwrap_or_default();
        let comment = NewComment::anonymous(post_id, name, password.clone(), content);
        return Ok((comment, CommentAuth::Password(password)));
    }
    if password.is_some() {
        anyhow::bail!("Anonymous comments need --name as well as --password");
    }
    let Some(user_id) = app.credentials().user_id() else {
        anyhow::bail!("Log in with `quill login`, or pass --name and --password to comment anonymously");
    };
    Ok((
        NewComment::by_user(post_id, user_id, content),
        CommentAuth::User(user_id),
    ))
}

pub async fn add(
    app: &AppContext,
    post_id: PostId,
    content: &str,
    name: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let (comment, _) = authored(app, post_id, content, name, password)?;
    let created = app.client.create_comment(&comment).await?;
    println!("✓ Added comment {}", created.id);
    Ok(())
}

pub async fn edit(
    app: &AppContext,
    id: CommentId,
    post_id: PostId,
    content: &str,
    name: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let (comment, auth) = authored(app, post_id, content, name, password)?;
    app.client.update_comment(id, &comment, &auth).await?;
    println!("✓ Updated comment {id}");
    Ok(())
}

pub async fn delete(app: &AppContext, id: CommentId, password: Option<String>) -> Result<()> {
    let auth = match (password, app.credentials().user_id()) {
        (Some(password), _) => CommentAuth::Password(password),
        (None, Some(user_id)) => CommentAuth::User(user_id),
        (None, None) => {
            anyhow::bail!("Log in with `quill login`, or pass --password for an anonymous comment")
        }
    };
    app.client.delete_comment(id, &auth).await?;
    println!("✓ Deleted comment {id}");
    Ok(())
}
