//! Account command handlers.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use quill_core::logging::mask_secret;

use crate::cli::context::AppContext;

/// Reads one line from stdin after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let input = input.trim().to_string();
    if input.is_empty() {
        anyhow::bail!("{} cannot be empty", label.trim_end_matches([':', ' ']));
    }
    Ok(input)
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(password) if !password.is_empty() => Ok(password),
        _ => prompt("Password: "),
    }
}

pub async fn login(app: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let password = password_or_prompt(password)?;
    let profile = app.client.login(email, &password).await?;

    println!("✓ Logged in as {} <{}>", profile.username, profile.email);
    if let Some(token) = app.credentials().get() {
        println!("  Session token: {}", mask_secret(&token));
    }
    Ok(())
}

pub async fn signup(
    app: &AppContext,
    username: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_prompt(password)?;
    let profile = app.client.signup(username, email, &password).await?;

    println!("✓ Account created for {} <{}>", profile.username, profile.email);
    Ok(())
}

pub fn logout(app: &AppContext) -> Result<()> {
    if app.client.logout()? {
        println!("✓ Logged out");
    } else {
        println!("Not logged in (no session found).");
    }
    Ok(())
}

pub async fn whoami(app: &AppContext) -> Result<()> {
    if !app.credentials().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }

    let status = app.client.verify_auth().await?;
    if status.authenticated {
        let role = status.role.as_deref().unwrap_or("unknown");
        match app.credentials().user_id() {
            Some(id) => println!("Logged in (user {id}, role {role})"),
            None => println!("Logged in (role {role})"),
        }
    } else {
        println!("Session expired. Run `quill login` to sign in.");
    }
    Ok(())
}

pub async fn request_author(app: &AppContext) -> Result<()> {
    app.client.request_author_role().await?;
    println!("✓ Author access requested. An admin will review it.");
    Ok(())
}
