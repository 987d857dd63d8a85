//! Device command handler.

use anyhow::{Context, Result};

use crate::cli::context::AppContext;

pub fn show(app: &AppContext) -> Result<()> {
    let id = app
        .device_identity()
        .get_or_create()
        .context("load device id")?;
    println!("{id}");
    Ok(())
}
