//! Config command handlers.

use anyhow::{Context, Result};
use quill_core::config;

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    println!("Set base_url there (or QUILL_BASE_URL) to point at your blog API.");
    Ok(())
}

/// Prints the default config with current defaults filled in.
pub fn generate() -> Result<()> {
    let rendered = config::Config::generate()?;
    print!("{rendered}");
    Ok(())
}
