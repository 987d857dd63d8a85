//! Configuration management for quill.
//!
//! Loads configuration from ${QUILL_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured API base URL.
pub const BASE_URL_ENV: &str = "QUILL_BASE_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for quill configuration and data directories.
    //!
    //! QUILL_HOME resolution order:
    //! 1. QUILL_HOME environment variable (if set)
    //! 2. ~/.config/quill (default)
    //! 3. ./.quill when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the quill home directory.
    pub fn quill_home() -> PathBuf {
        if let Ok(home) = std::env::var("QUILL_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".quill"),
            |h| h.join(".config").join("quill"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        quill_home().join("config.toml")
    }

    /// Returns the path to the durable key/value storage file.
    pub fn storage_path() -> PathBuf {
        quill_home().join("storage.json")
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> PathBuf {
        quill_home().join("logs")
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive (e.g. "info", "`quill_core=debug`")
    pub level: String,
    /// Write to a daily log file under ${QUILL_HOME}/logs instead of stderr
    pub file: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the blog API, including any path prefix (e.g. `/api`)
    pub base_url: String,

    /// Number of posts requested per feed page
    pub page_size: u32,

    /// Request timeout in seconds (0 disables)
    pub timeout_secs: u32,

    /// Logging configuration
    #[serde(default)]
    pub log: LogSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            log: LogSettings::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
    pub const DEFAULT_PAGE_SIZE: u32 = crate::feed::DEFAULT_PAGE_SIZE;
    const DEFAULT_TIMEOUT_SECS: u32 = 10;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the API base URL with precedence: env > config > default.
    ///
    /// Trailing slashes are stripped so endpoint paths can be appended directly.
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn effective_base_url(&self) -> Result<String> {
        let candidates = [std::env::var(BASE_URL_ENV).ok(), Some(self.base_url.clone())];

        let chosen = candidates
            .into_iter()
            .flatten()
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());

        url::Url::parse(&chosen).with_context(|| format!("Invalid base URL: {chosen}"))?;
        Ok(chosen.trim_end_matches('/').to_string())
    }

    /// Returns the request timeout, or None when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.timeout_secs)))
        }
    }

    /// Returns the feed page size, never below one.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.max(1)
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Uses the embedded template for structure/comments and merges
    /// generated values from `Config::default()` into it.
    ///
    /// # Errors
    /// Returns an error if serialization or template parsing fails.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let config = Config::default();
        let generated_toml =
            toml::to_string(&config).context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;

        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "base_url = \"https://blog.example.com/api\"\n[log]\nfile = false\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.base_url, "https://blog.example.com/api");
        assert_eq!(config.page_size, 10);
        assert!(!config.log.file);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "page_size = \"ten\"").unwrap();

        assert!(Config::load_from(&config_path).is_err());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("base_url = \"http://localhost:8080/api\""));
        assert!(contents.contains("page_size = 10"));

        let loaded = Config::load_from(&config_path).unwrap();
        assert_eq!(loaded.page_size, 10);
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_generate_keeps_template_comments() {
        let generated = Config::generate().unwrap();
        assert!(generated.contains("# Number of posts requested per feed page."));
        assert!(generated.contains("timeout_secs = 10"));
        assert!(generated.contains("[log]"));
    }

    #[test]
    fn test_timeout_zero_disables() {
        let config = Config {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);

        let config = Config::default();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_page_size_never_zero() {
        let config = Config {
            page_size: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_page_size(), 1);
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let config = Config {
            base_url: "https://blog.example.com/api/".to_string(),
            ..Default::default()
        };
        // Only meaningful when the env override is absent.
        if std::env::var(BASE_URL_ENV).is_err() {
            assert_eq!(
                config.effective_base_url().unwrap(),
                "https://blog.example.com/api"
            );
        }
    }

    #[test]
    fn test_base_url_invalid_is_error() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        if std::env::var(BASE_URL_ENV).is_err() {
            assert!(config.effective_base_url().is_err());
        }
    }
}
