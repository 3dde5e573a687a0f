//! quizforge configuration and store factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizforge_core::model::UserId;

use crate::memory::MemoryStore;

/// Top-level quizforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    /// JSON snapshot the store is loaded from and saved to.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Actor used when a command is not given `--user`.
    #[serde(default)]
    pub default_user: Option<String>,
    /// Where attempt reports are written.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./quizforge-data/store.json")
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("./quizforge-results")
}

impl Default for QuizforgeConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            default_user: None,
            reports_dir: default_reports_dir(),
        }
    }
}

impl QuizforgeConfig {
    /// Resolve the acting user: an explicit value wins over `default_user`.
    pub fn actor(&self, explicit: Option<&str>) -> Result<UserId> {
        explicit
            .or(self.default_user.as_deref())
            .filter(|u| !u.trim().is_empty())
            .map(UserId::from)
            .context("no user given: pass --user or set default_user / QUIZFORGE_USER")
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
///
/// Environment variable overrides: `QUIZFORGE_USER`, `QUIZFORGE_STORE`.
pub fn load_config() -> Result<QuizforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => parse_config(
            &std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?,
            &path,
        )?,
        None => QuizforgeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(user) = std::env::var("QUIZFORGE_USER") {
        config.default_user = Some(user);
    }
    if let Ok(store) = std::env::var("QUIZFORGE_STORE") {
        config.store_path = PathBuf::from(store);
    }

    Ok(config)
}

/// Parse a config file body, resolving `${VAR}` references.
pub fn parse_config(content: &str, source: &Path) -> Result<QuizforgeConfig> {
    let mut config = toml::from_str::<QuizforgeConfig>(content)
        .with_context(|| format!("failed to parse config: {}", source.display()))?;

    config.store_path = PathBuf::from(resolve_env_vars(&config.store_path.to_string_lossy()));
    config.reports_dir = PathBuf::from(resolve_env_vars(&config.reports_dir.to_string_lossy()));
    config.default_user = config.default_user.as_deref().map(resolve_env_vars);
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}

/// Open the store described by the configuration.
pub fn open_store(config: &QuizforgeConfig) -> Result<MemoryStore> {
    MemoryStore::load_snapshot(&config.store_path)
}
