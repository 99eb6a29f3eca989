//! Runtime configuration.
//!
//! `AppConfig` is built once in `main` (defaults → TOML file → environment →
//! CLI flags) and handed by reference to every component that needs it.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "DocRouter";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Registry name used when no analyzer is configured.
pub const DEFAULT_ANALYZER: &str = "openrouter";

pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/chatgpt-4o-latest";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Default tracing filter, overridable through `RUST_LOG`.
pub fn default_log_filter() -> &'static str {
    "docrouter=info,docrouter_lib=info"
}

/// Get the application data directory
/// ~/DocRouter/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub site_url: String,
    pub site_name: String,
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENROUTER_MODEL.into(),
            base_url: DEFAULT_OPENROUTER_BASE_URL.into(),
            site_url: "https://github.com/docrouter".into(),
            site_name: "DocRouter Metadata Generator".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.into(),
            model: "llama3.1:8b".into(),
            timeout_secs: 300,
        }
    }
}

/// Explicit configuration passed into the resolver, path builder, store and
/// batch processor. Unknown keys in the TOML file are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub archive_root: PathBuf,
    pub database_path: PathBuf,
    /// Person segment used when a document has no owner.
    pub shared_folder_name: String,
    pub unsorted_dir_name: String,
    pub errors_dir_name: String,
    pub analyzer: String,
    pub max_concurrency: usize,
    pub reset_db: bool,
    pub openrouter: OpenRouterConfig,
    pub ollama: OllamaConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            archive_root: data_dir.join("archive"),
            database_path: data_dir.join("docrouter.sqlite"),
            shared_folder_name: "Shared".into(),
            unsorted_dir_name: "Unsorted".into(),
            errors_dir_name: "errors".into(),
            analyzer: DEFAULT_ANALYZER.into(),
            max_concurrency: 8,
            reset_db: false,
            openrouter: OpenRouterConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load defaults, overlay the TOML file at `path` (if it exists), then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                tracing::debug!(path = %p.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Environment wins over the file. `lookup` is injected so tests do not
    /// touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.openrouter.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENROUTER_MODEL").filter(|m| !m.trim().is_empty()) {
            self.openrouter.model = model;
        }
        if let Some(url) = lookup("OPENROUTER_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.openrouter.base_url = url;
        }
        if let Some(name) = lookup("DOCROUTER_ANALYZER").filter(|n| !n.trim().is_empty()) {
            self.analyzer = name;
        }
        if let Some(flag) = lookup("DOCROUTER_RESET_DB") {
            self.reset_db = matches!(flag.trim(), "1" | "true" | "yes");
        }
    }

    /// `<archive_root>/<unsorted_dir_name>`
    pub fn unsorted_dir(&self) -> PathBuf {
        self.archive_root.join(&self.unsorted_dir_name)
    }

    /// `<archive_root>/<errors_dir_name>`
    pub fn errors_dir(&self) -> PathBuf {
        self.archive_root.join(&self.errors_dir_name)
    }

    /// Worker pool size, never zero.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
