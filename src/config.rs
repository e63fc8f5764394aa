//! Core Dispatch configuration management
//!
//! Configuration is assembled once at startup and passed explicitly to the
//! components that need it:
//!
//! 1. TOML file (`--config`, `CORE_DISPATCH_CONFIG`, or
//!    `~/.core-dispatch/config.toml` when present)
//! 2. Environment overrides (`OLLAMA_BASE_URL`, `OLLAMA_MODEL`,
//!    `OLLAMA_API_KEY`, `DATABASE_URL`), taken from the process environment
//!    first and from a `.env` file in the working directory second
//! 3. Validation: the database URL is mandatory and has no default

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the model endpoint base URL
pub const ENV_MODEL_BASE_URL: &str = "OLLAMA_BASE_URL";
/// Environment variable overriding the model identifier
pub const ENV_MODEL: &str = "OLLAMA_MODEL";
/// Environment variable overriding the model API key
pub const ENV_MODEL_API_KEY: &str = "OLLAMA_API_KEY";
/// Environment variable supplying the database connection string
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Placeholder shown instead of secrets
const REDACTED: &str = "********";

/// Dotenv file read from the working directory
pub const DOTENV_FILE: &str = ".env";

/// Main Core Dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreDispatchConfig {
    /// HTTP API configuration
    pub gateway: GatewayConfig,

    /// Model endpoint configuration
    pub models: ModelConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

/// Chat-completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Bearer token; local Ollama servers accept any value
    pub api_key: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "gemma:3b".to_string(),
            api_key: "ollama".to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database connection string (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl StorageConfig {
    /// Parse the configured connection string into a storage location
    pub fn location(&self) -> Result<StorageLocation> {
        match self.database_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => StorageLocation::parse(url),
            _ => Err(Error::Config(format!(
                "{} is required (set it in the environment or under [storage] database_url)",
                ENV_DATABASE_URL
            ))),
        }
    }
}

/// Where the relational store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Private in-memory database
    Memory,
    /// SQLite database file
    File(PathBuf),
}

impl StorageLocation {
    /// Parse a database connection string.
    ///
    /// URL forms follow the SQLAlchemy convention:
    ///
    /// - `sqlite://` or any `:memory:` path is a private in-memory database
    /// - `sqlite:///dispatch.db` is relative to the working directory
    /// - `sqlite:////var/lib/dispatch.db` is absolute
    ///
    /// `sqlite:<path>` and bare filesystem paths are also accepted. Connection
    /// options after `?` are ignored. Other URL schemes are rejected.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let without_query = url.split('?').next().unwrap_or_default();

        let path = if let Some(rest) = without_query.strip_prefix("sqlite://") {
            if rest.is_empty() {
                return Ok(Self::Memory);
            }
            // The third slash separates the empty host from the path
            rest.strip_prefix('/').unwrap_or(rest)
        } else if let Some(rest) = without_query.strip_prefix("sqlite:") {
            rest
        } else if let Some((scheme, _)) = without_query.split_once("://") {
            return Err(Error::Config(format!(
                "Unsupported database scheme '{}': only sqlite is available",
                scheme
            )));
        } else {
            without_query
        };

        match path {
            "" => Err(Error::Config(format!("Database URL '{}' has no path", url))),
            ":memory:" | "/:memory:" => Ok(Self::Memory),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

impl CoreDispatchConfig {
    /// Default config file location (~/.core-dispatch/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".core-dispatch").join("config.toml"))
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from an explicit path (or the default location if
    /// it exists), apply environment overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, Path::new(DOTENV_FILE), |key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with an explicit dotenv file and process
    /// environment. Variables already set in the process environment win
    /// over the dotenv file.
    pub fn load_from<F>(path: Option<&Path>, env_file: &Path, process_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => Self::from_file(&default)?,
                None => Self::default(),
            },
        };

        let dotenv = read_env_file(env_file)?;
        config.apply_env_overrides(|key| {
            process_env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| dotenv.get(key).cloned())
        });
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = get(ENV_MODEL_BASE_URL) {
            self.models.base_url = base_url;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.models.model = model;
        }
        if let Some(api_key) = get(ENV_MODEL_API_KEY) {
            self.models.api_key = api_key;
        }
        if let Some(url) = get(ENV_DATABASE_URL) {
            self.storage.database_url = Some(url);
        }
    }

    /// Copy safe to print: the model API key is masked
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.models.api_key.is_empty() {
            config.models.api_key = REDACTED.to_string();
        }
        config
    }

    /// Check that mandatory settings are present and well-formed
    pub fn validate(&self) -> Result<()> {
        self.storage.location()?;
        if self.models.base_url.trim().is_empty() {
            return Err(Error::Config("models.base_url must not be empty".to_string()));
        }
        if self.models.model.trim().is_empty() {
            return Err(Error::Config("models.model must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Read `KEY=value` pairs from a dotenv file. A missing file is empty.
fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    tracing::debug!(path = %path.display(), "Reading dotenv file");
    dotenvy::from_path_iter(path)
        .and_then(|iter| iter.collect::<std::result::Result<HashMap<_, _>, _>>())
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}
