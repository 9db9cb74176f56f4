//! Configuration parsing and validation.
//!
//! Context Lens is configured via a TOML file (conventionally `config/lens.toml`).
//! Every section is optional; missing values fall back to the defaults below,
//! and running without `--config` uses [`Config::default`].
//!
//! # Example Configuration
//!
//! ```toml
//! [model]
//! provider = "gemini"            # or "disabled"
//! model = "gemini-2.5-flash"
//! api_key_env = "GEMINI_API_KEY"
//! timeout_secs = 60
//!
//! [retrieval]
//! top_k = 5
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [catalog]
//! path = "./config/documents.toml"
//! ```
//!
//! # Validation
//!
//! [`load_config`] rejects:
//! - `retrieval.top_k` < 1
//! - `model.timeout_secs` == 0
//! - an empty `model.model`
//! - unknown model providers
//!
//! [`load_documents`] rejects catalog files without documents or with an
//! untitled document.

use anyhow::{bail, Context, Result};
use context_lens_core::catalog::default_documents;
use context_lens_core::models::Document;
use context_lens_core::retrieval::DEFAULT_TOP_K;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Hosted model settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// `"gemini"` or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Maximum number of chunks injected in the document scenario.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Document catalog source. Without a path the built-in catalog is used.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

/// On-disk catalog file: a list of `[[documents]]` tables.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    documents: Vec<Document>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Load `path` if given, otherwise the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    // Validate model
    if config.model.timeout_secs == 0 {
        bail!("model.timeout_secs must be > 0");
    }
    if config.model.model.trim().is_empty() {
        bail!("model.model must not be empty");
    }

    match config.model.provider.as_str() {
        "gemini" | "disabled" => {}
        other => bail!(
            "Unknown model provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    Ok(())
}

/// Resolve the document catalog for `config`.
pub fn load_documents(config: &Config) -> Result<Vec<Document>> {
    let Some(path) = &config.catalog.path else {
        return Ok(default_documents());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    let file: CatalogFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;

    if file.documents.is_empty() {
        bail!("catalog {} contains no documents", path.display());
    }
    if let Some(i) = file.documents.iter().position(|d| d.title.trim().is_empty()) {
        bail!("catalog document #{} has an empty title", i + 1);
    }

    Ok(file.documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_temp("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.model.model, "gemini-2.5-flash");
        assert_eq!(config.model.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.server.bind, "127.0.0.1:7341");
        assert!(config.catalog.path.is_none());
        assert!(config.model.is_enabled());
    }

    #[test]
    fn test_rejects_zero_top_k() {
        let file = write_temp("[retrieval]\ntop_k = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let file = write_temp("[model]\nprovider = \"openai\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown model provider"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let file = write_temp("[model]\ntimeout_secs = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/lens.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_default_catalog() {
        let docs = load_documents(&Config::default()).unwrap();
        assert_eq!(docs, default_documents());
    }

    #[test]
    fn test_catalog_file() {
        let catalog = write_temp(
            "[[documents]]\ntitle = \"Runbook\"\ncontent = \"Restart the worker. Then check logs.\"\n",
        );
        let config = Config {
            catalog: CatalogConfig {
                path: Some(catalog.path().to_path_buf()),
            },
            ..Default::default()
        };
        let docs = load_documents(&config).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Runbook");
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let catalog = write_temp("documents = []\n");
        let config = Config {
            catalog: CatalogConfig {
                path: Some(catalog.path().to_path_buf()),
            },
            ..Default::default()
        };
        let err = load_documents(&config).unwrap_err();
        assert!(err.to_string().contains("no documents"));
    }
}
