//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys split on `__`, e.g. `APP_RETRIEVAL__TOP_K=8`). `Settings` is the
//! typed view consumed by the pipeline; every field has a default so an empty
//! environment still yields a usable configuration.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::CONTENT_TYPES;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    /// Build from an explicit figment (tests, embedding in other services).
    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub retrieval: RetrievalSettings,
    pub debug: DebugSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub lancedb_dir: String,
    pub table: String,
    pub tantivy_dir: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            lancedb_dir: "data/indexes/lancedb".to_string(),
            table: "rag_chunks".to_string(),
            tantivy_dir: "data/indexes/tantivy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub model_dir: Option<String>,
    pub dimension: usize,
    /// Upper bound on the estimated query token count.
    pub max_query_tokens: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_dir: None,
            dimension: 384,
            max_query_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub model: String,
    pub model_dir: Option<String>,
    /// Inputs larger than this are reranked anyway but logged as a warning.
    pub large_input_warning: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            model_dir: None,
            large_input_warning: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub expand: bool,
    pub rrf_k: u32,
    /// Per-backend candidates = `top_k * candidate_multiplier` unless overridden.
    pub candidate_multiplier: usize,
    pub vector_top_k: Option<usize>,
    pub keyword_top_k: Option<usize>,
    /// Hard ceiling on any single backend's candidate count.
    pub max_backend_candidates: usize,
    pub fusion_top_k: usize,
    pub score_threshold: f32,
    /// Keyword-only hits (no vector score) bypass `score_threshold`.
    pub exempt_keyword_only: bool,
    pub content_types: Option<Vec<String>>,
    pub similarity_threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            expand: true,
            rrf_k: 60,
            candidate_multiplier: 4,
            vector_top_k: None,
            keyword_top_k: None,
            max_backend_candidates: 100,
            fusion_top_k: 20,
            score_threshold: 0.3,
            exempt_keyword_only: true,
            content_types: None,
            similarity_threshold: 0.85,
        }
    }
}

impl RetrievalSettings {
    pub fn vector_candidates(&self, top_k: usize) -> usize {
        self.vector_top_k.unwrap_or(top_k.saturating_mul(self.candidate_multiplier)).min(self.max_backend_candidates).max(1)
    }

    pub fn keyword_candidates(&self, top_k: usize) -> usize {
        self.keyword_top_k.unwrap_or(top_k.saturating_mul(self.candidate_multiplier)).min(self.max_backend_candidates).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub enabled: bool,
    pub artifact_dir: String,
}

impl Default for DebugSettings {
    fn default() -> Self { Self { enabled: false, artifact_dir: "data/debug/retrieval".to_string() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self { Self { level: "info".to_string() } }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be greater than zero".into()));
        }
        if self.embedding.max_query_tokens == 0 {
            return Err(Error::InvalidConfig("embedding.max_query_tokens must be greater than zero".into()));
        }
        if r.top_k == 0 || r.candidate_multiplier == 0 || r.max_backend_candidates == 0 || r.fusion_top_k == 0 {
            return Err(Error::InvalidConfig("retrieval counts (top_k, candidate_multiplier, max_backend_candidates, fusion_top_k) must be positive".into()));
        }
        if matches!(r.vector_top_k, Some(0)) || matches!(r.keyword_top_k, Some(0)) {
            return Err(Error::InvalidConfig("retrieval.vector_top_k / keyword_top_k must be positive when set".into()));
        }
        if r.rrf_k == 0 {
            return Err(Error::InvalidConfig("retrieval.rrf_k must be greater than zero".into()));
        }
        validate_unit("retrieval.score_threshold", r.score_threshold)?;
        validate_unit("retrieval.similarity_threshold", r.similarity_threshold)?;
        if let Some(types) = &r.content_types {
            validate_content_types(types)?;
        }
        Ok(())
    }
}

pub fn validate_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidConfig(format!("{name} must be between 0 and 1, got {value}")));
    }
    Ok(())
}

pub fn validate_content_types(types: &[String]) -> Result<()> {
    let invalid: Vec<&str> = types.iter().map(String::as_str).filter(|t| !CONTENT_TYPES.contains(t)).collect();
    if !invalid.is_empty() {
        return Err(Error::InvalidConfig(format!("Invalid content_type(s): {:?}. Must be one of {:?}", invalid, CONTENT_TYPES)));
    }
    Ok(())
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
