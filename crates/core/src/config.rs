//! Configuration management for AI-DOC.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.aidoc/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources override earlier ones.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Known language model providers.
pub const LLM_PROVIDERS: [&str; 3] = ["ollama", "groq", "openai"];

/// Known embedding providers.
pub const EMBEDDING_PROVIDERS: [&str; 2] = ["trigram", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .aidoc/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// API key for the LLM provider (overrides `llm.api_key_env`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Answer synthesis model settings
    pub llm: LlmSettings,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Chunking, retrieval and synthesis parameters
    pub pipeline: PipelineSettings,

    /// Fallback corpus location
    pub corpus: CorpusSettings,
}

/// Language model used for answer synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Provider name ("ollama", "groq", "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key_env: None,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider name ("trigram", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum texts per embedding request
    pub batch_size: usize,

    /// Custom endpoint URL
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: 64,
            endpoint: None,
        }
    }
}

/// Distance metric used by a vector index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`
    #[default]
    Cosine,
    /// L2 distance
    Euclidean,
}

/// What to do when retrieval returns no passages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EmptyRetrievalPolicy {
    /// Ask the model for a general answer, flagged as not grounded in the corpus
    #[default]
    GeneralAnswer,
    /// Refuse with `AppError::NoContext`
    Fail,
}

/// Chunking, retrieval and synthesis parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Maximum passage length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive passages
    pub chunk_overlap: usize,

    /// Passages retrieved per question
    pub top_k: usize,

    /// Upper bound on the context handed to the model, in characters
    pub max_context_chars: usize,

    /// Distance metric for new indexes
    pub distance: DistanceMetric,

    /// Behavior when retrieval finds nothing
    pub empty_retrieval: EmptyRetrievalPolicy,

    /// Optional YAML prompt definition replacing the built-in one
    pub prompt_file: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            max_context_chars: 6000,
            distance: DistanceMetric::default(),
            empty_retrieval: EmptyRetrievalPolicy::default(),
            prompt_file: None,
        }
    }
}

/// Default reference corpus location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CorpusSettings {
    /// Directory scanned for the fallback corpus
    pub default_dir: PathBuf,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("data/default_corpus"),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    pipeline: Option<PipelineSettings>,
    corpus: Option<CorpusSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            pipeline: PipelineSettings::default(),
            corpus: CorpusSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `AIDOC_WORKSPACE`: Override workspace path
    /// - `AIDOC_CONFIG`: Path to config file
    /// - `AIDOC_PROVIDER`: LLM provider
    /// - `AIDOC_MODEL`: Model identifier
    /// - `AIDOC_API_KEY`: API key
    /// - `AIDOC_DEFAULT_CORPUS`: Fallback corpus directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use aidoc_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with explicit workspace and config file paths.
    ///
    /// Explicit paths (the `--workspace` and `--config` flags) win over
    /// `AIDOC_WORKSPACE` and `AIDOC_CONFIG`. They are resolved before the
    /// YAML merge so the selected file is the one that gets read.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var_os("AIDOC_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var_os("AIDOC_CONFIG").map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.aidoc_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("AIDOC_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("AIDOC_MODEL") {
            config.llm.model = model;
        }

        if let Ok(dir) = std::env::var("AIDOC_DEFAULT_CORPUS") {
            config.corpus.default_dir = PathBuf::from(dir);
        }

        config.api_key = std::env::var("AIDOC_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merging config file {:?}", path);

        let mut result = self.clone();

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(mut pipeline) = config_file.pipeline {
            // Relative prompt files resolve against the workspace
            pipeline.prompt_file = pipeline
                .prompt_file
                .map(|p| if p.is_relative() { result.workspace.join(p) } else { p });
            result.pipeline = pipeline;
        }
        if let Some(corpus) = config_file.corpus {
            result.corpus = corpus;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    /// Workspace and config file paths are not overrides; pass them to
    /// [`AppConfig::load_from`] so the right file is merged.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .aidoc directory.
    pub fn aidoc_dir(&self) -> PathBuf {
        self.workspace.join(".aidoc")
    }

    /// Fallback corpus directory, resolved against the workspace.
    pub fn default_corpus_dir(&self) -> PathBuf {
        if self.corpus.default_dir.is_relative() {
            self.workspace.join(&self.corpus.default_dir)
        } else {
            self.corpus.default_dir.clone()
        }
    }

    /// Resolve the API key for the configured LLM provider.
    ///
    /// `AIDOC_API_KEY` wins; otherwise the variable named by `llm.apiKeyEnv`,
    /// falling back to the provider's conventional variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = self
            .llm
            .api_key_env
            .clone()
            .or_else(|| default_api_key_env(&self.llm.provider).map(str::to_string))?;

        std::env::var(env_var).ok()
    }

    /// Validate the configuration before any component is built.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.llm.provider.to_lowercase();
        if !LLM_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                LLM_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding dimensions and batch size must be positive".to_string(),
            ));
        }

        let pipeline = &self.pipeline;
        if pipeline.chunk_overlap >= pipeline.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                pipeline.chunk_overlap, pipeline.chunk_size
            )));
        }

        if pipeline.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }

        if default_api_key_env(&provider).is_some() && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found for provider '{}'",
                self.llm.provider
            )));
        }

        Ok(())
    }
}

/// Conventional API key variable for hosted providers.
fn default_api_key_env(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "groq" => Some("GROQ_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    }
}
