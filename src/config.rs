use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_DATASET_DIR: &str = "dataset/pdfs";
const DEFAULT_OUTPUT_DIR: &str = "dataset/json";
const DEFAULT_DOCUMENT_YEAR: i32 = 2024;
const DEFAULT_INDEX_NAME: &str = "financial-rag";
const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "llama3.2";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by every pipeline stage.
///
/// Each stage receives the section it needs at construction time; nothing is cached globally.
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings for the PDF to JSON conversion stage.
    pub extraction: ExtractionConfig,
    /// Vector database location and index settings.
    pub vector_store: VectorStoreConfig,
    /// Embedding backend settings.
    pub embedding: EmbeddingConfig,
    /// Chat-completion backend used for summaries.
    pub llm: LlmConfig,
}

/// Settings consumed by the batch file pipeline.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Directory scanned for source PDF documents.
    pub dataset_dir: PathBuf,
    /// Directory receiving one JSON record file per document.
    pub output_dir: PathBuf,
    /// Year stamped on every record of the batch.
    pub year: i32,
    /// Partitioning strategy requested from the partitioner.
    pub strategy: ExtractionStrategy,
    /// Whether the partitioner should infer table structure.
    pub infer_table_structure: bool,
    /// Skip documents whose JSON output already exists.
    pub skip_existing: bool,
    /// Partitioner backend used to read PDFs.
    pub partitioner: PartitionerKind,
    /// Base URL of the hosted partition API, when that backend is selected.
    pub unstructured_api_url: Option<String>,
    /// Optional API key for the hosted partition API.
    pub unstructured_api_key: Option<String>,
}

/// Vector database connection settings.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Base URL of the vector database host.
    pub url: Option<String>,
    /// Optional API key sent with every request.
    pub api_key: Option<String>,
    /// Index (collection) receiving page vectors.
    pub index_name: String,
    /// Number of vectors sent per upsert call.
    pub batch_size: usize,
}

/// Embedding backend settings.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Provider protocol spoken by the embedding endpoint.
    pub provider: EmbeddingProvider,
    /// Base URL of the embedding endpoint.
    pub url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub model: String,
    /// Dimensionality of the produced vectors; also used when creating the index.
    pub dimension: usize,
}

/// Chat-completion backend settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Model used for summaries.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Partitioning strategies understood by the partitioners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Read the embedded text layer only.
    Fast,
    /// Layout-aware extraction, slower but handles tables better.
    HiRes,
}

impl ExtractionStrategy {
    /// Wire name of the strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::HiRes => "hi_res",
        }
    }
}

/// Supported PDF partitioner backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionerKind {
    /// In-process text-layer extraction.
    Local,
    /// Hosted Unstructured partition API.
    Unstructured,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Any OpenAI-compatible `/embeddings` endpoint.
    OpenAI,
}

impl Config {
    /// Load `.env` (when present) and then read configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider =
            parse_env("EMBEDDING_PROVIDER")?.unwrap_or(EmbeddingProvider::OpenAI);
        let embedding_url = load_env_optional("EMBEDDING_URL").unwrap_or_else(|| {
            match embedding_provider {
                EmbeddingProvider::Ollama => DEFAULT_OLLAMA_URL.to_string(),
                EmbeddingProvider::OpenAI => DEFAULT_OPENAI_URL.to_string(),
            }
        });

        let batch_size = parse_env("UPSERT_BATCH_SIZE")?.unwrap_or(DEFAULT_UPSERT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue("UPSERT_BATCH_SIZE".into()));
        }
        let dimension = parse_env("EMBEDDING_DIMENSION")?.unwrap_or(DEFAULT_EMBEDDING_DIMENSION);
        if dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        Ok(Self {
            extraction: ExtractionConfig {
                dataset_dir: load_env_optional("DATASET_DIR")
                    .unwrap_or_else(|| DEFAULT_DATASET_DIR.to_string())
                    .into(),
                output_dir: load_env_optional("OUTPUT_DIR")
                    .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())
                    .into(),
                year: parse_env("DOCUMENT_YEAR")?.unwrap_or(DEFAULT_DOCUMENT_YEAR),
                strategy: parse_env("EXTRACTION_STRATEGY")?.unwrap_or(ExtractionStrategy::Fast),
                infer_table_structure: parse_bool_env("INFER_TABLE_STRUCTURE")?,
                skip_existing: parse_bool_env("SKIP_EXISTING")?,
                partitioner: parse_env("PARTITIONER")?.unwrap_or(PartitionerKind::Local),
                unstructured_api_url: load_env_optional("UNSTRUCTURED_API_URL"),
                unstructured_api_key: load_env_optional("UNSTRUCTURED_API_KEY"),
            },
            vector_store: VectorStoreConfig {
                url: load_env_optional("VECTOR_DB_URL"),
                api_key: load_env_optional("VECTOR_DB_API_KEY"),
                index_name: load_env_optional("VECTOR_INDEX_NAME")
                    .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
                batch_size,
            },
            embedding: EmbeddingConfig {
                provider: embedding_provider,
                url: embedding_url,
                api_key: load_env_optional("EMBEDDING_API_KEY"),
                model: load_env_optional("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                dimension,
            },
            llm: LlmConfig {
                base_url: load_env_optional("LLM_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
                api_key: load_env_optional("OPENAI_API_KEY"),
                model: load_env_optional("LLM_MODEL")
                    .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                temperature: parse_env("TEMPERATURE")?.unwrap_or(0.0),
            },
        })
    }
}

impl VectorStoreConfig {
    /// Vector database URL, failing when the variable was never provided.
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("VECTOR_DB_URL".into()))
    }
}

impl ExtractionConfig {
    /// Partition API URL, failing when the variable was never provided.
    pub fn require_unstructured_url(&self) -> Result<&str, ConfigError> {
        self.unstructured_api_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("UNSTRUCTURED_API_URL".into()))
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_bool_env(key: &str) -> Result<bool, ConfigError> {
    match load_env_optional(key) {
        None => Ok(false),
        Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::InvalidValue(key.into())),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl FromStr for ExtractionStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "hi_res" | "hi-res" | "accurate" => Ok(Self::HiRes),
            _ => Err(()),
        }
    }
}

impl FromStr for PartitionerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "unstructured" => Ok(Self::Unstructured),
            _ => Err(()),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}
