use crate::embedding::local::LocalEmbeddingModel;
use clap::Parser;
use std::path::PathBuf;

pub const EMBEDDING_BACKENDS: &[&str] = &["ollama", "fastembed", "lexical", "none"];

#[derive(Debug, Clone, Parser)]
#[command(name = "edgeswarm-router")]
#[command(about = "MCP server that routes text to summarize, sentiment or extract tasks", long_about = None)]
pub struct AppConfig {
    #[arg(long, env = "EMBEDDING_BACKEND", default_value = "ollama")]
    pub embedding_backend: String,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = "nomic-embed-text")]
    pub embedding_model: String,

    #[arg(long, env = "OLLAMA_HOST", default_value = "http://127.0.0.1:11434")]
    pub ollama_host: String,

    #[arg(long, env = "FASTEMBED_MODEL", default_value = "all-MiniLM-L6-v2")]
    pub fastembed_model: String,

    #[arg(long, env = "FASTEMBED_CACHE_DIR")]
    pub fastembed_cache_dir: Option<PathBuf>,

    /// JSON array of `{"intent", "description"}` replacing the built-in anchors
    #[arg(long, env = "ROUTER_ANCHORS_FILE")]
    pub anchors_file: Option<PathBuf>,

    #[arg(long, env = "HISTORY_PATH")]
    pub history_path: Option<PathBuf>,

    #[arg(long, env = "HISTORY_LIMIT")]
    pub history_limit: Option<usize>,
}

impl AppConfig {
    pub fn from_env_and_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !EMBEDDING_BACKENDS.contains(&self.embedding_backend.as_str()) {
            return Err(format!(
                "unknown embedding backend '{}' (expected one of {})",
                self.embedding_backend,
                EMBEDDING_BACKENDS.join(", ")
            ));
        }
        if self.embedding_backend == "ollama" {
            url::Url::parse(&self.ollama_host)
                .map_err(|_| "Invalid OLLAMA_HOST URL format".to_string())?;
            if self.embedding_model.trim().is_empty() {
                return Err("embedding_model must not be empty".into());
            }
        }
        if self.embedding_backend == "fastembed"
            && LocalEmbeddingModel::from_name(&self.fastembed_model).is_none()
        {
            let known: Vec<_> = LocalEmbeddingModel::ALL.iter().map(|m| m.name()).collect();
            return Err(format!(
                "unknown fastembed model '{}' (expected one of {})",
                self.fastembed_model,
                known.join(", ")
            ));
        }
        if self.history_limit == Some(0) {
            return Err("history_limit must be > 0".into());
        }
        Ok(())
    }
}
