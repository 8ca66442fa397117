//! On-device sentence embeddings through fastembed (ONNX Runtime).
//!
//! The model is downloaded and loaded on first use, on a blocking thread,
//! so startup never waits on it. Distance is `1 - cos` like the HTTP backend.

#[cfg(feature = "embedding-fastembed")]
use crate::confidence::checked_distance;
#[cfg(feature = "embedding-fastembed")]
use crate::embedding::{cosine_similarity, EmbeddingProvider};
#[cfg(feature = "embedding-fastembed")]
use crate::errors::ProviderError;
#[cfg(feature = "embedding-fastembed")]
use async_trait::async_trait;
#[cfg(feature = "embedding-fastembed")]
use dashmap::DashMap;
#[cfg(feature = "embedding-fastembed")]
use parking_lot::Mutex;
#[cfg(feature = "embedding-fastembed")]
use std::path::PathBuf;
#[cfg(feature = "embedding-fastembed")]
use std::sync::Arc;

/// Supported local sentence-embedding models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEmbeddingModel {
    /// all-MiniLM-L6-v2 (384 dims, fast)
    AllMiniLmL6V2,
    AllMiniLmL12V2,
    BgeSmallEn,
    BgeBaseEn,
}

impl LocalEmbeddingModel {
    pub const ALL: [LocalEmbeddingModel; 4] = [
        Self::AllMiniLmL6V2,
        Self::AllMiniLmL12V2,
        Self::BgeSmallEn,
        Self::BgeBaseEn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            Self::AllMiniLmL12V2 => "all-MiniLM-L12-v2",
            Self::BgeSmallEn => "bge-small-en-v1.5",
            Self::BgeBaseEn => "bge-base-en-v1.5",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(feature = "embedding-fastembed")]
impl From<LocalEmbeddingModel> for ::fastembed::EmbeddingModel {
    fn from(model: LocalEmbeddingModel) -> Self {
        match model {
            LocalEmbeddingModel::AllMiniLmL6V2 => ::fastembed::EmbeddingModel::AllMiniLML6V2,
            LocalEmbeddingModel::AllMiniLmL12V2 => ::fastembed::EmbeddingModel::AllMiniLML12V2,
            LocalEmbeddingModel::BgeSmallEn => ::fastembed::EmbeddingModel::BGESmallENV15,
            LocalEmbeddingModel::BgeBaseEn => ::fastembed::EmbeddingModel::BGEBaseENV15,
        }
    }
}

#[cfg(feature = "embedding-fastembed")]
const CACHE_CAPACITY: usize = 1024;

#[cfg(feature = "embedding-fastembed")]
pub struct FastEmbedEmbeddings {
    model: LocalEmbeddingModel,
    cache_dir: Option<PathBuf>,
    engine: Arc<Mutex<Option<::fastembed::TextEmbedding>>>,
    cache: DashMap<String, Arc<Vec<f32>>>,
}

#[cfg(feature = "embedding-fastembed")]
impl FastEmbedEmbeddings {
    pub fn new(model: LocalEmbeddingModel, cache_dir: Option<PathBuf>) -> Self {
        Self {
            model,
            cache_dir,
            engine: Arc::new(Mutex::new(None)),
            cache: DashMap::new(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Arc<Vec<f32>>, ProviderError> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit.clone());
        }

        let engine = self.engine.clone();
        let model = self.model;
        let cache_dir = self.cache_dir.clone();
        let input = text.to_string();
        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = engine.lock();
            if guard.is_none() {
                // stdout carries protocol frames; keep the download bar off it
                let mut options =
                    ::fastembed::InitOptions::new(model.into()).with_show_download_progress(false);
                if let Some(dir) = cache_dir {
                    options = options.with_cache_dir(dir);
                }
                let loaded = ::fastembed::TextEmbedding::try_new(options).map_err(|e| {
                    tracing::warn!(model = model.name(), error=%e, "failed to load embedding model");
                    ProviderError::Unavailable
                })?;
                tracing::info!(model = model.name(), "local embedding model loaded");
                *guard = Some(loaded);
            }
            let Some(engine) = guard.as_mut() else {
                return Err(ProviderError::Unavailable);
            };
            engine
                .embed(vec![input], None)
                .map_err(|e| ProviderError::Malformed(format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| {
            tracing::warn!(error=%e, "embedding task failed");
            ProviderError::Unavailable
        })??;

        let vector = vectors
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::Malformed("no embedding returned".into()))?;
        let vector = Arc::new(vector);
        if self.cache.len() >= CACHE_CAPACITY {
            self.cache.clear();
        }
        self.cache.insert(text.to_string(), vector.clone());
        Ok(vector)
    }
}

#[cfg(feature = "embedding-fastembed")]
#[async_trait]
impl EmbeddingProvider for FastEmbedEmbeddings {
    fn name(&self) -> &str {
        "fastembed"
    }

    async fn distance(&self, a: &str, b: &str) -> Result<f64, ProviderError> {
        let va = self.embed(a).await?;
        let vb = self.embed(b).await?;
        if va.len() != vb.len() {
            return Err(ProviderError::Malformed(format!(
                "dimension mismatch: {} vs {}",
                va.len(),
                vb.len()
            )));
        }
        checked_distance(1.0 - cosine_similarity(&va, &vb))
    }
}
