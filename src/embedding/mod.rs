use crate::config::AppConfig;
use crate::errors::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

/// Semantic distance between two texts, in `[0, 2]` with 0 meaning identical.
///
/// Implementations must be safe for concurrent use; the router and the
/// summarizer share one instance across requests.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn distance(&self, a: &str, b: &str) -> Result<f64, ProviderError>;
}

mod lexical;
pub mod local;
#[cfg(feature = "embedding-ollama")]
mod ollama;

pub use lexical::LexicalEmbeddings;
#[cfg(feature = "embedding-fastembed")]
pub use local::FastEmbedEmbeddings;
#[cfg(feature = "embedding-ollama")]
pub use ollama::OllamaEmbeddings;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        // rounding can push identical vectors a hair past 1.0
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Returns `None` for the `none` backend; callers degrade to their fallbacks.
pub fn build_provider(cfg: &AppConfig) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
    match cfg.embedding_backend.as_str() {
        #[cfg(feature = "embedding-ollama")]
        "ollama" => Ok(Some(Arc::new(OllamaEmbeddings::new(
            cfg.ollama_host.clone(),
            cfg.embedding_model.clone(),
        )))),
        #[cfg(not(feature = "embedding-ollama"))]
        "ollama" => anyhow::bail!("embedding-ollama feature not compiled in"),
        #[cfg(feature = "embedding-fastembed")]
        "fastembed" => {
            let model = local::LocalEmbeddingModel::from_name(&cfg.fastembed_model)
                .ok_or_else(|| anyhow::anyhow!("unknown fastembed model: {}", cfg.fastembed_model))?;
            Ok(Some(Arc::new(FastEmbedEmbeddings::new(
                model,
                cfg.fastembed_cache_dir.clone(),
            ))))
        }
        #[cfg(not(feature = "embedding-fastembed"))]
        "fastembed" => anyhow::bail!("embedding-fastembed feature not compiled in"),
        "lexical" => Ok(Some(Arc::new(LexicalEmbeddings::default()))),
        "none" => Ok(None),
        other => anyhow::bail!("unknown embedding backend: {other}"),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cosine_identical_and_orthogonal() {
        let a = [1.0f32, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn builds_backends_by_name() {
        let cfg = AppConfig::parse_from(["edgeswarm-router", "--embedding-backend", "lexical"]);
        let p = build_provider(&cfg).unwrap().expect("lexical provider");
        assert_eq!(p.name(), "lexical");

        let cfg = AppConfig::parse_from(["edgeswarm-router", "--embedding-backend", "none"]);
        assert!(build_provider(&cfg).unwrap().is_none());

        let cfg = AppConfig::parse_from(["edgeswarm-router", "--embedding-backend", "bert"]);
        assert!(build_provider(&cfg).is_err());
    }

    #[cfg(not(feature = "embedding-fastembed"))]
    #[test]
    fn fastembed_backend_requires_its_feature() {
        let cfg = AppConfig::parse_from(["edgeswarm-router", "--embedding-backend", "fastembed"]);
        let err = build_provider(&cfg).err().expect("feature is off");
        assert!(err.to_string().contains("embedding-fastembed"));
    }
}
