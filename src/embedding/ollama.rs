use crate::confidence::checked_distance;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::errors::ProviderError;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use std::sync::Arc;

const CACHE_CAPACITY: usize = 1024;

/// Sentence embeddings from an Ollama server; distance is `1 - cos`.
pub struct OllamaEmbeddings {
    host: String,
    model: String,
    client: Client,
    cache: DashMap<String, Arc<Vec<f32>>>,
}

impl OllamaEmbeddings {
    pub fn new(host: String, model: String) -> Self {
        Self {
            host,
            model,
            client: Client::new(),
            cache: DashMap::new(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Arc<Vec<f32>>, ProviderError> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit.clone());
        }

        let url = format!("{}/api/embeddings", self.host.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        // Simple retry with backoff; only connection failures mean "unavailable"
        let mut last_err = ProviderError::Unavailable;
        for attempt in 0..3u64 {
            match self.client.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let v: serde_json::Value = resp
                        .json()
                        .await
                        .map_err(|e| ProviderError::Malformed(format!("decode response: {e}")))?;
                    let vector = parse_embedding(&v)?;
                    let vector = Arc::new(vector);
                    if self.cache.len() >= CACHE_CAPACITY {
                        self.cache.clear();
                    }
                    self.cache.insert(text.to_string(), vector.clone());
                    return Ok(vector);
                }
                Ok(resp) => {
                    last_err = ProviderError::Http(format!(
                        "status {} from {}",
                        resp.status(),
                        self.host
                    ));
                }
                Err(e) => {
                    tracing::debug!(host=%self.host, attempt, error=%e, "embedding request failed");
                    last_err = ProviderError::Unavailable;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(100 * (attempt + 1))).await;
        }
        Err(last_err)
    }
}

fn parse_embedding(v: &serde_json::Value) -> Result<Vec<f32>, ProviderError> {
    let values = v
        .get("embedding")
        .and_then(|x| x.as_array())
        .ok_or_else(|| ProviderError::Malformed("missing 'embedding' array".into()))?;
    if values.is_empty() {
        return Err(ProviderError::Malformed("empty embedding".into()));
    }
    values
        .iter()
        .map(|x| {
            x.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| ProviderError::Malformed("non-numeric embedding value".into()))
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn name(&self) -> &str {
        "ollama"
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
