//! Nearest-anchor intent classification in embedding space.

use crate::confidence::{checked_distance, distance_to_confidence, meets_threshold};
use crate::embedding::EmbeddingProvider;
use crate::errors::{AnchorError, RouteError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Summarize,
    Sentiment,
    Extract,
    Unknown,
}

impl Intent {
    pub fn label(self) -> &'static str {
        match self {
            Intent::Summarize => "Summarize",
            Intent::Sentiment => "Sentiment Analysis",
            Intent::Extract => "Extract Information",
            Intent::Unknown => "Unknown",
        }
    }
}

/// Reference texts blending command phrasing with representative content.
/// Order matters: the first anchor wins an exact distance tie.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    anchors: Vec<(Intent, String)>,
}

impl RouterConfig {
    pub fn new(anchors: Vec<(Intent, String)>) -> Result<Self, AnchorError> {
        if anchors.is_empty() {
            return Err(AnchorError::Empty);
        }
        let mut seen = Vec::with_capacity(anchors.len());
        for (intent, description) in &anchors {
            if *intent == Intent::Unknown {
                return Err(AnchorError::UnknownIntent);
            }
            if description.trim().is_empty() {
                return Err(AnchorError::BlankDescription(*intent));
            }
            if seen.contains(intent) {
                return Err(AnchorError::Duplicate(*intent));
            }
            seen.push(*intent);
        }
        Ok(Self { anchors })
    }

    /// Parse an ordered JSON array of `{"intent": "...", "description": "..."}`.
    pub fn from_json(json: &str) -> Result<Self, AnchorError> {
        let entries: Vec<AnchorEntry> = serde_json::from_str(json)?;
        Self::new(
            entries
                .into_iter()
                .map(|s| (s.intent, s.description))
                .collect(),
        )
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AnchorError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn anchors(&self) -> &[(Intent, String)] {
        &self.anchors
    }
}

#[derive(Debug, Deserialize)]
struct AnchorEntry {
    intent: Intent,
    description: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            anchors: vec![
                (
                    Intent::Summarize,
                    "summarize this text, tl;dr, brief overview. Climate change is causing global warming. The economy is growing. A long story about history.".into(),
                ),
                (
                    Intent::Sentiment,
                    "review, opinion, feedback, rating. I love this product, it is amazing, terrible experience, worst purchase, 5 stars, best ever.".into(),
                ),
                (
                    Intent::Extract,
                    "extract names, find numbers, get data. Call me at 555-1234. My email is test@example.com. John Smith lives in New York.".into(),
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    pub confidence: f64,
}

impl ClassificationResult {
    fn fallback() -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
        }
    }
}

pub struct IntentRouter {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    config: RouterConfig,
}

impl IntentRouter {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, config: RouterConfig) -> Self {
        Self { provider, config }
    }

    /// Classify `input` against every anchor.
    ///
    /// Below the confidence threshold the label becomes `Unknown` but the
    /// best anchor's confidence is kept. An absent or failing provider
    /// yields `(Unknown, 0.0)`; an out-of-range distance is an error.
    pub async fn classify(&self, input: &str) -> Result<ClassificationResult, RouteError> {
        if input.trim().is_empty() {
            return Err(RouteError::EmptyInput);
        }
        let Some(provider) = self.provider.as_ref() else {
            tracing::warn!("no embedding provider configured; routing to unknown");
            return Ok(ClassificationResult::fallback());
        };

        let lowered = input.to_lowercase();
        let mut best: Option<(Intent, f64)> = None;
        for (intent, description) in self.config.anchors() {
            let distance = match provider
                .distance(&lowered, description)
                .await
                .and_then(checked_distance)
            {
                Ok(d) => d,
                Err(e) => match RouteError::from(e) {
                    RouteError::ProviderUnavailable => {
                        tracing::warn!(provider = provider.name(), "embedding provider unavailable; routing to unknown");
                        return Ok(ClassificationResult::fallback());
                    }
                    other => return Err(other),
                },
            };
            tracing::trace!(intent=?intent, distance, "anchor distance");
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((*intent, distance));
            }
        }

        // RouterConfig guarantees at least one anchor
        let Some((intent, distance)) = best else {
            return Ok(ClassificationResult::fallback());
        };
        let confidence = distance_to_confidence(distance);
        let intent = if meets_threshold(confidence) {
            intent
        } else {
            Intent::Unknown
        };
        tracing::debug!(intent=?intent, confidence, distance, "classified input");
        Ok(ClassificationResult { intent, confidence })
    }
}
