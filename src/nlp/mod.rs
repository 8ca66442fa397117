//! Text-analysis collaborators used around the router: sentence
//! segmentation, sentiment scoring, entity extraction and language
//! identification.

use serde::Serialize;

pub trait SentenceSegmenter: Send + Sync {
    /// Non-empty, trimmed sentences in original order.
    fn segment(&self, text: &str) -> Vec<String>;
}

pub trait SentimentScorer: Send + Sync {
    /// Polarity in `[-1, 1]`.
    fn score(&self, text: &str) -> f64;
}

pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Entities;
}

pub trait LanguageDetector: Send + Sync {
    /// English name of the dominant language, `None` when undecidable.
    fn detect(&self, text: &str) -> Option<&'static str>;
}

mod entities;
mod language;
mod segment;
mod sentiment;

pub use entities::HeuristicEntities;
pub use language::ScriptLanguage;
pub use segment::RuleSegmenter;
pub use sentiment::LexiconSentiment;

#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub score: f64,
    pub label: &'static str,
}

impl SentimentReport {
    pub fn from_score(score: f64) -> Self {
        let label = if score > 0.5 {
            "🤩 Very Positive"
        } else if score > 0.1 {
            "🙂 Positive"
        } else if score < -0.5 {
            "🤬 Very Negative"
        } else if score < -0.1 {
            "🙁 Negative"
        } else {
            "😐 Neutral"
        };
        Self { score, label }
    }

    pub fn describe(&self) -> String {
        format!("{} (Score: {:.2})", self.label, self.score)
    }
}

/// Deduplicated mentions, each list in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entities {
    pub people: Vec<String>,
    pub places: Vec<String>,
    pub organizations: Vec<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.places.is_empty() && self.organizations.is_empty()
    }

    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "No specific entities found.".into();
        }
        let mut lines = Vec::new();
        if !self.people.is_empty() {
            lines.push(format!("👤 People: {}", self.people.join(", ")));
        }
        if !self.places.is_empty() {
            lines.push(format!("📍 Places: {}", self.places.join(", ")));
        }
        if !self.organizations.is_empty() {
            lines.push(format!("🏢 Organizations: {}", self.organizations.join(", ")));
        }
        lines.join("\n")
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
