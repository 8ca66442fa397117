use crate::errors::RouteError;
use async_trait::async_trait;

/// Number of sentences an extractive summary keeps.
pub const SUMMARY_SENTENCES: usize = 3;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, input: &str) -> Result<String, RouteError>;
}

mod extractive;

pub use extractive::ExtractiveSummarizer;

/// Leading sentences joined by single spaces; the degraded summary.
pub(crate) fn lead(sentences: &[String]) -> String {
    sentences
        .iter()
        .take(SUMMARY_SENTENCES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
