use crate::confidence::checked_distance;
use crate::embedding::EmbeddingProvider;
use crate::errors::RouteError;
use crate::nlp::SentenceSegmenter;
use crate::summarize::{lead, Summarizer, SUMMARY_SENTENCES};
use async_trait::async_trait;
use std::sync::Arc;

/// Centrality ranking: each sentence is scored by its embedding distance to
/// the whole document and the closest ones are kept in narrative order.
pub struct ExtractiveSummarizer {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    segmenter: Arc<dyn SentenceSegmenter>,
}

struct RankedSentence<'a> {
    index: usize,
    score: f64,
    text: &'a str,
}

impl ExtractiveSummarizer {
    pub fn new(
        provider: Option<Arc<dyn EmbeddingProvider>>,
        segmenter: Arc<dyn SentenceSegmenter>,
    ) -> Self {
        Self {
            provider,
            segmenter,
        }
    }

    async fn rank(&self, input: &str, sentences: &[String]) -> Result<String, RouteError> {
        let Some(provider) = self.provider.as_ref() else {
            return Err(RouteError::ProviderUnavailable);
        };
        let document = input.to_lowercase();
        let mut ranked = Vec::with_capacity(sentences.len());
        for (index, text) in sentences.iter().enumerate() {
            let score = provider
                .distance(&text.to_lowercase(), &document)
                .await
                .and_then(checked_distance)?;
            ranked.push(RankedSentence {
                index,
                score,
                text: text.as_str(),
            });
        }

        ranked.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.index.cmp(&b.index)));
        ranked.truncate(SUMMARY_SENTENCES);
        ranked.sort_by_key(|r| r.index);
        tracing::debug!(
            selected = ?ranked.iter().map(|r| r.index).collect::<Vec<_>>(),
            total = sentences.len(),
            "ranked sentences by centrality"
        );
        Ok(ranked
            .iter()
            .map(|r| r.text)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, input: &str) -> Result<String, RouteError> {
        if input.trim().is_empty() {
            return Err(RouteError::EmptyInput);
        }
        let sentences = self.segmenter.segment(input);
        if sentences.len() <= SUMMARY_SENTENCES {
            return Ok(input.to_string());
        }
        match self.rank(input, &sentences).await {
            Err(RouteError::ProviderUnavailable) => {
                tracing::warn!("embedding provider unavailable; returning leading sentences");
                Ok(lead(&sentences))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::ScriptedProvider;
    use crate::errors::ProviderError;
    use crate::nlp::RuleSegmenter;

    const DOC: &str = "Alpha opens the story. Bravo adds detail. Charlie is the key point. \
                       Delta digresses. Echo returns to the key point.";

    /// Scores sentences by their first word.
    fn by_first_word(scores: &'static [(&'static str, f64)]) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::new(move |sentence, _document| {
            let first = sentence.split_whitespace().next().unwrap_or("");
            Ok(scores
                .iter()
                .find(|(w, _)| *w == first)
                .map(|(_, s)| *s)
                .unwrap_or(1.0))
        }))
    }

    fn summarizer(p: Option<Arc<ScriptedProvider>>) -> ExtractiveSummarizer {
        ExtractiveSummarizer::new(
            p.map(|p| p as Arc<dyn EmbeddingProvider>),
            Arc::new(RuleSegmenter),
        )
    }

    #[tokio::test]
    async fn keeps_three_most_central_in_original_order() {
        let p = by_first_word(&[
            ("alpha", 0.9),
            ("bravo", 0.7),
            ("charlie", 0.1),
            ("delta", 1.8),
            ("echo", 0.2),
        ]);
        let out = summarizer(Some(p.clone())).summarize(DOC).await.unwrap();
        assert_eq!(
            out,
            "Bravo adds detail. Charlie is the key point. Echo returns to the key point."
        );
        assert_eq!(p.call_count(), 5);
    }

    #[tokio::test]
    async fn compares_lowercased_sentence_to_lowercased_document() {
        let p = Arc::new(ScriptedProvider::new(|sentence, document| {
            assert_eq!(sentence, sentence.to_lowercase());
            assert_eq!(document, DOC.to_lowercase());
            Ok(0.5)
        }));
        summarizer(Some(p)).summarize(DOC).await.unwrap();
    }

    #[tokio::test]
    async fn ties_prefer_earlier_sentences() {
        let p = by_first_word(&[("alpha", 0.3), ("bravo", 0.3), ("charlie", 0.3), ("delta", 0.3), ("echo", 0.3)]);
        let out = summarizer(Some(p)).summarize(DOC).await.unwrap();
        assert_eq!(
            out,
            "Alpha opens the story. Bravo adds detail. Charlie is the key point."
        );
    }

    #[tokio::test]
    async fn short_documents_are_returned_byte_for_byte() {
        let p = by_first_word(&[]);
        let s = summarizer(Some(p.clone()));
        let text = "  One.   Two!\n\nThree?  ";
        assert_eq!(s.summarize(text).await.unwrap(), text);
        assert_eq!(s.summarize("just one line").await.unwrap(), "just one line");
        assert_eq!(p.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let s = summarizer(None);
        assert!(matches!(s.summarize("").await, Err(RouteError::EmptyInput)));
        assert!(matches!(s.summarize(" \t").await, Err(RouteError::EmptyInput)));
    }

    #[tokio::test]
    async fn missing_or_failing_provider_falls_back_to_lead() {
        let expected = "Alpha opens the story. Bravo adds detail. Charlie is the key point.";
        assert_eq!(summarizer(None).summarize(DOC).await.unwrap(), expected);

        let failing = Arc::new(ScriptedProvider::new(|_, _| {
            Err(ProviderError::Http("status 503".into()))
        }));
        assert_eq!(summarizer(Some(failing)).summarize(DOC).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn raw_distances_outside_range_are_rejected() {
        for bad in [3.0, -1.0, f64::NAN] {
            let p = Arc::new(ScriptedProvider::new(move |_, _| Ok(bad)));
            let err = summarizer(Some(p)).summarize(DOC).await.unwrap_err();
            assert!(
                matches!(err, RouteError::ContractViolation { .. }),
                "{bad} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn out_of_range_distance_surfaces_contract_violation() {
        let p = Arc::new(ScriptedProvider::new(|_, _| Err(ProviderError::OutOfRange(-0.5))));
        let err = summarizer(Some(p)).summarize(DOC).await.unwrap_err();
        assert!(matches!(err, RouteError::ContractViolation { .. }));
    }
}
