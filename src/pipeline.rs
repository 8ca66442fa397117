use crate::embedding::EmbeddingProvider;
use crate::errors::RouteError;
use crate::nlp::{
    Entities, EntityExtractor, HeuristicEntities, LanguageDetector, LexiconSentiment,
    RuleSegmenter, ScriptLanguage, SentimentReport, SentimentScorer,
};
use crate::router::{ClassificationResult, Intent, IntentRouter, RouterConfig};
use crate::summarize::{ExtractiveSummarizer, Summarizer};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const UNKNOWN_TASK_MESSAGE: &str =
    "Could not determine the best task for this text. Try being more specific.";

pub const UNKNOWN_LANGUAGE: &str = "Unknown";

#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub intent: Intent,
    pub intent_label: &'static str,
    pub confidence: f64,
    pub result: String,
}

/// Classify-then-dispatch over shared, stateless components.
pub struct Pipeline {
    router: IntentRouter,
    summarizer: Arc<dyn Summarizer>,
    sentiment: Arc<dyn SentimentScorer>,
    entities: Arc<dyn EntityExtractor>,
    language: Arc<dyn LanguageDetector>,
}

impl Pipeline {
    pub fn new(
        router: IntentRouter,
        summarizer: Arc<dyn Summarizer>,
        sentiment: Arc<dyn SentimentScorer>,
        entities: Arc<dyn EntityExtractor>,
        language: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            router,
            summarizer,
            sentiment,
            entities,
            language,
        }
    }

    /// Built-in text collaborators around one shared embedding provider.
    pub fn with_provider(provider: Option<Arc<dyn EmbeddingProvider>>, anchors: RouterConfig) -> Self {
        Self::new(
            IntentRouter::new(provider.clone(), anchors),
            Arc::new(ExtractiveSummarizer::new(provider, Arc::new(RuleSegmenter))),
            Arc::new(LexiconSentiment),
            Arc::new(HeuristicEntities),
            Arc::new(ScriptLanguage),
        )
    }

    pub async fn classify(&self, text: &str) -> Result<ClassificationResult, RouteError> {
        self.router.classify(text).await
    }

    pub async fn summarize(&self, text: &str) -> Result<String, RouteError> {
        self.summarizer.summarize(text).await
    }

    pub fn sentiment(&self, text: &str) -> SentimentReport {
        SentimentReport::from_score(self.sentiment.score(text))
    }

    pub fn entities(&self, text: &str) -> Entities {
        self.entities.extract(text)
    }

    pub fn language(&self, text: &str) -> &'static str {
        self.language.detect(text).unwrap_or(UNKNOWN_LANGUAGE)
    }

    pub async fn dispatch(
        &self,
        classification: ClassificationResult,
        text: &str,
    ) -> Result<String, RouteError> {
        match classification.intent {
            Intent::Summarize => self.summarize(text).await,
            Intent::Sentiment => Ok(self.sentiment(text).describe()),
            Intent::Extract => Ok(self.entities(text).describe()),
            Intent::Unknown => Ok(UNKNOWN_TASK_MESSAGE.to_string()),
        }
    }

    pub async fn process(&self, text: &str) -> Result<RouteOutcome, RouteError> {
        let classification = self.classify(text).await?;
        let result = self.dispatch(classification, text).await?;
        tracing::info!(
            intent=?classification.intent,
            confidence=classification.confidence,
            result_chars=result.chars().count(),
            "processed request"
        );
        Ok(RouteOutcome {
            intent: classification.intent,
            intent_label: classification.intent.label(),
            confidence: classification.confidence,
            result,
        })
    }
}

/// Single active request: starting a new one cancels the previous one, and a
/// result from a superseded generation is never returned.
#[derive(Default)]
pub struct RequestSlot {
    generation: AtomicU64,
    active: Mutex<Option<(u64, CancellationToken)>>,
}

/// Claim on the slot taken by [`RequestSlot::begin`].
#[derive(Debug)]
pub struct Ticket {
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot, cancelling whichever request held it.
    pub fn begin(&self) -> Ticket {
        let token = CancellationToken::new();
        let mut active = self.active.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((previous_generation, previous)) = active.replace((generation, token.clone())) {
            tracing::debug!(previous_generation, generation, "superseding in-flight request");
            previous.cancel();
        }
        Ticket { generation, token }
    }

    pub async fn complete<F, T>(&self, ticket: Ticket, fut: F) -> Result<T, RouteError>
    where
        F: Future<Output = Result<T, RouteError>>,
    {
        let outcome = tokio::select! {
            _ = ticket.token.cancelled() => Err(RouteError::Superseded),
            res = fut => res,
        };

        let mut active = self.active.lock();
        if self.generation.load(Ordering::SeqCst) != ticket.generation {
            tracing::debug!(generation = ticket.generation, "discarding stale result");
            return Err(RouteError::Superseded);
        }
        if active.as_ref().is_some_and(|(g, _)| *g == ticket.generation) {
            *active = None;
        }
        outcome
    }

    /// Abandon the in-flight request, if any. Returns whether one was active.
    pub fn cancel_active(&self) -> bool {
        let mut active = self.active.lock();
        match active.take() {
            Some((_, token)) => {
                // bump so a result racing the cancel is still discarded
                self.generation.fetch_add(1, Ordering::SeqCst);
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
