use crate::nlp::SentimentScorer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+(?:['’][a-z]+)?").expect("valid regex"));

static VALENCE: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("love", 3.0),
        ("loved", 2.9),
        ("amazing", 2.8),
        ("excellent", 2.7),
        ("awesome", 3.1),
        ("fantastic", 2.6),
        ("wonderful", 2.7),
        ("perfect", 2.7),
        ("best", 3.2),
        ("great", 3.1),
        ("happy", 2.7),
        ("delighted", 2.8),
        ("good", 1.9),
        ("nice", 1.8),
        ("like", 1.5),
        ("enjoy", 2.2),
        ("enjoyed", 2.3),
        ("recommend", 1.5),
        ("helpful", 1.8),
        ("fast", 0.8),
        ("easy", 1.9),
        ("pleased", 2.0),
        ("satisfied", 1.8),
        ("beautiful", 2.9),
        ("brilliant", 2.8),
        ("fine", 0.8),
        ("okay", 0.9),
        ("hate", -2.7),
        ("hated", -3.2),
        ("terrible", -2.5),
        ("horrible", -2.5),
        ("awful", -2.0),
        ("worst", -3.1),
        ("bad", -2.5),
        ("poor", -2.1),
        ("disappointed", -1.9),
        ("disappointing", -2.2),
        ("broken", -2.0),
        ("useless", -1.8),
        ("slow", -0.9),
        ("angry", -2.3),
        ("sad", -2.1),
        ("annoying", -1.9),
        ("waste", -1.8),
        ("refund", -0.9),
        ("problem", -1.7),
        ("fail", -2.5),
        ("failed", -2.3),
        ("ugly", -2.3),
        ("rude", -2.0),
        ("wrong", -2.1),
    ]
    .into_iter()
    .collect()
});

static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("very", 0.293),
        ("really", 0.293),
        ("extremely", 0.293),
        ("absolutely", 0.293),
        ("incredibly", 0.293),
        ("so", 0.293),
        ("totally", 0.293),
        ("slightly", -0.293),
        ("somewhat", -0.293),
        ("barely", -0.293),
    ]
    .into_iter()
    .collect()
});

const NEGATORS: &[&str] = &["not", "no", "never", "none", "nothing", "neither", "nor", "without", "hardly"];
const NEGATION_SCALAR: f64 = -0.74;
const NEGATION_WINDOW: usize = 3;
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Valence-lexicon scorer with booster and negation handling; the raw sum
/// is squashed by `s / sqrt(s^2 + alpha)`.
#[derive(Debug, Default)]
pub struct LexiconSentiment;

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't") || word.ends_with("n’t")
}

impl SentimentScorer for LexiconSentiment {
    fn score(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut sum = 0.0;
        for (i, word) in words.iter().enumerate() {
            let Some(&base) = VALENCE.get(word) else {
                continue;
            };
            let mut valence = base;
            let window = &words[i.saturating_sub(NEGATION_WINDOW)..i];
            if let Some(prev) = window.last() {
                if let Some(boost) = BOOSTERS.get(prev) {
                    valence += boost * valence.signum();
                }
            }
            if window.iter().any(|w| is_negator(w)) {
                valence *= NEGATION_SCALAR;
            }
            sum += valence;
        }
        if sum == 0.0 {
            return 0.0;
        }
        (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
    }
}
