//! Offline bag-of-words stand-in for a sentence-embedding model.
//!
//! Vectors are sparse term counts over lowercased alphanumeric tokens with
//! stop words removed and all numerals folded into one `<num>` term. Term
//! counts are non-negative, so cosine lies in `[0, 1]`; the distance
//! `2 * (1 - cos)` spans the full `[0, 2]` range, with texts sharing no
//! terms at the maximum.

use crate::confidence::checked_distance;
use crate::embedding::EmbeddingProvider;
use crate::errors::ProviderError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("valid regex"));

const NUMERAL: &str = "<num>";

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    "a an the and or but nor is are was were be been being am i me my mine we us our ours \
     you your yours he him his she her hers it its they them their theirs this that these \
     those of in on at to for from by with as about into onto over under after before \
     between through during ve s t ll d re m has have had having do does did doing so than \
     too very can could will would shall should may might must just there here what which \
     who whom whose when where why how up down out off if then also since all any some such \
     each both few more most other own same only again further once until while because \
     against per via"
        .split_whitespace()
        .collect()
});

#[derive(Debug, Default)]
pub struct LexicalEmbeddings;

type TermVector = HashMap<String, f64>;

impl LexicalEmbeddings {
    fn vectorize(text: &str) -> TermVector {
        let lowered = text.to_lowercase();
        let mut terms = TermVector::new();
        for m in TOKEN.find_iter(&lowered) {
            let word = m.as_str();
            if STOP_WORDS.contains(word) {
                continue;
            }
            let term = if word.chars().all(|c| c.is_ascii_digit()) {
                NUMERAL
            } else {
                word
            };
            *terms.entry(term.to_string()).or_insert(0.0) += 1.0;
        }
        terms
    }

    fn cosine(a: &TermVector, b: &TermVector) -> f64 {
        let dot: f64 = a
            .iter()
            .map(|(term, wa)| wa * b.get(term).copied().unwrap_or(0.0))
            .sum();
        let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
        let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
        (dot / (norm_a * norm_b)).min(1.0)
    }
}

#[async_trait]
impl EmbeddingProvider for LexicalEmbeddings {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn distance(&self, a: &str, b: &str) -> Result<f64, ProviderError> {
        let va = Self::vectorize(a);
        let vb = Self::vectorize(b);
        if va.is_empty() || vb.is_empty() {
            // no content terms to compare
            return Ok(if a == b { 0.0 } else { 2.0 });
        }
        checked_distance(2.0 * (1.0 - Self::cosine(&va, &vb)))
    }
}
