use crate::nlp::SentenceSegmenter;
use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

const TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']'];
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "vs", "fig", "approx", "e.g", "i.e",
    "u.s", "u.k",
];

/// Punctuation-driven sentence splitter.
///
/// Breaks after a terminator (plus trailing quotes/brackets) that is followed
/// by whitespace, and at blank lines. Abbreviations, initials and decimals
/// do not end a sentence.
#[derive(Debug, Default)]
pub struct RuleSegmenter;

impl RuleSegmenter {
    fn segment_block(block: &str, out: &mut Vec<String>) {
        let chars: Vec<(usize, char)> = block.char_indices().collect();
        let mut start = 0usize;
        let mut i = 0usize;
        while i < chars.len() {
            let (pos, c) = chars[i];
            if !TERMINATORS.contains(&c) {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            while j < chars.len() && (TERMINATORS.contains(&chars[j].1) || CLOSERS.contains(&chars[j].1)) {
                j += 1;
            }
            let at_boundary = j == chars.len() || chars[j].1.is_whitespace();
            if at_boundary && !(c == '.' && ends_with_abbreviation(&block[start..pos])) {
                let end = chars.get(j).map_or(block.len(), |(p, _)| *p);
                push_trimmed(out, &block[start..end]);
                start = end;
            }
            i = j;
        }
        push_trimmed(out, &block[start..]);
    }
}

fn ends_with_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(['(', '"', '\'', '“']);
    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        // initials such as "J. R. R. Tolkien"
        return first.is_uppercase();
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}

impl SentenceSegmenter for RuleSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for block in PARAGRAPH_BREAK.split(text) {
            Self::segment_block(block, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> Vec<String> {
        RuleSegmenter.segment(text)
    }

    #[test]
    fn splits_on_terminators_followed_by_space() {
        assert_eq!(
            seg("One is short. Two is longer! Is this three? Four."),
            vec!["One is short.", "Two is longer!", "Is this three?", "Four."]
        );
    }

    #[test]
    fn keeps_abbreviations_initials_and_decimals() {
        assert_eq!(
            seg("Dr. Smith paid $3.50 for it. J. R. Tolkien wrote books, e.g. The Hobbit. Done."),
            vec![
                "Dr. Smith paid $3.50 for it.",
                "J. R. Tolkien wrote books, e.g. The Hobbit.",
                "Done."
            ]
        );
    }

    #[test]
    fn closing_quotes_stay_with_their_sentence() {
        assert_eq!(
            seg("She said \"stop.\" Then she left... Finally!?"),
            vec!["She said \"stop.\"", "Then she left...", "Finally!?"]
        );
    }

    #[test]
    fn blank_lines_break_sentences_and_empty_text_yields_nothing() {
        assert_eq!(seg("A heading\n\nBody text here"), vec!["A heading", "Body text here"]);
        assert!(seg("").is_empty());
        assert!(seg("   \n  ").is_empty());
    }
}
