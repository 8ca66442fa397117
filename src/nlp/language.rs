use crate::nlp::LanguageDetector;
use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").expect("valid regex"));

/// Latin-script candidates in tie-break order.
const STOP_WORDS: &[(&str, &[&str])] = &[
    (
        "English",
        &[
            "the", "and", "is", "are", "was", "of", "to", "in", "that", "it", "with", "for",
            "this", "you", "not", "have", "be", "on",
        ],
    ),
    (
        "Spanish",
        &[
            "el", "la", "los", "las", "y", "es", "que", "de", "en", "un", "una", "por", "con",
            "para", "del", "no", "se", "está",
        ],
    ),
    (
        "French",
        &[
            "le", "la", "les", "et", "est", "que", "de", "des", "en", "un", "une", "pour", "avec",
            "pas", "du", "dans", "ce", "je", "il",
        ],
    ),
    (
        "German",
        &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "mit", "den", "von",
            "ich", "sie", "auf", "für", "es",
        ],
    ),
    (
        "Italian",
        &[
            "il", "la", "e", "è", "che", "di", "un", "una", "per", "con", "non", "sono", "del",
            "della", "gli", "le",
        ],
    ),
    (
        "Portuguese",
        &[
            "o", "a", "os", "as", "e", "é", "que", "de", "em", "um", "uma", "para", "com", "não",
            "do", "da", "por",
        ],
    ),
    (
        "Dutch",
        &[
            "de", "het", "en", "is", "een", "van", "niet", "dat", "op", "te", "met", "voor",
            "zijn", "ik",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Latin,
    Cyrillic,
    Greek,
    Hebrew,
    Arabic,
    Devanagari,
    Thai,
    Hangul,
    Kana,
    Han,
}

const SCRIPTS: [Script; 10] = [
    Script::Latin,
    Script::Cyrillic,
    Script::Greek,
    Script::Hebrew,
    Script::Arabic,
    Script::Devanagari,
    Script::Thai,
    Script::Hangul,
    Script::Kana,
    Script::Han,
];

fn script_of(c: char) -> Option<Script> {
    match c {
        'a'..='z' | 'A'..='Z' | '\u{00C0}'..='\u{024F}' if c.is_alphabetic() => Some(Script::Latin),
        '\u{0400}'..='\u{04FF}' => Some(Script::Cyrillic),
        '\u{0370}'..='\u{03FF}' => Some(Script::Greek),
        '\u{0590}'..='\u{05FF}' => Some(Script::Hebrew),
        '\u{0600}'..='\u{06FF}' => Some(Script::Arabic),
        '\u{0900}'..='\u{097F}' => Some(Script::Devanagari),
        '\u{0E00}'..='\u{0E7F}' => Some(Script::Thai),
        '\u{1100}'..='\u{11FF}' | '\u{AC00}'..='\u{D7AF}' => Some(Script::Hangul),
        '\u{3040}'..='\u{30FF}' => Some(Script::Kana),
        '\u{4E00}'..='\u{9FFF}' => Some(Script::Han),
        _ => None,
    }
}

/// Dominant writing system first, then stop-word hits for Latin text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptLanguage;

impl ScriptLanguage {
    fn dominant_script(text: &str) -> Option<(Script, [usize; 10])> {
        let mut counts = [0usize; 10];
        for c in text.chars() {
            if let Some(script) = script_of(c) {
                if let Some(i) = SCRIPTS.iter().position(|s| *s == script) {
                    counts[i] += 1;
                }
            }
        }
        let (index, &max) = counts
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.cmp(b).then(ib.cmp(ia)))?;
        if max == 0 {
            return None;
        }
        Some((SCRIPTS[index], counts))
    }

    fn latin_language(text: &str) -> Option<&'static str> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();
        let mut best: Option<(&'static str, usize)> = None;
        for (language, stop_words) in STOP_WORDS {
            let hits = words.iter().filter(|w| stop_words.contains(w)).count();
            if hits > 0 && best.map_or(true, |(_, h)| hits > h) {
                best = Some((*language, hits));
            }
        }
        best.map(|(language, _)| language)
    }
}

impl LanguageDetector for ScriptLanguage {
    fn detect(&self, text: &str) -> Option<&'static str> {
        let (script, counts) = Self::dominant_script(text)?;
        let kana = counts[SCRIPTS.iter().position(|s| *s == Script::Kana)?];
        match script {
            Script::Latin => Self::latin_language(text),
            Script::Cyrillic if text.chars().any(|c| matches!(c, 'і' | 'ї' | 'є' | 'ґ')) => {
                Some("Ukrainian")
            }
            Script::Cyrillic => Some("Russian"),
            Script::Greek => Some("Greek"),
            Script::Hebrew => Some("Hebrew"),
            Script::Arabic => Some("Arabic"),
            Script::Devanagari => Some("Hindi"),
            Script::Thai => Some("Thai"),
            Script::Hangul => Some("Korean"),
            Script::Kana => Some("Japanese"),
            Script::Han if kana > 0 => Some("Japanese"),
            Script::Han => Some("Chinese"),
        }
    }
}
