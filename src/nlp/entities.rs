use crate::nlp::{push_unique, Entities, EntityExtractor};
use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'’&\-]*").expect("valid regex"));

const ORG_SUFFIXES: &[&str] = &[
    "corp", "corporation", "inc", "llc", "ltd", "co", "company", "university", "bank", "group",
    "institute", "foundation", "agency", "association", "labs", "technologies", "systems",
];
const ORG_COMPOUND_SUFFIXES: &[&str] = &["Corp", "Tech", "Soft", "Labs", "Works"];
const LOCATIVES: &[&str] = &["in", "near", "from", "across", "throughout"];
const GAZETTEER: &[&str] = &[
    "new york", "london", "paris", "tokyo", "berlin", "madrid", "rome", "moscow", "beijing",
    "sydney", "toronto", "chicago", "boston", "seattle", "san francisco", "los angeles",
    "washington", "california", "texas", "florida", "europe", "asia", "africa", "america",
    "united states", "united kingdom", "canada", "mexico", "brazil", "china", "india", "japan",
    "germany", "france", "italy", "spain", "russia", "australia",
];
const NON_ENTITY: &[&str] = &[
    "i", "he", "she", "it", "we", "they", "you", "the", "a", "an", "this", "that", "these",
    "those", "my", "his", "her", "our", "their", "in", "on", "at", "from", "to", "and", "but",
    "or", "if", "when", "after", "before", "later", "then", "however", "meanwhile", "there",
    "here", "what", "why", "how", "yesterday", "today", "tomorrow", "monday", "tuesday",
    "wednesday", "thursday", "friday", "saturday", "sunday", "january", "february", "march",
    "april", "may", "june", "july", "august", "september", "october", "november", "december",
];

/// Capitalization-driven named-entity tagger.
#[derive(Debug, Default)]
pub struct HeuristicEntities;

struct Run {
    words: Vec<String>,
    prev: Option<String>,
    sentence_start: bool,
}

#[derive(Debug, PartialEq)]
enum Kind {
    Person,
    Place,
    Organization,
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn strip_possessive(word: &str) -> &str {
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("’s"))
        .unwrap_or(word)
}

fn is_organization(words: &[String]) -> bool {
    if words
        .iter()
        .any(|w| ORG_SUFFIXES.contains(&w.to_lowercase().trim_end_matches('.')))
    {
        return true;
    }
    let Some(last) = words.last() else {
        return false;
    };
    if ORG_COMPOUND_SUFFIXES
        .iter()
        .any(|s| last.len() > s.len() && last.ends_with(s))
    {
        return true;
    }
    // acronyms such as NASA or IBM
    words.len() == 1
        && last.chars().count() >= 2
        && last.chars().all(|c| c.is_alphabetic() && c.is_uppercase())
}

fn classify(run: &Run) -> Option<Kind> {
    let name = run.words.join(" ");
    if is_organization(&run.words) {
        return Some(Kind::Organization);
    }
    if GAZETTEER.contains(&name.to_lowercase().as_str()) {
        return Some(Kind::Place);
    }
    if run.sentence_start && run.words.len() == 1 {
        return None;
    }
    if run
        .prev
        .as_deref()
        .is_some_and(|p| LOCATIVES.contains(&p))
    {
        return Some(Kind::Place);
    }
    (run.words.len() >= 2).then_some(Kind::Person)
}

impl HeuristicEntities {
    fn runs(text: &str) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut current: Option<Run> = None;
        let mut prev_word: Option<String> = None;
        let mut sentence_start = true;
        let mut last_end = 0usize;

        for m in WORD.find_iter(text) {
            let gap = &text[last_end..m.start()];
            last_end = m.end();
            if gap.contains(['.', '!', '?']) {
                sentence_start = true;
            }
            let punctuated = gap.chars().any(|c| !c.is_whitespace());
            if punctuated {
                runs.extend(current.take());
            }

            let word = strip_possessive(m.as_str());
            let lower = word.to_lowercase();
            let joins_run = current.is_some() && lower == "of";
            if is_capitalized(word) || joins_run {
                if current.is_none() && NON_ENTITY.contains(&lower.as_str()) {
                    // "In Paris": the dropped word becomes the run's context
                    prev_word = Some(lower);
                    sentence_start = false;
                    continue;
                }
                current
                    .get_or_insert_with(|| Run {
                        words: Vec::new(),
                        prev: prev_word.clone(),
                        sentence_start,
                    })
                    .words
                    .push(word.to_string());
                if word.len() != m.as_str().len() {
                    // a possessive closes the name
                    runs.extend(current.take());
                }
            } else {
                runs.extend(current.take());
            }
            prev_word = Some(lower);
            sentence_start = false;
        }
        runs.extend(current.take());

        // a connector may have been left dangling at the end of a run
        for run in &mut runs {
            while run.words.last().is_some_and(|w| w == "of") {
                run.words.pop();
            }
        }
        runs.retain(|r| !r.words.is_empty());
        runs
    }
}

impl EntityExtractor for HeuristicEntities {
    fn extract(&self, text: &str) -> Entities {
        let mut entities = Entities::default();
        for run in Self::runs(text) {
            let name = run.words.join(" ");
            match classify(&run) {
                Some(Kind::Person) => push_unique(&mut entities.people, name),
                Some(Kind::Place) => push_unique(&mut entities.places, name),
                Some(Kind::Organization) => push_unique(&mut entities.organizations, name),
                None => {}
            }
        }
        entities
    }
}
