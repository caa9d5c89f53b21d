//! Keyword extraction (C8): URL path/query analysis, tokenization, stop-word
//! filtering, and primary-keyword selection.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use url::Url;

use crate::models::Keyword;
use crate::utils::{KEYWORD_MAX_LEN, KEYWORD_MIN_LEN};

const QUERY_KEYS: &[&str] = &["q", "query", "search", "keyword", "tag", "category", "title"];

static GENERAL_STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "with", "by", "at", "is",
        "are", "was", "were", "be", "been", "this", "that", "these", "those", "it", "its", "as",
        "from", "into", "about", "index", "home", "page",
    ]
    .into_iter()
    .collect()
});

static GAMING_STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["game", "games", "play", "playing", "online", "free", "html5", "flash", "io"]
        .into_iter()
        .collect()
});

static GAMING_ALLOW_LIST: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["mario", "tetris", "zelda", "sonic", "pacman", "minecraft"].into_iter().collect()
});

/// Game-number tokens that survive the general length/word filters even
/// though they look like short numerics (§4.8 step 5): `2d`, `3d`, `2048`.
static GAME_NUMBER_ALLOW_LIST: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["2d", "3d", "2048"].into_iter().collect());

/// A single extracted keyword and the position in the URL path it came
/// from, used to break ties in primary-keyword selection.
#[derive(Debug, Clone)]
struct Candidate {
    text: String,
    position: usize,
}

/// Pluggable filter applied in declared order over the candidate set
/// (§4.8's "optional pluggable filter chain: length, stop-word, duplicate").
pub trait KeywordFilter: Send + Sync {
    fn retain(&self, candidate: &str) -> bool;
}

pub struct LengthFilter;
impl KeywordFilter for LengthFilter {
    fn retain(&self, candidate: &str) -> bool {
        if GAME_NUMBER_ALLOW_LIST.contains(candidate) || GAMING_ALLOW_LIST.contains(candidate) {
            return true;
        }
        let len = candidate.chars().count();
        (KEYWORD_MIN_LEN..=KEYWORD_MAX_LEN).contains(&len)
    }
}

pub struct StopWordFilter;
impl KeywordFilter for StopWordFilter {
    fn retain(&self, candidate: &str) -> bool {
        if GAMING_ALLOW_LIST.contains(candidate) || GAME_NUMBER_ALLOW_LIST.contains(candidate) {
            return true;
        }
        !GENERAL_STOP_WORDS.contains(candidate) && !GAMING_STOP_WORDS.contains(candidate)
    }
}

/// Extracted keywords for a single URL, with the primary keyword (if any)
/// singled out for the upstream API pipeline (§4.8).
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub keywords: Vec<Keyword>,
    pub primary: Option<Keyword>,
}

/// Run the full extraction pipeline over `url` (§4.8 steps 1-7).
#[must_use]
pub fn extract(url: &str) -> ExtractionResult {
    extract_with_filters(url, &default_filter_chain())
}

/// As [`extract`], but with an explicit filter chain applied in order.
#[must_use]
pub fn extract_with_filters(url: &str, filters: &[Box<dyn KeywordFilter>]) -> ExtractionResult {
    let Ok(parsed) = Url::parse(url) else {
        return ExtractionResult::default();
    };

    let mut candidates = Vec::new();
    let mut position = 0usize;

    for segment in path_segments_without_extension(&parsed) {
        for phrase in split_segment(segment) {
            candidates.push(Candidate { text: phrase, position });
            position += 1;
        }
    }

    for key in QUERY_KEYS {
        if let Some((_, value)) = parsed.query_pairs().find(|(k, _)| k == key) {
            for phrase in split_segment(&value) {
                candidates.push(Candidate { text: phrase, position });
                position += 1;
            }
        }
    }

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    let mut best: Option<(Keyword, usize)> = None;

    for candidate in candidates {
        let normalized = normalize(&candidate.text);
        for token in split_camel_case_if_needed(&normalized) {
            if !filters.iter().all(|f| f.retain(&token)) {
                continue;
            }
            if !seen.insert(token.clone()) {
                continue;
            }
            let Some(keyword) = Keyword::new(token) else { continue };

            let is_better = match &best {
                None => true,
                Some((current, current_pos)) => {
                    let len_cmp = keyword.as_str().chars().count().cmp(&current.as_str().chars().count());
                    match len_cmp {
                        std::cmp::Ordering::Greater => true,
                        std::cmp::Ordering::Equal => {
                            candidate.position < *current_pos
                                || (candidate.position == *current_pos
                                    && keyword.as_str() < current.as_str())
                        }
                        std::cmp::Ordering::Less => false,
                    }
                }
            };
            if is_better {
                best = Some((keyword.clone(), candidate.position));
            }
            keywords.push(keyword);
        }
    }

    ExtractionResult { keywords, primary: best.map(|(k, _)| k) }
}

#[must_use]
fn default_filter_chain() -> Vec<Box<dyn KeywordFilter>> {
    vec![Box::new(LengthFilter), Box::new(StopWordFilter)]
}

fn path_segments_without_extension(url: &Url) -> Vec<String> {
    let mut segments: Vec<String> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    if let Some(last) = segments.last_mut() {
        if let Some(dot) = last.rfind('.') {
            if dot > 0 {
                last.truncate(dot);
            }
        }
    }
    segments
}

/// Hyphenated-game-name-shaped detection (§4.8 step 3): ≥1 hyphen and ≥2
/// meaningful tokens (length > 1, or a recognized game-number token).
fn split_segment(segment: &str) -> Vec<String> {
    if is_hyphenated_game_name_shaped(segment) {
        return vec![segment.replace('-', " ")];
    }
    segment
        .split(['-', '_', '.', ' '])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_hyphenated_game_name_shaped(segment: &str) -> bool {
    if !segment.contains('-') {
        return false;
    }
    let meaningful = segment
        .split('-')
        .filter(|part| part.chars().count() > 1 || GAME_NUMBER_ALLOW_LIST.contains(&part.to_lowercase().as_str()))
        .count();
    meaningful >= 2
}

/// Lower-case; replace non-`[A-Za-z0-9\s\-_]` with spaces; collapse
/// whitespace; trim (§4.8 step 4).
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-' || c == '_' { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split camelCase/PascalCase tokens further (§4.8 step 6). A normalized
/// phrase may contain spaces from hyphen conversion; each space-separated
/// word is independently camel-split.
fn split_camel_case_if_needed(phrase: &str) -> Vec<String> {
    if phrase.contains(' ') {
        return vec![phrase.to_string()];
    }
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in phrase.chars() {
        if c.is_uppercase() && prev_lower {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }
        prev_lower = c.is_lowercase();
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    if words.len() <= 1 {
        vec![phrase.to_string()]
    } else {
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_game_name_emits_single_phrase() {
        let result = extract("https://example.com/games/action/super-mario-bros");
        assert_eq!(result.primary.as_ref().map(Keyword::as_str), Some("super mario bros"));
    }

    #[test]
    fn tetris_classic_url_matches_e1_scenario() {
        let result = extract("https://example.com/puzzle/tetris-classic");
        assert_eq!(result.primary.as_ref().map(Keyword::as_str), Some("tetris classic"));
    }

    #[test]
    fn strips_trailing_file_extension() {
        let result = extract("https://example.com/puzzle/tetris-classic.html");
        assert_eq!(result.primary.as_ref().map(Keyword::as_str), Some("tetris classic"));
    }

    #[test]
    fn filters_general_and_gaming_stop_words() {
        let result = extract("https://example.com/free/online/game/play");
        assert!(result.primary.is_none());
    }

    #[test]
    fn game_number_allow_list_survives_length_filter() {
        let result = extract("https://example.com/2048");
        assert!(result.keywords.iter().any(|k| k.as_str() == "2048"));
    }

    #[test]
    fn two_and_three_character_game_number_tokens_survive_standalone() {
        let result = extract("https://example.com/2d");
        assert!(result.keywords.iter().any(|k| k.as_str() == "2d"));

        let result = extract("https://example.com/3d");
        assert!(result.keywords.iter().any(|k| k.as_str() == "3d"));
    }

    #[test]
    fn extracts_from_query_parameters() {
        let result = extract("https://example.com/search?q=space+invaders");
        assert!(result.keywords.iter().any(|k| k.as_str().contains("space")));
    }

    #[test]
    fn determinism_independent_of_filter_iteration_order() {
        let chain_a: Vec<Box<dyn KeywordFilter>> = vec![Box::new(LengthFilter), Box::new(StopWordFilter)];
        let chain_b: Vec<Box<dyn KeywordFilter>> = vec![Box::new(StopWordFilter), Box::new(LengthFilter)];

        let a = extract_with_filters("https://example.com/puzzle/tetris-classic", &chain_a);
        let b = extract_with_filters("https://example.com/puzzle/tetris-classic", &chain_b);
        assert_eq!(a.primary.map(|k| k.as_str().to_string()), b.primary.map(|k| k.as_str().to_string()));
    }

    #[test]
    fn no_keywords_found_yields_no_primary() {
        let result = extract("https://example.com/");
        assert!(result.primary.is_none());
        assert!(result.keywords.is_empty());
    }

    #[test]
    fn splits_camel_case_segments() {
        let result = extract("https://example.com/SpaceInvaders");
        assert!(result.keywords.iter().any(|k| k.as_str() == "space") || result.keywords.iter().any(|k| k.as_str() == "invaders"));
    }
}
