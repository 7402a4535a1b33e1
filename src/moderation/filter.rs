//! Content filter with exact-word, normalized-substring and pattern passes.
//!
//! The three passes overlap on purpose. Exact words catch plain profanity,
//! the normalized pass catches spaced-out and look-alike spellings, and the
//! patterns catch partial spellings the word list does not enumerate.

use std::collections::HashSet;
use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::warn;

use super::normalize::{is_word_char, normalize};
use super::rules::{BLOCKED_PATTERNS, BLOCKED_WORDS};

static STANDARD: LazyLock<ContentFilter> =
    LazyLock::new(|| ContentFilter::new(BLOCKED_WORDS, BLOCKED_PATTERNS));

/// Classification result. There is no partial or warn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Allowed,
    Blocked,
}

/// Which pass caught a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// A whitespace token equals a blocked word once punctuation is stripped.
    ExactWord(String),
    /// A blocked word occurs inside the normalized text.
    NormalizedWord(String),
    /// A blocked pattern matched the raw or normalized text.
    Pattern(String),
}

/// Stateless classifier, safe to share across tasks.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    words: HashSet<String>,
    /// Blocked words with internal whitespace removed, for the substring pass.
    squashed_words: Vec<String>,
    patterns: Vec<CompiledPattern>,
}

/// A compiled regex pattern with its original string for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

impl ContentFilter {
    /// Build a filter from word and pattern lists.
    ///
    /// Invalid regex patterns are logged and skipped.
    pub fn new(words: &[&str], patterns: &[&str]) -> Self {
        let words: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let mut squashed_words: Vec<String> = words
            .iter()
            .map(|w| w.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|w| !w.is_empty())
            .collect();
        squashed_words.sort();

        Self {
            words,
            squashed_words,
            patterns: compile_patterns(patterns),
        }
    }

    /// The filter built from the fixed moderation lists.
    pub fn standard() -> &'static ContentFilter {
        &STANDARD
    }

    /// Classify a raw message body.
    pub fn classify(&self, text: &str) -> FilterDecision {
        if self.find_violation(text).is_some() {
            FilterDecision::Blocked
        } else {
            FilterDecision::Allowed
        }
    }

    /// Returns `true` if the text must not be relayed.
    pub fn is_blocked(&self, text: &str) -> bool {
        self.classify(text) == FilterDecision::Blocked
    }

    /// Run all three passes and report the first one that fires.
    pub fn find_violation(&self, text: &str) -> Option<BlockReason> {
        let lower = text.to_lowercase();
        for token in lower.split_whitespace() {
            let stripped: String = token.chars().filter(|&c| is_word_char(c)).collect();
            if self.words.contains(&stripped) {
                return Some(BlockReason::ExactWord(stripped));
            }
        }

        let normalized = normalize(text);
        if let Some(word) = self
            .squashed_words
            .iter()
            .find(|w| normalized.contains(w.as_str()))
        {
            return Some(BlockReason::NormalizedWord(word.clone()));
        }

        self.patterns
            .iter()
            .find(|p| p.matches(text) || p.matches(&normalized))
            .map(|p| BlockReason::Pattern(p.original.clone()))
    }
}

impl CompiledPattern {
    fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text).unwrap_or_else(|e| {
            warn!("Regex match error for pattern '{}': {}", self.original, e);
            false
        })
    }
}

/// Compile case-insensitive patterns, skipping invalid ones.
fn compile_patterns(patterns: &[&str]) -> Vec<CompiledPattern> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(&format!("(?i){}", pattern)) {
            Ok(regex) => Some(CompiledPattern {
                original: pattern.to_string(),
                regex,
            }),
            Err(e) => {
                warn!("Invalid filter regex pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> &'static ContentFilter {
        ContentFilter::standard()
    }

    #[test]
    fn test_all_standard_patterns_compile() {
        assert_eq!(filter().patterns.len(), BLOCKED_PATTERNS.len());
    }

    #[test]
    fn test_plain_blocked_words() {
        for text in ["fuck you", "this is shit", "kys", "nazi", "HITLER", "kkk rally"] {
            assert!(filter().is_blocked(text), "expected {:?} to be blocked", text);
        }
    }

    #[test]
    fn test_exact_word_ignores_punctuation() {
        assert_eq!(
            filter().find_violation("you are a retard!!!"),
            Some(BlockReason::ExactWord("retard".to_string()))
        );
        assert_eq!(
            filter().find_violation("\"hitler\""),
            Some(BlockReason::ExactWord("hitler".to_string()))
        );
    }

    #[test]
    fn test_leetspeak_caught_by_normalization() {
        assert!(matches!(
            filter().find_violation("n1gg3r"),
            Some(BlockReason::NormalizedWord(_))
        ));
        for text in ["$h!t", "5h1t happens", "f4g", "r3t4rd", "c*nt"] {
            assert!(filter().is_blocked(text), "expected {:?} to be blocked", text);
        }
    }

    #[test]
    fn test_separator_evasion() {
        for text in ["f.u.c.k", "f u c k off", "k-y-s", "s_h_i_t", "f*u*c*k"] {
            assert!(filter().is_blocked(text), "expected {:?} to be blocked", text);
        }
    }

    #[test]
    fn test_pattern_on_raw_text() {
        // Normalization turns the l's into i's, so only the raw text matches.
        assert_eq!(
            filter().find_violation("just kill   yourself"),
            Some(BlockReason::Pattern(r"k[i!1]ll[\s]*y[o0]urs[e3]lf".to_string()))
        );
        assert!(filter().is_blocked("BiTcH"));
    }

    #[test]
    fn test_decision_values() {
        assert_eq!(filter().classify("kys"), FilterDecision::Blocked);
        assert_eq!(filter().classify("hello world"), FilterDecision::Allowed);
    }

    #[test]
    fn test_known_safe_messages() {
        for text in [
            "hello world",
            "good morning everyone",
            "see you tomorrow",
            "what a lovely day",
            "classic assassin build",
            "",
        ] {
            assert!(!filter().is_blocked(text), "expected {:?} to be allowed", text);
        }
    }

    #[test]
    fn test_accepted_false_positives() {
        // Substring matching on normalized text trades precision for recall.
        assert!(filter().is_blocked("Scunthorpe"));
        assert!(filter().is_blocked("see you tonight"));
    }

    #[test]
    fn test_custom_lists() {
        let custom = ContentFilter::new(&["white power"], &["[invalid", "sp[a4]m"]);
        assert_eq!(custom.patterns.len(), 1);
        assert!(custom.is_blocked("WHITE-POWER"));
        assert!(custom.is_blocked("sp4m"));
        assert!(!custom.is_blocked("white paper"));
    }
}
