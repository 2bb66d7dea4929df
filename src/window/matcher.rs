//! Resolves a title pattern to one window out of an enumeration snapshot.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fuzzy;
use super::types::WindowDescriptor;

/// Minimum fuzzy score accepted when none is configured.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Case-insensitive regex search; first window in enumeration order wins.
    Regex,
    /// Best partial-ratio score, rejected below `threshold` (0-100).
    Fuzzy { threshold: u8 },
}

impl Default for MatchMode {
    fn default() -> Self {
        MatchMode::Fuzzy {
            threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchQuery {
    pub pattern: String,
    pub mode: MatchMode,
}

impl MatchQuery {
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MatchMode::Regex,
        }
    }

    pub fn fuzzy(pattern: impl Into<String>, threshold: u8) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MatchMode::Fuzzy {
                threshold: threshold.min(100),
            },
        }
    }
}

/// Finds the window matching `query` among `windows`.
///
/// Returns `None` for an empty pattern, a regex with no match (or one that
/// does not compile), or a best fuzzy score below the threshold. Ties on the
/// fuzzy score go to the window enumerated first.
pub fn find_matching_window(
    query: &MatchQuery,
    windows: &[WindowDescriptor],
) -> Option<WindowDescriptor> {
    if query.pattern.is_empty() {
        debug!("No title pattern provided");
        return None;
    }

    match query.mode {
        MatchMode::Regex => find_by_regex(&query.pattern, windows),
        MatchMode::Fuzzy { threshold } => find_by_fuzzy(&query.pattern, threshold, windows),
    }
}

fn find_by_regex(pattern: &str, windows: &[WindowDescriptor]) -> Option<WindowDescriptor> {
    let re = match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            warn!("Invalid title regex '{}': {}", pattern, e);
            return None;
        }
    };

    let found = windows.iter().find(|w| re.is_match(&w.title)).cloned();
    if let Some(w) = &found {
        info!("Regex match found: \"{}\"", w.title);
    }
    found
}

fn find_by_fuzzy(
    pattern: &str,
    threshold: u8,
    windows: &[WindowDescriptor],
) -> Option<WindowDescriptor> {
    let processed_pattern = fuzzy::full_process(pattern);
    if processed_pattern.is_empty() {
        warn!("Title pattern '{}' has no letters or digits to match", pattern);
        return None;
    }

    let mut best: Option<(&WindowDescriptor, u8)> = None;
    for w in windows {
        let score = fuzzy::partial_ratio(&processed_pattern, &fuzzy::full_process(&w.title));
        // Strictly greater keeps the first window on ties
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((w, score));
        }
    }

    let (w, score) = best?;
    info!("Best fuzzy match: \"{}\" with score {}", w.title, score);

    if score >= threshold {
        Some(w.clone())
    } else {
        debug!("Best score {} is below threshold {}", score, threshold);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::window;

    fn sample_windows() -> Vec<WindowDescriptor> {
        vec![
            window(1, "Notepad", 0, 0, 800, 600),
            window(2, "Google Chrome - Tab 1", 100, 50, 1280, 720),
            window(3, "Calculator", 300, 300, 320, 480),
        ]
    }

    #[test]
    fn test_fuzzy_matches_chrome() {
        let found = find_matching_window(&MatchQuery::fuzzy("chrome", 60), &sample_windows());
        assert_eq!(found.unwrap().title, "Google Chrome - Tab 1");
    }

    #[test]
    fn test_fuzzy_below_threshold_returns_none() {
        let found = find_matching_window(&MatchQuery::fuzzy("zzz", 60), &sample_windows());
        assert!(found.is_none());
    }

    #[test]
    fn test_fuzzy_threshold_zero_accepts_best_candidate() {
        let found = find_matching_window(&MatchQuery::fuzzy("zzz", 0), &sample_windows());
        // All score 0, first enumerated wins
        assert_eq!(found.unwrap().handle.0, 1);
    }

    #[test]
    fn test_fuzzy_tie_goes_to_first_enumerated() {
        let windows = vec![
            window(10, "Terminal - build", 0, 0, 10, 10),
            window(11, "Terminal - tests", 0, 0, 10, 10),
        ];
        let found = find_matching_window(&MatchQuery::fuzzy("terminal", 60), &windows);
        assert_eq!(found.unwrap().handle.0, 10);
    }

    #[test]
    fn test_fuzzy_picks_global_maximum() {
        let windows = vec![
            window(1, "Visual Studio", 0, 0, 10, 10),
            window(2, "Visual Studio Code", 0, 0, 10, 10),
        ];
        // "studio code" only fully aligns with the second title
        let found = find_matching_window(&MatchQuery::fuzzy("studio code", 60), &windows);
        assert_eq!(found.unwrap().handle.0, 2);
    }

    #[test]
    fn test_regex_first_match_wins() {
        let windows = vec![
            window(1, "Notepad", 0, 0, 10, 10),
            window(2, "Untitled - Notepad", 0, 0, 10, 10),
        ];
        let found = find_matching_window(&MatchQuery::regex("notepad$"), &windows);
        assert_eq!(found.unwrap().handle.0, 1);
    }

    #[test]
    fn test_regex_is_search_not_full_match() {
        let found = find_matching_window(&MatchQuery::regex("chrome"), &sample_windows());
        assert_eq!(found.unwrap().handle.0, 2);
    }

    #[test]
    fn test_regex_no_match_returns_none() {
        assert!(find_matching_window(&MatchQuery::regex("^firefox"), &sample_windows()).is_none());
    }

    #[test]
    fn test_invalid_regex_returns_none() {
        assert!(find_matching_window(&MatchQuery::regex("(unclosed"), &sample_windows()).is_none());
    }

    #[test]
    fn test_empty_pattern_returns_none() {
        assert!(find_matching_window(&MatchQuery::fuzzy("", 0), &sample_windows()).is_none());
        assert!(find_matching_window(&MatchQuery::regex(""), &sample_windows()).is_none());
    }

    #[test]
    fn test_empty_window_list() {
        assert!(find_matching_window(&MatchQuery::fuzzy("chrome", 60), &[]).is_none());
    }
}
