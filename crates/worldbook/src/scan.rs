//! Scan text construction and keyword matching.
//!
//! A `ScanBuffer` joins the current message with a bounded window of recent
//! history (plus, in recursive rounds, previously activated content) and
//! matches entry keywords against it. Keywords are plain substrings or
//! `/pattern/`-style regexes; a malformed regex is logged and treated as
//! "no match" for that keyword only — it never aborts the scan.

use loreweave_core::worldbook::{SelectiveLogic, WorldBookEntry};
use regex_lite::Regex;
use tracing::warn;

/// Scan text windows for one scan round.
pub struct ScanBuffer {
    current: String,
    /// Most-recent-first history contents.
    history: Vec<String>,
    /// Activated content fed back in by the recursion loop.
    recursion_feed: Vec<String>,
    default_depth: usize,
    raw_default: String,
    lower_default: String,
}

impl ScanBuffer {
    /// Buffer for a non-recursive scan over `depth` history entries.
    pub fn new(current_message: &str, history: &[String], depth: usize) -> Self {
        Self::with_feed(current_message, history, depth, Vec::new())
    }

    /// Buffer for one recursion round: history window plus the contents of
    /// prior-round activations.
    pub fn with_feed(
        current_message: &str,
        history: &[String],
        depth: usize,
        recursion_feed: Vec<String>,
    ) -> Self {
        let current = current_message.to_string();
        let history: Vec<String> = history.to_vec();
        let raw_default = join_window(&current, &history, depth, &recursion_feed);
        let lower_default = raw_default.to_lowercase();
        Self {
            current,
            history,
            recursion_feed,
            default_depth: depth,
            raw_default,
            lower_default,
        }
    }

    /// Count primary-keyword occurrences for an entry, applying its
    /// selective logic over the secondary keywords. Returns 0 when the entry
    /// does not activate.
    pub fn match_count(&self, entry: &WorldBookEntry) -> u32 {
        let (raw, lower);
        let (raw_text, lower_text) = match entry.scan_depth {
            Some(depth) if depth != self.default_depth => {
                raw = join_window(&self.current, &self.history, depth, &self.recursion_feed);
                lower = raw.to_lowercase();
                (raw.as_str(), lower.as_str())
            }
            _ => (self.raw_default.as_str(), self.lower_default.as_str()),
        };

        let primary: u32 = entry
            .keywords
            .iter()
            .map(|k| {
                keyword_matches(
                    raw_text,
                    lower_text,
                    k,
                    entry.case_sensitive,
                    entry.match_whole_words,
                )
            })
            .sum();
        if primary == 0 {
            return 0;
        }
        if entry.secondary_keywords.is_empty() {
            return primary;
        }

        let hits: Vec<bool> = entry
            .secondary_keywords
            .iter()
            .map(|k| {
                keyword_matches(
                    raw_text,
                    lower_text,
                    k,
                    entry.case_sensitive,
                    entry.match_whole_words,
                ) > 0
            })
            .collect();
        let any = hits.iter().any(|&h| h);
        let all = hits.iter().all(|&h| h);

        let pass = match entry.selective_logic {
            SelectiveLogic::AndAny => any,
            SelectiveLogic::AndAll => all,
            SelectiveLogic::NotAny => !any,
            SelectiveLogic::NotAll => !all,
        };
        if pass { primary } else { 0 }
    }
}

fn join_window(current: &str, history: &[String], depth: usize, feed: &[String]) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(1 + depth + feed.len());
    if !current.is_empty() {
        parts.push(current);
    }
    parts.extend(history.iter().take(depth).map(String::as_str));
    parts.extend(feed.iter().map(String::as_str));
    parts.join("\n")
}

/// Count non-overlapping occurrences of one keyword.
fn keyword_matches(
    raw: &str,
    lower: &str,
    keyword: &str,
    case_sensitive: bool,
    whole_words: bool,
) -> u32 {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return 0;
    }

    if let Some(pattern) = regex_pattern(keyword, case_sensitive) {
        return match Regex::new(&pattern) {
            Ok(re) => re.find_iter(raw).count() as u32,
            Err(err) => {
                warn!(keyword, %err, "malformed world-book keyword regex, treating as no match");
                0
            }
        };
    }

    let (haystack, needle) = if case_sensitive {
        (raw, keyword.to_string())
    } else {
        (lower, keyword.to_lowercase())
    };

    haystack
        .match_indices(&needle)
        .filter(|(start, matched)| {
            !whole_words || is_word_bounded(haystack, *start, matched.len())
        })
        .count() as u32
}

/// Extract the pattern from a `/pattern/` or `/pattern/i` keyword.
fn regex_pattern(keyword: &str, case_sensitive: bool) -> Option<String> {
    let body = keyword.strip_prefix('/')?;
    let (body, insensitive_flag) = if let Some(b) = body.strip_suffix("/i") {
        (b, true)
    } else {
        (body.strip_suffix('/')?, false)
    };
    if body.is_empty() {
        return None;
    }
    if insensitive_flag || !case_sensitive {
        Some(format!("(?i){body}"))
    } else {
        Some(body.to_string())
    }
}

fn is_word_bounded(haystack: &str, start: usize, len: usize) -> bool {
    let before_ok = haystack[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = haystack[start + len..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric());
    before_ok && after_ok
}
