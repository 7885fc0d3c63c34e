//! Lazy fuzzy matching and relevance scoring.
//!
//! A query such as `usse` becomes the pattern `u[^u]*?s[^s]*?s[^s]*?e`. A
//! candidate matches when the *shortest* occurrence of that pattern has
//! no gap before the second or the last query character and no two
//! neighbouring gaps that are both non-empty. In other words the query
//! characters must cluster into runs of at least two.
//!
//! Scores are `query_len - shortest_match_len`, so a fully consecutive
//! match scores 0 and looser matches go negative.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{QuarryError, QuarryResult};

/// How one query segment is compared with a candidate name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Fuzzy = 0,
    Exact = 1,
    Prefix = 2,
    Suffix = 3,
}

/// Split `^`/`$` anchors off a query segment.
pub fn parse_match_type(segment: &str) -> (MatchType, &str) {
    if segment.len() >= 2 && segment.starts_with('^') && segment.ends_with('$') {
        (MatchType::Exact, &segment[1..segment.len() - 1])
    } else if let Some(rest) = segment.strip_prefix('^') {
        (MatchType::Prefix, rest)
    } else if let Some(rest) = segment.strip_suffix('$') {
        (MatchType::Suffix, rest)
    } else {
        (MatchType::Fuzzy, segment)
    }
}

fn escape_char(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}

/// `c0[^c0]*?c1[^c1]*?...cN`, optionally capturing each gap.
fn lazy_pattern(query: &str, capture_gaps: bool) -> String {
    let chars: Vec<char> = query.chars().collect();
    let Some((last, head)) = chars.split_last() else {
        return String::new();
    };
    let mut pattern = String::new();
    for &c in head {
        let escaped = escape_char(c);
        pattern.push_str(&escaped);
        if capture_gaps {
            pattern.push_str(&format!("([^{escaped}]*?)"));
        } else {
            pattern.push_str(&format!("[^{escaped}]*?"));
        }
    }
    pattern.push_str(&escape_char(*last));
    pattern
}

fn compile(pattern: &str) -> QuarryResult<Regex> {
    Regex::new(pattern).map_err(|e| QuarryError::Query(format!("bad query pattern: {e}")))
}

/// Shortest non-overlapping match of `re` in `text`.
fn shortest_match<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.find_iter(text)
        .map(|m| m.as_str())
        .min_by_key(|m| m.len())
}

// ---------------------------------------------------------------------------
// Lazy matcher
// ---------------------------------------------------------------------------

/// A compiled lazy-match query. Build once per query, test many candidates.
#[derive(Clone, Debug)]
pub struct LazyMatcher {
    len: usize,
    plain: Option<Regex>,
    gaps: Option<Regex>,
}

impl LazyMatcher {
    pub fn new(query: &str) -> QuarryResult<Self> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Ok(Self {
                len: 0,
                plain: None,
                gaps: None,
            });
        }
        Ok(Self {
            len: query.chars().count(),
            plain: Some(compile(&lazy_pattern(&query, false))?),
            gaps: Some(compile(&lazy_pattern(&query, true))?),
        })
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        let (Some(plain), Some(gaps)) = (&self.plain, &self.gaps) else {
            return true;
        };
        let candidate = candidate.to_lowercase();
        if self.len > candidate.chars().count() {
            return false;
        }
        let Some(shortest) = shortest_match(plain, &candidate) else {
            return false;
        };

        let mut sizes: Vec<usize> = Vec::new();
        for caps in gaps.captures_iter(shortest) {
            for group in caps.iter().skip(1) {
                let gap = group.map_or("", |m| m.as_str());
                sizes.push(if gap == "." { 0 } else { gap.chars().count() });
            }
        }

        if sizes.first().is_some_and(|&g| g > 0) || sizes.last().is_some_and(|&g| g > 0) {
            return false;
        }
        !sizes.windows(2).skip(1).any(|pair| pair[0] > 0 && pair[1] > 0)
    }
}

/// Scores candidates against one query.
#[derive(Clone, Debug)]
pub struct ScorePattern {
    len: usize,
    re: Option<Regex>,
}

impl ScorePattern {
    pub fn new(query: &str) -> QuarryResult<Self> {
        let query = query.to_lowercase();
        let re = if query.is_empty() {
            None
        } else {
            Some(compile(&lazy_pattern(&query, false))?)
        };
        Ok(Self {
            len: query.chars().count(),
            re,
        })
    }

    /// `None` when the candidate does not contain the query lazily.
    pub fn score(&self, candidate: &str) -> Option<i64> {
        let re = self.re.as_ref()?;
        let candidate = candidate.to_lowercase();
        if self.len > candidate.chars().count() {
            return None;
        }
        let shortest = shortest_match(re, &candidate)?;
        Some(self.len as i64 - shortest.chars().count() as i64)
    }
}

// ---------------------------------------------------------------------------
// Segment matcher
// ---------------------------------------------------------------------------

/// One parsed query segment with its match type.
#[derive(Clone, Debug)]
pub struct SegmentMatcher {
    match_type: MatchType,
    needle: String,
    lazy: Option<LazyMatcher>,
}

impl SegmentMatcher {
    pub fn new(needle: &str, match_type: MatchType) -> QuarryResult<Self> {
        let needle = needle.to_lowercase();
        let lazy = match match_type {
            MatchType::Fuzzy => Some(LazyMatcher::new(&needle)?),
            _ => None,
        };
        Ok(Self {
            match_type,
            needle,
            lazy,
        })
    }

    /// Parse anchors from a raw segment, then compile.
    pub fn parse(segment: &str) -> QuarryResult<Self> {
        let (match_type, needle) = parse_match_type(segment);
        Self::new(needle, match_type)
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match (&self.lazy, self.match_type) {
            (Some(lazy), _) => lazy.is_match(candidate),
            (None, MatchType::Exact) => candidate.to_lowercase() == self.needle,
            (None, MatchType::Prefix) => candidate.to_lowercase().starts_with(&self.needle),
            (None, MatchType::Suffix) => candidate.to_lowercase().ends_with(&self.needle),
            (None, MatchType::Fuzzy) => true,
        }
    }
}

/// One-shot lazy match, compiling the query on every call.
pub fn is_lazy_match(candidate: &str, query: &str) -> bool {
    LazyMatcher::new(query).is_ok_and(|m| m.is_match(candidate))
}

/// One-shot score, compiling the query on every call.
pub fn match_score(candidate: &str, query: &str) -> Option<i64> {
    ScorePattern::new(query).ok()?.score(candidate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_substring_matches() {
        for (target, query) in [
            ("UserService", "user"),
            ("UserService", "vice"),
            ("renderTable", "table"),
            ("a.b.js", "b.js"),
            ("anything", ""),
        ] {
            assert!(is_lazy_match(target, query), "{query} in {target}");
        }
    }

    #[test]
    fn test_isolated_characters_do_not_match() {
        assert!(!is_lazy_match("axxbxxcxxd", "abcd"));
        assert!(!is_lazy_match("a__b", "ab"));
    }

    #[test]
    fn test_runs_of_two_match() {
        assert!(is_lazy_match("UserService", "usse"));
        assert!(is_lazy_match("UserSession", "usse"));
        assert!(is_lazy_match("getLayerNames", "getla"));
        // neighbouring non-empty gaps
        assert!(!is_lazy_match("abxcxde", "abcde"));
        // trailing gap
        assert!(!is_lazy_match("abxc", "abc"));
    }

    #[test]
    fn test_query_longer_than_target() {
        assert!(!is_lazy_match("ab", "abc"));
        assert_eq!(match_score("ab", "abc"), None);
    }

    #[test]
    fn test_punctuation_is_literal() {
        assert!(is_lazy_match("foo(bar", "o(b"));
        assert!(!is_lazy_match("fooxbar", "o.b"));
    }

    #[test]
    fn test_angle_brackets_match_literally() {
        assert!(is_lazy_match("a<b", "a<b"));
        assert!(is_lazy_match("x>y", "x>y"));
        assert!(is_lazy_match("Map<string>", "p<s"));
        assert_eq!(match_score("a<b", "a<b"), Some(0));
        assert!(LazyMatcher::new("=>").is_ok());
        assert!(SegmentMatcher::parse("List<T>").is_ok_and(|m| m.matches("list<t>")));
    }

    #[test]
    fn test_scores() {
        assert_eq!(match_score("UserService", "user"), Some(0));
        assert_eq!(match_score("UserService", "usse"), Some(-2));
        assert_eq!(match_score("UserSession", "usse"), Some(-2));
        assert_eq!(match_score("Other", "usse"), None);
    }

    #[test]
    fn test_match_types() {
        let exact = SegmentMatcher::parse("^foo$").unwrap();
        assert!(exact.matches("FOO"));
        assert!(!exact.matches("foobar"));

        let prefix = SegmentMatcher::parse("^foo").unwrap();
        assert!(prefix.matches("FooBar"));
        assert!(!prefix.matches("barfoo"));

        let suffix = SegmentMatcher::parse("foo$").unwrap();
        assert!(suffix.matches("barFoo"));
        assert!(!suffix.matches("foobar"));

        assert_eq!(parse_match_type("^$"), (MatchType::Exact, ""));
        assert_eq!(parse_match_type("^"), (MatchType::Prefix, ""));
    }
}
