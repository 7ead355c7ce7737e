//! Line-oriented search over extracted text.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_MATCHES: usize = 50;

/// Cap on match ranges reported for one line.
const MAX_RANGES_PER_LINE: usize = 2000;

/// Pattern and context settings for [`grep_like`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrepOptions {
    pub pattern: String,
    /// Treat `pattern` as a regex rather than a literal.
    pub is_regex: bool,
    pub case_sensitive: bool,
    /// Lines of leading context; falls back to `context`.
    pub before: Option<usize>,
    /// Lines of trailing context; falls back to `context`.
    pub after: Option<usize>,
    pub context: usize,
    pub max_matches: usize,
}

impl Default for GrepOptions {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            is_regex: false,
            case_sensitive: false,
            before: None,
            after: None,
            context: 0,
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }
}

impl GrepOptions {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), ..Default::default() }
    }

    /// Compiles the pattern. Invalid regexes are reported, never panicked on.
    pub fn compile(&self) -> Result<Regex, regex::Error> {
        let source = if self.is_regex { self.pattern.clone() } else { regex::escape(&self.pattern) };
        RegexBuilder::new(&source).case_insensitive(!self.case_sensitive).build()
    }
}

/// Character offsets of one match within its line, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRange {
    pub start: usize,
    pub end: usize,
}

/// A matching line with its surrounding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrepMatch {
    /// 1-based.
    pub line_number: usize,
    pub line: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
    pub ranges: Vec<MatchRange>,
}

/// Finds lines of `text` matching `options.pattern`.
///
/// Stops after `max_matches` lines. A pattern that fails to compile yields
/// no matches.
pub fn grep_like(text: &str, options: &GrepOptions) -> Vec<GrepMatch> {
    let regex = match options.compile() {
        Ok(regex) => regex,
        Err(e) => {
            tracing::debug!(pattern = %options.pattern, error = %e, "grep pattern rejected");
            return Vec::new();
        }
    };

    let lines: Vec<&str> = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();
    let before = options.before.unwrap_or(options.context);
    let after = options.after.unwrap_or(options.context);

    let mut matches = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if matches.len() >= options.max_matches {
            break;
        }

        let ranges = char_ranges(&regex, line);
        if ranges.is_empty() {
            continue;
        }

        let first = idx.saturating_sub(before);
        let last = (idx + 1 + after).min(lines.len());
        matches.push(GrepMatch {
            line_number: idx + 1,
            line: (*line).to_string(),
            context_before: lines[first..idx].iter().map(|l| (*l).to_string()).collect(),
            context_after: lines[idx + 1..last].iter().map(|l| (*l).to_string()).collect(),
            ranges,
        });
    }
    matches
}

fn char_ranges(regex: &Regex, line: &str) -> Vec<MatchRange> {
    let mut byte_pos = 0;
    let mut char_pos = 0;

    regex
        .find_iter(line)
        .take(MAX_RANGES_PER_LINE)
        .map(|m| {
            char_pos += line[byte_pos..m.start()].chars().count();
            byte_pos = m.start();
            let start = char_pos;
            MatchRange { start, end: start + m.as_str().chars().count() }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "alpha\nbeta gamma\nGamma ray\ndelta\ngamma gamma";

    #[test]
    fn test_literal_case_insensitive_by_default() {
        let matches = grep_like(TEXT, &GrepOptions::new("gamma"));
        let numbers: Vec<usize> = matches.iter().map(|m| m.line_number).collect();
        assert_eq!(numbers, vec![2, 3, 5]);
        assert_eq!(matches[2].ranges, vec![MatchRange { start: 0, end: 5 }, MatchRange { start: 6, end: 11 }]);
    }

    #[test]
    fn test_case_sensitive() {
        let options = GrepOptions { case_sensitive: true, ..GrepOptions::new("Gamma") };
        let matches = grep_like(TEXT, &options);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line, "Gamma ray");
    }

    #[test]
    fn test_literal_escapes_metacharacters() {
        let matches = grep_like("a.c\nabc", &GrepOptions::new("a.c"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_number, 1);
    }

    #[test]
    fn test_regex_mode() {
        let options = GrepOptions { is_regex: true, ..GrepOptions::new(r"^d\w+") };
        let matches = grep_like(TEXT, &options);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line, "delta");
    }

    #[test]
    fn test_invalid_regex_yields_nothing() {
        let options = GrepOptions { is_regex: true, ..GrepOptions::new("(unclosed") };
        assert!(grep_like(TEXT, &options).is_empty());
    }

    #[test]
    fn test_context_is_clamped_to_bounds() {
        let options = GrepOptions { context: 2, ..GrepOptions::new("alpha") };
        let matches = grep_like(TEXT, &options);
        assert!(matches[0].context_before.is_empty());
        assert_eq!(matches[0].context_after, vec!["beta gamma", "Gamma ray"]);
    }

    #[test]
    fn test_before_and_after_override_context() {
        let options = GrepOptions { context: 3, before: Some(1), after: Some(0), ..GrepOptions::new("delta") };
        let matches = grep_like(TEXT, &options);
        assert_eq!(matches[0].context_before, vec!["Gamma ray"]);
        assert!(matches[0].context_after.is_empty());
    }

    #[test]
    fn test_max_matches() {
        let options = GrepOptions { max_matches: 2, ..GrepOptions::new("gamma") };
        assert_eq!(grep_like(TEXT, &options).len(), 2);
    }

    #[test]
    fn test_ranges_are_in_characters() {
        let matches = grep_like("héllo wörld", &GrepOptions::new("wörld"));
        assert_eq!(matches[0].ranges, vec![MatchRange { start: 6, end: 11 }]);
    }

    #[test]
    fn test_empty_pattern_terminates() {
        let matches = grep_like("ab\ncd", &GrepOptions::new(""));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].ranges.len(), 3);
    }

    #[test]
    fn test_crlf_lines() {
        let matches = grep_like("one\r\ntwo\r\n", &GrepOptions::new("two"));
        assert_eq!(matches[0].line, "two");
    }
}
