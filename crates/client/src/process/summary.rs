//! Extractive summaries.

use webstash_core::text::truncate_chars;

const TERMINATORS: &[char] = &['.', '!', '?', '\u{3002}', '\u{ff01}', '\u{ff1f}'];

/// Fragments with fewer non-whitespace characters are not sentences.
const MIN_SENTENCE_CHARS: usize = 3;

/// Joins the first `max_sentences` sentences of `text`, capped at `max_chars`.
///
/// Sentences end at `.`, `!`, `?` (and their full-width forms) or a line
/// break. Output past `max_chars` is cut and ends in `...`.
pub fn summarize(text: &str, max_sentences: usize, max_chars: usize) -> String {
    let joined = sentences(text)
        .filter(|s| s.chars().filter(|c| !c.is_whitespace()).count() >= MIN_SENTENCE_CHARS)
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(" ");

    truncate_chars(&joined, max_chars)
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    let mut start = 0;
    let mut cuts = Vec::new();

    for (idx, c) in text.char_indices() {
        if c == '\n' {
            cuts.push(&text[start..idx]);
            start = idx + 1;
        } else if TERMINATORS.contains(&c) {
            let end = idx + c.len_utf8();
            cuts.push(&text[start..end]);
            start = end;
        }
    }
    cuts.push(&text[start..]);

    cuts.into_iter().map(str::trim).filter(|s| !s.is_empty())
}
