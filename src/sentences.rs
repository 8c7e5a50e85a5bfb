/*!
 * Sentence segmentation for narration scripts.
 *
 * A sentence is a run of non-terminator characters followed by zero or more
 * terminators (`.`, `!`, `?`), so `"Wait!?"` stays one sentence. Segmentation
 * is lossless: the raw slices of the returned sentences concatenate back to
 * the input. Runs that have nothing to speak (leading terminators, trailing
 * whitespace, a stray `...`) are folded into the neighboring sentence.
 */

use once_cell::sync::Lazy;
use regex::Regex;

// @const: Run of non-terminators plus its trailing terminators
static SENTENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+[.!?]*").unwrap());

/// One sentence of a script, with its byte span in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Zero-based position in the script
    pub index: usize,
    /// Byte offset where the raw slice starts
    pub start: usize,
    /// Byte offset where the raw slice ends (exclusive)
    pub end: usize,
    raw: String,
}

impl Sentence {
    /// Exact slice of the script, surrounding whitespace included
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Trimmed text used for speaking, display and subtitles
    pub fn text(&self) -> &str {
        self.raw.trim()
    }
}

fn is_speakable(run: &str) -> bool {
    run.chars().any(char::is_alphanumeric)
}

/// Split `text` into sentences in order of appearance
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut pending_start: Option<usize> = None;

    for m in SENTENCE_REGEX.find_iter(text) {
        if is_speakable(m.as_str()) {
            spans.push((pending_start.take().unwrap_or(m.start()), m.end()));
        } else if let Some(last) = spans.last_mut() {
            last.1 = m.end();
        } else {
            pending_start.get_or_insert(m.start());
        }
    }

    // Leading terminators are never matched by the regex
    if let Some(first) = spans.first_mut() {
        first.0 = 0;
    }

    if spans.is_empty() && !text.trim().is_empty() {
        spans.push((0, text.len()));
    }

    spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| Sentence {
            index,
            start,
            end,
            raw: text[start..end].to_string(),
        })
        .collect()
}
