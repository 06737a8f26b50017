use regex::Regex;
use serde::Serialize;

use crate::Engine;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A run of the original text, either literal or covered by a merged
/// trigger-phrase match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub is_match: bool,
}

impl Segment {
    fn literal(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_match: false,
        }
    }

    fn matched(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_match: true,
        }
    }

    /// The segment's text with `&`, `<` and `>` replaced by entities.
    pub fn escaped(&self) -> String {
        escape_markup(&self.text)
    }
}

/// Byte range into the original text. Both ends are char boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

// ---------------------------------------------------------------------------
// Trigger compilation and scanning
// ---------------------------------------------------------------------------

/// Compile a category's trigger phrases, longest first, as case-insensitive
/// literal patterns.
pub(crate) fn compile_triggers(triggers: &[String]) -> Result<Vec<Regex>, regex::Error> {
    let mut sorted: Vec<&str> = triggers
        .iter()
        .map(String::as_str)
        .filter(|t| !t.is_empty())
        .collect();
    sorted.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
    sorted
        .into_iter()
        .map(|t| Regex::new(&format!("(?i){}", regex::escape(t))))
        .collect()
}

/// Every occurrence of every pattern, unmerged. After a hit the scan resumes
/// one character past the hit's start so overlapping repeats are kept.
pub(crate) fn find_spans(text: &str, patterns: &[Regex]) -> Vec<Span> {
    let mut spans = Vec::new();
    for re in patterns {
        let mut pos = 0;
        while let Some(m) = re.find_at(text, pos) {
            spans.push(Span {
                start: m.start(),
                end: m.end(),
            });
            pos = m.start() + char_len_at(text, m.start());
        }
    }
    spans
}

fn char_len_at(text: &str, pos: usize) -> usize {
    text[pos..].chars().next().map_or(1, char::len_utf8)
}

/// Sort by start and fold each span into its predecessor when it starts at
/// or before the predecessor's end.
pub(crate) fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_unstable();
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// Cut `text` at the merged spans. Concatenating the result yields `text`.
pub(crate) fn segment(text: &str, spans: &[Span]) -> Vec<Segment> {
    if spans.is_empty() {
        return vec![Segment::literal(text)];
    }
    let mut out = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;
    for span in spans {
        if span.start > cursor {
            out.push(Segment::literal(&text[cursor..span.start]));
        }
        out.push(Segment::matched(&text[span.start..span.end]));
        cursor = span.end;
    }
    if cursor < text.len() {
        out.push(Segment::literal(&text[cursor..]));
    }
    out
}

// ---------------------------------------------------------------------------
// Markup
// ---------------------------------------------------------------------------

pub fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Join segments into markup, wrapping matches in `<mark>`. Escaping is per
/// segment so it never moves a segment boundary.
pub fn to_markup(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        if seg.is_match {
            out.push_str("<mark class=\"tilt-hit\">");
            out.push_str(&seg.escaped());
            out.push_str("</mark>");
        } else {
            out.push_str(&seg.escaped());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Drill-down toggle
// ---------------------------------------------------------------------------

/// Which tilt category, if any, is currently expanded to show its source
/// spans. Local to one rendered instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrillDown {
    active: Option<String>,
}

impl DrillDown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Selecting the active tag closes it; any other tag replaces it.
    pub fn toggle(&mut self, tag: &str) {
        if self.active.as_deref() == Some(tag) {
            self.active = None;
        } else {
            self.active = Some(tag.to_string());
        }
    }

    pub fn segments(&self, engine: &Engine, text: &str) -> Option<Vec<Segment>> {
        self.active().map(|tag| engine.highlight(text, tag))
    }
}
