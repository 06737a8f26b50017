//! Output adapters for a [`PresentationModel`].
//!
//! None of these feed back into derivation; a host picks whichever suits it.

use std::fmt::Write as _;

use crate::highlight::{escape_markup, to_markup, Segment};
use crate::verdict::{CheckStatus, PresentationModel, Tone};

pub fn to_json(model: &PresentationModel) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(model)
}

fn tone_class(tone: Tone) -> &'static str {
    match tone {
        Tone::Green => "tone-green",
        Tone::Amber => "tone-amber",
        Tone::Red => "tone-red",
        Tone::Neutral => "tone-neutral",
    }
}

fn check_class(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "pass",
        CheckStatus::Fail => "fail",
        CheckStatus::Neutral => "neutral",
    }
}

fn check_mark(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "\u{2713}",
        CheckStatus::Fail => "\u{2717}",
        CheckStatus::Neutral => "\u{2013}",
    }
}

/// HTML fragment. `drill` is the highlighted source for the expanded tilt
/// row, if one is open.
pub fn to_html(model: &PresentationModel, drill: Option<(&str, &[Segment])>) -> String {
    let mut buf = String::new();

    let _ = write!(
        buf,
        "<section class=\"nti-verdict\"><p class=\"verdict {}\">{}</p>",
        tone_class(model.verdict_tone),
        escape_markup(&model.verdict_text)
    );

    buf.push_str("<ul class=\"checks\">");
    for check in &model.structural_checks {
        let _ = write!(
            buf,
            "<li class=\"check {}\">{} {}</li>",
            check_class(check.status),
            check_mark(check.status),
            escape_markup(check.label)
        );
    }
    buf.push_str("</ul>");

    buf.push_str("<table class=\"metrics\">");
    for m in &model.metrics {
        let _ = write!(
            buf,
            "<tr class=\"{}\"><th>{}</th><td>{}</td><td>{}</td></tr>",
            tone_class(m.tone),
            escape_markup(m.label),
            escape_markup(&m.value),
            escape_markup(&m.detail)
        );
    }
    buf.push_str("</table>");

    buf.push_str("<table class=\"failure-modes\">");
    for row in &model.failure_mode_rows {
        let _ = write!(
            buf,
            "<tr class=\"{}\"><th>{}</th><td>{}</td><td>{}</td></tr>",
            tone_class(row.tone),
            row.code,
            escape_markup(row.name),
            row.label
        );
    }
    buf.push_str("</table>");

    buf.push_str("<ul class=\"tilts\">");
    if model.tilt_rows.is_empty() {
        buf.push_str("<li class=\"tilt none\">None detected</li>");
    }
    for row in &model.tilt_rows {
        let _ = write!(
            buf,
            "<li class=\"tilt\" data-tag=\"{}\"><strong>{}</strong> {}",
            escape_markup(&row.tag),
            escape_markup(&row.label),
            escape_markup(&row.description)
        );
        if let Some((tag, segments)) = drill {
            if tag == row.tag {
                let _ = write!(
                    buf,
                    "<blockquote class=\"source\">{}</blockquote>",
                    to_markup(segments)
                );
            }
        }
        buf.push_str("</li>");
    }
    buf.push_str("</ul>");

    if let Some(text) = &model.dominant_pattern_text {
        let _ = write!(buf, "<p class=\"dominant\">{}</p>", escape_markup(text));
    }

    let _ = write!(
        buf,
        "<footer><span class=\"score {}\">{}</span> <span class=\"meta\">{} &middot; {} &middot; {}</span></footer></section>",
        tone_class(model.footer_score.tone),
        escape_markup(&model.footer_score.display),
        escape_markup(&model.footer_meta.latency),
        escape_markup(&model.footer_meta.word_count),
        escape_markup(&model.footer_meta.version)
    );
    buf
}

/// Plain-text rendering for terminals. Matches in `drill` are bracketed.
pub fn to_text(model: &PresentationModel, drill: Option<(&str, &[Segment])>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", model.verdict_text);
    let _ = writeln!(out);

    let _ = writeln!(out, "Checks");
    for check in &model.structural_checks {
        let _ = writeln!(out, "  {} {}", check_mark(check.status), check.label);
    }

    let _ = writeln!(out, "Metrics");
    for m in &model.metrics {
        if m.detail.is_empty() {
            let _ = writeln!(out, "  {:<24} {}", m.label, m.value);
        } else {
            let _ = writeln!(out, "  {:<24} {}  [{}]", m.label, m.value, m.detail);
        }
    }

    let _ = writeln!(out, "Failure modes");
    for row in &model.failure_mode_rows {
        let _ = writeln!(out, "  {:<5} {:<28} {}", row.code, row.name, row.label);
    }

    let _ = writeln!(out, "Tilts");
    if model.tilt_rows.is_empty() {
        let _ = writeln!(out, "  None detected");
    }
    for row in &model.tilt_rows {
        let _ = writeln!(out, "  {:<26} {}", row.label, row.description);
        if let Some((tag, segments)) = drill {
            if tag == row.tag {
                let _ = writeln!(out, "    > {}", bracketed(segments));
            }
        }
    }

    if let Some(text) = &model.dominant_pattern_text {
        let _ = writeln!(out, "{text}");
    }

    let _ = write!(
        out,
        "Score {} | {} | {} | {}",
        model.footer_score.display,
        model.footer_meta.latency,
        model.footer_meta.word_count,
        model.footer_meta.version
    );
    out
}

/// Segments joined with `[` `]` around each match.
pub fn bracketed(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| {
            if s.is_match {
                format!("[{}]", s.text)
            } else {
                s.text.clone()
            }
        })
        .collect()
}
