use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::result::ScoredResult;
use crate::tables::{Lexicons, ScoreBands, Tables};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Green,
    Amber,
    Red,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSeverity {
    Clean,
    Warning,
    Critical,
}

impl VerdictSeverity {
    pub fn tone(self) -> Tone {
        match self {
            Self::Clean => Tone::Green,
            Self::Warning => Tone::Amber,
            Self::Critical => Tone::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FailureModeState {
    Detected,
    Probable,
    Clear,
}

impl FailureModeState {
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Clear)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Detected => "DETECTED",
            Self::Probable => "PROBABLE",
            Self::Clear => "CLEAR",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            Self::Detected => Tone::Red,
            Self::Probable => Tone::Amber,
            Self::Clear => Tone::Green,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrichment {
    pub vague_count: usize,
    pub specific_count: usize,
    pub vague_matches: Vec<String>,
    pub specific_matches: Vec<String>,
    pub emotional_charge: u32,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralCheck {
    pub key: &'static str,
    pub label: &'static str,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
    pub tone: Tone,
    /// The items behind the value, or "None detected".
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureModeRow {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub state: FailureModeState,
    pub label: &'static str,
    pub tone: Tone,
    pub active: bool,
    /// State string as the scorer sent it; empty when the code was absent.
    pub raw_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiltRow {
    pub tag: String,
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// False when the tag fell back to a humanized label.
    pub known: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterScore {
    /// Score in percent points, rounded to an integer.
    pub value: f64,
    pub display: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterMeta {
    pub latency: String,
    pub word_count: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationModel {
    pub verdict_text: String,
    pub verdict_severity: VerdictSeverity,
    pub verdict_tone: Tone,
    pub issue_count: usize,
    pub active_failure_modes: usize,
    pub structural_checks: Vec<StructuralCheck>,
    pub metrics: Vec<Metric>,
    pub failure_mode_rows: Vec<FailureModeRow>,
    pub tilt_rows: Vec<TiltRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_pattern_text: Option<String>,
    pub footer_score: FooterScore,
    pub footer_meta: FooterMeta,
    pub enrichment: Enrichment,
}

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

struct Hyperparameters {
    critical_failure_modes_min: usize,
    critical_issue_min: usize,
    emotional_high_weight: f64,
    emotional_moderate_weight: f64,
    emotional_words_basis: f64,
    emotional_amber_min: u32,
    emotional_red_min: u32,
    vague_amber_min: usize,
    vague_red_min: usize,
    specific_green_min: usize,
    marker_amber_min: usize,
    marker_red_min: usize,
    detail_items_max: usize,
}

static HP: Hyperparameters = Hyperparameters {
    critical_failure_modes_min: 2,
    critical_issue_min: 6,
    emotional_high_weight: 3.0,
    emotional_moderate_weight: 1.5,
    emotional_words_basis: 800.0,
    emotional_amber_min: 30,
    emotional_red_min: 60,
    vague_amber_min: 2,
    vague_red_min: 5,
    specific_green_min: 2,
    marker_amber_min: 1,
    marker_red_min: 3,
    detail_items_max: 5,
};

/// The three failure-mode codes in display order, with name and description.
pub const FAILURE_MODES: [(&str, &str, &str); 3] = [
    (
        "UDDS",
        "Narrative substitution",
        "Narrative stands in where constraints should be.",
    ),
    (
        "DCE",
        "Deferred constraints",
        "Constraints are pushed to later instead of stated now.",
    ),
    (
        "CCA",
        "Capability over constraint",
        "Capability is claimed without the limits that bound it.",
    ),
];

const NONE_DETECTED: &str = "None detected";

const CLEAN_VERDICT: &str =
    "No structural issues detected. Constraints are explicit and no failure modes are active.";

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Distinct lexicon entries that occur anywhere in `lower`, in lexicon order.
/// Plain substring containment: "impact" counts inside "impactful".
fn contained(lower: &str, lexicon: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    lexicon
        .iter()
        .filter(|w| !w.is_empty() && lower.contains(w.as_str()))
        .filter(|w| seen.insert(*w))
        .cloned()
        .collect()
}

pub fn enrich(text: &str, lexicons: &Lexicons) -> Enrichment {
    let lower = text.to_lowercase();
    let word_count = lower.split_whitespace().count().max(1);

    let vague_matches = contained(&lower, &lexicons.vague);
    let specific_matches = contained(&lower, &lexicons.specific);
    let high = contained(&lower, &lexicons.emotional_high).len() as f64;
    let moderate = contained(&lower, &lexicons.emotional_moderate).len() as f64;

    let weighted = high * HP.emotional_high_weight + moderate * HP.emotional_moderate_weight;
    let charge = (weighted * HP.emotional_words_basis / word_count as f64).clamp(0.0, 100.0);

    Enrichment {
        vague_count: vague_matches.len(),
        specific_count: specific_matches.len(),
        vague_matches,
        specific_matches,
        emotional_charge: charge.round() as u32,
        word_count,
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Containment, not equality: compound states such as `UDDS_CONFIRMED_V2`
/// classify the same as `UDDS_CONFIRMED`. `None` means the code was absent.
pub fn classify_failure_mode(state: Option<&str>) -> FailureModeState {
    match state {
        Some(s) if s.contains("CONFIRMED") => FailureModeState::Detected,
        Some(s) if s.contains("PROBABLE") => FailureModeState::Probable,
        _ => FailureModeState::Clear,
    }
}

pub fn issue_count(result: &ScoredResult) -> usize {
    let failed_checks = [
        result.q1_constraints_explicit,
        result.q2_constraints_before_capability,
        result.q3_substitutes_after_enforcement,
    ]
    .iter()
    .filter(|passed| !**passed)
    .count();

    failed_checks
        + result.hedge_markers.len()
        + result.reassurance_markers.len()
        + result.tilt_taxonomy.len()
}

pub fn classify_verdict(issues: usize, active_failure_modes: usize) -> VerdictSeverity {
    if issues == 0 && active_failure_modes == 0 {
        VerdictSeverity::Clean
    } else if active_failure_modes >= HP.critical_failure_modes_min
        || issues >= HP.critical_issue_min
    {
        VerdictSeverity::Critical
    } else {
        VerdictSeverity::Warning
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

pub fn verdict_text(severity: VerdictSeverity, issues: usize, active: usize) -> String {
    let issues = plural(issues, "structural issue");
    let modes = plural(active, "failure mode");
    match severity {
        VerdictSeverity::Clean => CLEAN_VERDICT.to_string(),
        VerdictSeverity::Critical => {
            format!("Critical: {issues} detected with {modes} active.")
        }
        VerdictSeverity::Warning if active == 0 => {
            format!("Needs attention: {issues} detected.")
        }
        VerdictSeverity::Warning => {
            format!("Needs attention: {issues} detected, {modes} active.")
        }
    }
}

pub fn humanize_tag(tag: &str) -> String {
    tag.replace('_', " ")
}

pub fn score_tone(percent: f64, bands: &ScoreBands) -> Tone {
    if percent >= bands.green_min {
        Tone::Green
    } else if percent >= bands.amber_min {
        Tone::Amber
    } else {
        Tone::Red
    }
}

fn count_tone(n: usize, amber_min: usize, red_min: usize) -> Tone {
    if n >= red_min {
        Tone::Red
    } else if n >= amber_min {
        Tone::Amber
    } else {
        Tone::Green
    }
}

fn detail(items: &[String]) -> String {
    if items.is_empty() {
        return NONE_DETECTED.to_string();
    }
    let shown: Vec<&str> = items
        .iter()
        .take(HP.detail_items_max)
        .map(String::as_str)
        .collect();
    let rest = items.len().saturating_sub(HP.detail_items_max);
    if rest > 0 {
        format!("{} (+{rest} more)", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Presentation rows
// ---------------------------------------------------------------------------

fn structural_checks(result: &ScoredResult) -> Vec<StructuralCheck> {
    let pass_fail = |ok: bool| if ok { CheckStatus::Pass } else { CheckStatus::Fail };
    vec![
        StructuralCheck {
            key: "constraints_explicit",
            label: "Constraints explicit",
            status: pass_fail(result.q1_constraints_explicit),
        },
        StructuralCheck {
            key: "constraints_before_capability",
            label: "Constraints before capability",
            status: pass_fail(result.q2_constraints_before_capability),
        },
        StructuralCheck {
            key: "boundaries_enforced",
            label: "Boundaries enforced",
            status: pass_fail(result.q3_substitutes_after_enforcement),
        },
        StructuralCheck {
            key: "objective_detected",
            label: "Objective detected",
            status: if result.objective.is_empty() {
                CheckStatus::Neutral
            } else {
                CheckStatus::Pass
            },
        },
    ]
}

fn metrics(result: &ScoredResult, enrichment: &Enrichment) -> Vec<Metric> {
    let marker_metric = |key, label, items: &[String]| Metric {
        key,
        label,
        value: items.len().to_string(),
        tone: count_tone(items.len(), HP.marker_amber_min, HP.marker_red_min),
        detail: detail(items),
    };

    let specific_tone = match enrichment.specific_count {
        0 => Tone::Neutral,
        n if n >= HP.specific_green_min => Tone::Green,
        _ => Tone::Amber,
    };
    let emotional_tone = match enrichment.emotional_charge {
        c if c >= HP.emotional_red_min => Tone::Red,
        c if c >= HP.emotional_amber_min => Tone::Amber,
        _ => Tone::Green,
    };

    vec![
        Metric {
            key: "vague_language",
            label: "Vague language",
            value: enrichment.vague_count.to_string(),
            tone: count_tone(enrichment.vague_count, HP.vague_amber_min, HP.vague_red_min),
            detail: detail(&enrichment.vague_matches),
        },
        Metric {
            key: "specific_language",
            label: "Specific language",
            value: enrichment.specific_count.to_string(),
            tone: specific_tone,
            detail: detail(&enrichment.specific_matches),
        },
        Metric {
            key: "emotional_charge",
            label: "Emotional charge",
            value: format!("{}%", enrichment.emotional_charge),
            tone: emotional_tone,
            detail: String::new(),
        },
        Metric {
            key: "constraints_found",
            label: "Constraints found",
            value: result.constraints_found.len().to_string(),
            tone: if result.constraints_found.is_empty() {
                Tone::Amber
            } else {
                Tone::Green
            },
            detail: detail(&result.constraints_found),
        },
        marker_metric("hedge_markers", "Hedge markers", &result.hedge_markers),
        marker_metric(
            "reassurance_markers",
            "Reassurance markers",
            &result.reassurance_markers,
        ),
        marker_metric(
            "category_blend_markers",
            "Category blend markers",
            &result.category_blend_markers,
        ),
    ]
}

fn failure_mode_rows(result: &ScoredResult) -> Vec<FailureModeRow> {
    FAILURE_MODES
        .iter()
        .map(|&(code, name, description)| {
            let raw = result.failure_modes.get(code);
            let state = classify_failure_mode(raw.map(String::as_str));
            FailureModeRow {
                code,
                name,
                description,
                state,
                label: state.label(),
                tone: state.tone(),
                active: state.is_active(),
                raw_state: raw.cloned().unwrap_or_default(),
            }
        })
        .collect()
}

fn tilt_rows(result: &ScoredResult, tables: &Tables) -> Vec<TiltRow> {
    result
        .tilt_taxonomy
        .iter()
        .map(|tag| match tables.tilt(tag) {
            Some(def) => TiltRow {
                tag: tag.clone(),
                label: def.label.clone(),
                description: def.description.clone(),
                icon: def.icon.clone(),
                known: true,
            },
            None => {
                debug!(tag = %tag, "unknown tilt tag, using humanized label");
                TiltRow {
                    tag: tag.clone(),
                    label: humanize_tag(tag),
                    description: String::new(),
                    icon: None,
                    known: false,
                }
            }
        })
        .collect()
}

fn dominant_pattern_text(result: &ScoredResult) -> Option<String> {
    if result.dominance.is_empty() {
        return None;
    }
    let names: Vec<String> = result
        .dominance
        .iter()
        .map(|tag| {
            FAILURE_MODES
                .iter()
                .find(|(code, _, _)| code == tag)
                .map(|(code, name, _)| format!("{name} ({code})"))
                .unwrap_or_else(|| humanize_tag(tag))
        })
        .collect();
    Some(format!("Dominant pattern: {}", names.join(" + ")))
}

fn footer(
    result: &ScoredResult,
    enrichment: &Enrichment,
    bands: &ScoreBands,
) -> (FooterScore, FooterMeta) {
    // Band on the exact score; only the displayed value is rounded.
    let percent = bands.to_percent(result.nii_score);
    let shown = percent.round();
    let score = FooterScore {
        value: shown,
        display: format!("{shown:.0}"),
        tone: score_tone(percent, bands),
    };
    let meta = FooterMeta {
        latency: result
            .latency_ms
            .map(|ms| format!("{} ms", ms.round() as i64))
            .unwrap_or_else(|| "n/a".to_string()),
        word_count: plural(enrichment.word_count, "word"),
        version: result
            .version
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    };
    (score, meta)
}

// ---------------------------------------------------------------------------
// Public entry
// ---------------------------------------------------------------------------

pub fn build_presentation(
    result: &ScoredResult,
    original_text: &str,
    tables: &Tables,
) -> PresentationModel {
    let enrichment = enrich(original_text, &tables.lexicons);
    let failure_mode_rows = failure_mode_rows(result);
    let active = failure_mode_rows.iter().filter(|r| r.active).count();
    let issues = issue_count(result);
    let severity = classify_verdict(issues, active);

    debug!(
        issues,
        active_failure_modes = active,
        severity = ?severity,
        word_count = enrichment.word_count,
        "derived verdict"
    );

    let (footer_score, footer_meta) = footer(result, &enrichment, &tables.score_bands);

    PresentationModel {
        verdict_text: verdict_text(severity, issues, active),
        verdict_severity: severity,
        verdict_tone: severity.tone(),
        issue_count: issues,
        active_failure_modes: active,
        structural_checks: structural_checks(result),
        metrics: metrics(result, &enrichment),
        failure_mode_rows,
        tilt_rows: tilt_rows(result, tables),
        dominant_pattern_text: dominant_pattern_text(result),
        footer_score,
        footer_meta,
        enrichment,
    }
}
