use nti_verdict::{
    enrich, highlight, render, CheckStatus, Engine, FailureModeState, ScoreBands, ScoreScale,
    ScoredResult, Segment, Tables, TiltDefinition, Tone, VerdictSeverity,
};
use serde_json::json;

fn engine_with(triggers: &[&str]) -> Engine {
    let tables = Tables {
        tilts: vec![TiltDefinition::new("X_TEST", "Test", triggers)],
        ..Tables::canonical().clone()
    };
    Engine::new(tables).unwrap()
}

fn matches(segments: &[Segment]) -> Vec<&str> {
    segments
        .iter()
        .filter(|s| s.is_match)
        .map(|s| s.text.as_str())
        .collect()
}

fn joined(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

fn scored(value: serde_json::Value) -> ScoredResult {
    ScoredResult::from_value(&value).unwrap()
}

fn all_checks_pass() -> serde_json::Value {
    json!({
        "q1_constraints_explicit": 1,
        "q2_constraints_before_capability": 1,
        "q3_substitutes_after_enforcement": 1
    })
}

// ---------------------------------------------------------------------------
// Highlighter
// ---------------------------------------------------------------------------

#[test]
fn repeated_phrase_yields_two_disjoint_matches() {
    let text = "act now, act now";
    let segments = highlight(text, "T8_PRESSURE_OPTIMIZATION");
    assert_eq!(matches(&segments), vec!["act now", "act now"]);
    assert_eq!(segments.len(), 3, "got {segments:?}");
    assert_eq!(segments[1], Segment { text: ", ".into(), is_match: false });
    assert_eq!(joined(&segments), text);
}

#[test]
fn separated_triggers_stay_separate() {
    let engine = engine_with(&["guarantee", "absolutely"]);
    let segments = engine.highlight("guarantee absolutely", "X_TEST");
    assert_eq!(matches(&segments), vec!["guarantee", "absolutely"]);
    assert_eq!(segments.len(), 3);
}

#[test]
fn nested_triggers_collapse_to_longest() {
    let engine = engine_with(&["guarantee", "guarantees"]);
    let segments = engine.highlight("we guarantees it", "X_TEST");
    assert_eq!(matches(&segments), vec!["guarantees"]);
    assert_eq!(joined(&segments), "we guarantees it");
}

#[test]
fn overlapping_occurrences_merge() {
    let engine = engine_with(&["no no"]);
    let segments = engine.highlight("no no no!", "X_TEST");
    assert_eq!(matches(&segments), vec!["no no no"]);
    assert_eq!(engine.spans("no no no!", "X_TEST").len(), 1);
}

#[test]
fn matching_ignores_case_and_keeps_original_text() {
    let segments = highlight("Please ACT NOW.", "T8_PRESSURE_OPTIMIZATION");
    assert_eq!(matches(&segments), vec!["ACT NOW"]);
}

#[test]
fn unknown_tag_returns_whole_text() {
    let text = "Rest assured, it's fine.";
    let segments = highlight(text, "T99_UNKNOWN");
    assert_eq!(
        segments,
        vec![Segment { text: text.into(), is_match: false }]
    );
}

#[test]
fn empty_text_is_one_empty_segment() {
    let segments = highlight("", "T1_REASSURANCE_DRIFT");
    assert_eq!(segments, vec![Segment { text: String::new(), is_match: false }]);
}

#[test]
fn category_without_triggers_returns_whole_text() {
    let engine = engine_with(&[]);
    let segments = engine.highlight("anything at all", "X_TEST");
    assert_eq!(segments.len(), 1);
    assert!(!segments[0].is_match);
}

#[test]
fn markup_escapes_after_segmentation() {
    let engine = Engine::canonical();
    let html = engine.highlight_markup("<b>act now</b> & go", "T8_PRESSURE_OPTIMIZATION");
    assert_eq!(
        html,
        "&lt;b&gt;<mark class=\"tilt-hit\">act now</mark>&lt;/b&gt; &amp; go"
    );
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[test]
fn lexicon_words_match_as_substrings() {
    let e = enrich("our community values leadership");
    assert!(e.vague_count >= 3, "expected >= 3, got {}", e.vague_count);
    for word in ["community", "values", "leadership"] {
        assert!(e.vague_matches.iter().any(|m| m == word), "missing {word}");
    }
}

#[test]
fn mixed_case_lexicon_entries_still_match() {
    let mut tables = Tables::canonical().clone();
    tables.lexicons.vague = vec!["Leadership".to_string()];
    let engine = Engine::new(tables).unwrap();
    let e = engine.enrich("our leadership");
    assert_eq!(e.vague_count, 1);
    assert_eq!(e.vague_matches, vec!["leadership"]);
}

#[test]
fn lexicon_matches_are_distinct() {
    let e = enrich("community community community");
    assert_eq!(e.vague_matches, vec!["community"]);
    assert_eq!(e.word_count, 3);
}

#[test]
fn enrichment_is_deterministic() {
    let text = "We are thrilled and worried. The contract was signed Friday, 40% done.";
    let first = enrich(text);
    for _ in 0..5 {
        assert_eq!(enrich(text), first);
    }
    assert!(first.emotional_charge <= 100);
    assert!(first.specific_count >= 3);
}

#[test]
fn emotional_charge_scales_and_clamps() {
    let short = enrich("I am furious and worried");
    assert_eq!(short.emotional_charge, 100);

    let mut long = String::from("upset");
    for _ in 0..99 {
        long.push_str(" word");
    }
    let e = enrich(&long);
    assert_eq!(e.word_count, 100);
    assert_eq!(e.emotional_charge, 12);
}

#[test]
fn empty_text_counts_as_one_word() {
    let e = enrich("");
    assert_eq!(e.word_count, 1);
    assert_eq!(e.vague_count, 0);
    assert_eq!(e.emotional_charge, 0);
}

// ---------------------------------------------------------------------------
// Verdict renderer
// ---------------------------------------------------------------------------

#[test]
fn clean_result_gets_clean_verdict() {
    let result = scored(json!({
        "nii": all_checks_pass(),
        "tilt_taxonomy": []
    }));
    let model = render(&result, "");
    assert_eq!(model.verdict_severity, VerdictSeverity::Clean);
    assert_eq!(model.verdict_tone, Tone::Green);
    assert_eq!(model.issue_count, 0);
    assert_eq!(model.active_failure_modes, 0);
    assert!(model
        .failure_mode_rows
        .iter()
        .all(|r| r.label == "CLEAR" && !r.active));
    assert!(model.tilt_rows.is_empty());
    assert_eq!(model.dominant_pattern_text, None);
}

#[test]
fn two_confirmed_modes_force_critical() {
    let result = scored(json!({
        "nii": all_checks_pass(),
        "parent_failure_modes": {
            "UDDS": {"udds_state": "CONFIRMED_X"},
            "DCE": {"dce_state": "CONFIRMED_X"}
        }
    }));
    let model = render(&result, "");
    assert_eq!(model.active_failure_modes, 2);
    assert_eq!(model.issue_count, 0);
    assert_eq!(model.verdict_severity, VerdictSeverity::Critical);
    assert_eq!(
        model.verdict_text,
        "Critical: 0 structural issues detected with 2 failure modes active."
    );

    let rows: Vec<(&str, FailureModeState)> = model
        .failure_mode_rows
        .iter()
        .map(|r| (r.code, r.state))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("UDDS", FailureModeState::Detected),
            ("DCE", FailureModeState::Detected),
            ("CCA", FailureModeState::Clear),
        ]
    );
}

#[test]
fn probable_mode_is_amber_and_active() {
    let result = scored(json!({
        "nii": all_checks_pass(),
        "parent_failure_modes": {"CCA": {"cca_state": "CCA_PROBABLE"}}
    }));
    let model = render(&result, "");
    let cca = &model.failure_mode_rows[2];
    assert_eq!(cca.label, "PROBABLE");
    assert_eq!(cca.tone, Tone::Amber);
    assert_eq!(model.verdict_severity, VerdictSeverity::Warning);
    assert_eq!(
        model.verdict_text,
        "Needs attention: 0 structural issues detected, 1 failure mode active."
    );
}

#[test]
fn issue_count_sums_flags_markers_and_tilts() {
    let result = scored(json!({
        "nii": {"q1_constraints_explicit": 0, "q2_constraints_before_capability": 1},
        "layers": {"L2_interpretive_framing": {
            "hedge_markers": ["maybe"],
            "reassurance_markers": ["don't worry", "rest assured"],
            "category_blend_markers": ["basically"]
        }},
        "tilt_taxonomy": ["T1_REASSURANCE_DRIFT"]
    }));
    let model = render(&result, "");
    // q1 + q3 missing, 1 hedge, 2 reassurance, 1 tilt; blend markers do not count
    assert_eq!(model.issue_count, 6);
    assert_eq!(model.verdict_severity, VerdictSeverity::Critical);
}

#[test]
fn warning_omits_failure_mode_clause() {
    let result = scored(json!({
        "nii": all_checks_pass(),
        "tilt_taxonomy": ["T1_REASSURANCE_DRIFT", "T99_MADE_UP"]
    }));
    let model = render(&result, "");
    assert_eq!(model.verdict_severity, VerdictSeverity::Warning);
    assert_eq!(model.verdict_text, "Needs attention: 2 structural issues detected.");
}

#[test]
fn tilt_rows_resolve_or_fall_back() {
    let result = scored(json!({
        "tilt_taxonomy": ["T99_MADE_UP", "T1_REASSURANCE_DRIFT"]
    }));
    let model = render(&result, "");
    assert_eq!(model.tilt_rows.len(), 2);
    assert_eq!(model.tilt_rows[0].label, "T99 MADE UP");
    assert_eq!(model.tilt_rows[0].description, "");
    assert!(!model.tilt_rows[0].known);
    assert_eq!(model.tilt_rows[1].label, "Reassurance drift");
    assert!(model.tilt_rows[1].known);
}

#[test]
fn structural_checks_reflect_flags_and_objective() {
    let result = scored(json!({
        "nii": {"q1_constraints_explicit": true, "q2_constraints_before_capability": "0"},
        "layers": {"L1_input_freeze": {"objective": "ship the release"}}
    }));
    let statuses: Vec<(&str, CheckStatus)> = render(&result, "")
        .structural_checks
        .iter()
        .map(|c| (c.key, c.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("constraints_explicit", CheckStatus::Pass),
            ("constraints_before_capability", CheckStatus::Fail),
            ("boundaries_enforced", CheckStatus::Fail),
            ("objective_detected", CheckStatus::Pass),
        ]
    );

    let no_objective = render(&scored(json!({})), "");
    assert_eq!(no_objective.structural_checks[3].status, CheckStatus::Neutral);
}

#[test]
fn dominant_pattern_lists_non_sentinel_tags() {
    let result = scored(json!({
        "interaction_matrix": {"dominance_detected": ["UDDS", "DCE"]}
    }));
    assert_eq!(
        render(&result, "").dominant_pattern_text.as_deref(),
        Some("Dominant pattern: Narrative substitution (UDDS) + Deferred constraints (DCE)")
    );

    let none = scored(json!({"interaction_matrix": {"dominance_detected": ["NONE"]}}));
    assert_eq!(render(&none, "").dominant_pattern_text, None);
}

#[test]
fn absent_markers_render_none_detected() {
    let model = render(&scored(json!({})), "plain words");
    let hedge = model
        .metrics
        .iter()
        .find(|m| m.key == "hedge_markers")
        .unwrap();
    assert_eq!(hedge.value, "0");
    assert_eq!(hedge.detail, "None detected");
}

#[test]
fn footer_bands_percent_scale() {
    let result = scored(json!({
        "nii": {"nii_score": 80},
        "telemetry": {"latency_ms": 41.6},
        "version": "v3.0"
    }));
    let model = render(&result, "two words");
    assert_eq!(model.footer_score.display, "80");
    assert_eq!(model.footer_score.tone, Tone::Green);
    assert_eq!(model.footer_meta.latency, "42 ms");
    assert_eq!(model.footer_meta.word_count, "2 words");
    assert_eq!(model.footer_meta.version, "v3.0");
}

#[test]
fn footer_bands_fraction_scale() {
    let tables = Tables {
        score_bands: ScoreBands {
            scale: ScoreScale::Fraction,
            green_min: 75.0,
            amber_min: 50.0,
        },
        ..Tables::canonical().clone()
    };
    let engine = Engine::new(tables).unwrap();
    let model = engine.render(&scored(json!({"nii": {"nii_score": 0.62}})), "");
    assert_eq!(model.footer_score.value, 62.0);
    assert_eq!(model.footer_score.tone, Tone::Amber);

    let low = engine.render(&scored(json!({"nii": {"nii_score": 0.3}})), "");
    assert_eq!(low.footer_score.tone, Tone::Red);
    assert_eq!(low.footer_meta.latency, "n/a");
    assert_eq!(low.footer_meta.version, "unknown");
}

#[test]
fn footer_tone_uses_unrounded_score() {
    let fraction = Engine::new(Tables {
        score_bands: ScoreBands {
            scale: ScoreScale::Fraction,
            green_min: 75.0,
            amber_min: 50.0,
        },
        ..Tables::canonical().clone()
    })
    .unwrap();
    let cases = [
        (74.5, 0.7451, "75", Tone::Amber),
        (74.99, 0.7499, "75", Tone::Amber),
        (49.6, 0.496, "50", Tone::Red),
        (75.0, 0.75, "75", Tone::Green),
    ];
    for (percent, frac, display, tone) in cases {
        let model = render(&scored(json!({"nii": {"nii_score": percent}})), "");
        assert_eq!(model.footer_score.display, display, "percent {percent}");
        assert_eq!(model.footer_score.tone, tone, "percent {percent}");

        let model = fraction.render(&scored(json!({"nii": {"nii_score": frac}})), "");
        assert_eq!(model.footer_score.display, display, "fraction {frac}");
        assert_eq!(model.footer_score.tone, tone, "fraction {frac}");
    }
}

#[test]
fn whitespace_objective_counts_as_present() {
    let model = render(
        &scored(json!({"layers": {"L1_input_freeze": {"objective": "   "}}})),
        "",
    );
    assert_eq!(model.structural_checks[3].status, CheckStatus::Pass);
}

#[test]
fn nan_flag_string_is_falsy() {
    let result = scored(json!({"nii": {"q1_constraints_explicit": "NaN"}}));
    assert!(!result.q1_constraints_explicit);
}

#[test]
fn drill_down_highlights_active_tag() {
    let engine = Engine::canonical();
    let text = "Don't worry, it's fine. Act now.";
    let mut drill = nti_verdict::DrillDown::new();
    assert!(drill.segments(engine, text).is_none());

    drill.toggle("T1_REASSURANCE_DRIFT");
    let segments = drill.segments(engine, text).unwrap();
    assert_eq!(matches(&segments), vec!["Don't worry", "it's fine"]);

    drill.toggle("T8_PRESSURE_OPTIMIZATION");
    let segments = drill.segments(engine, text).unwrap();
    assert_eq!(matches(&segments), vec!["Act now"]);
}

#[test]
fn json_output_is_valid() {
    let result = scored(json!({
        "nii": {"nii_score": 55},
        "tilt_taxonomy": ["T5_ABSOLUTE_LANGUAGE"]
    }));
    let model = render(&result, "It always works.");
    let json = nti_verdict::render::to_json(&model).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    for key in [
        "verdict_text",
        "verdict_severity",
        "structural_checks",
        "metrics",
        "failure_mode_rows",
        "tilt_rows",
        "footer_score",
        "footer_meta",
    ] {
        assert!(parsed.get(key).is_some(), "missing {key}");
    }
    assert_eq!(parsed["verdict_severity"], "warning");
    assert_eq!(parsed["failure_mode_rows"][0]["state"], "CLEAR");
    assert!(parsed.get("dominant_pattern_text").is_none());
}

#[test]
fn html_adapter_escapes_and_expands_drill() {
    let text = "<i>act now</i>";
    let result = scored(json!({"tilt_taxonomy": ["T8_PRESSURE_OPTIMIZATION"]}));
    let engine = Engine::canonical();
    let model = engine.render(&result, text);
    let segments = engine.highlight(text, "T8_PRESSURE_OPTIMIZATION");
    let html = nti_verdict::render::to_html(
        &model,
        Some(("T8_PRESSURE_OPTIMIZATION", segments.as_slice())),
    );
    assert!(html.contains("&lt;i&gt;<mark class=\"tilt-hit\">act now</mark>&lt;/i&gt;"));
    assert!(!html.contains("<i>"));
}

#[test]
fn text_adapter_brackets_matches() {
    let text = "We guarantee it.";
    let result = scored(json!({"tilt_taxonomy": ["T2_CERTAINTY_INFLATION"]}));
    let engine = Engine::canonical();
    let model = engine.render(&result, text);
    let segments = engine.highlight(text, "T2_CERTAINTY_INFLATION");
    let out = nti_verdict::render::to_text(
        &model,
        Some(("T2_CERTAINTY_INFLATION", segments.as_slice())),
    );
    assert!(out.contains("> We [guarantee] it."), "got:\n{out}");
    assert!(out.contains("Certainty inflation"));
}

#[test]
fn non_object_result_is_rejected() {
    let err = ScoredResult::from_json("[1, 2, 3]").unwrap_err();
    assert_eq!(err.error_code(), "NTI_INPUT_SHAPE");
}

#[test]
fn result_deserializes_through_serde() {
    let result: ScoredResult = serde_json::from_value(json!({
        "nii": {"nii_score": 71.0},
        "tilt_taxonomy": ["T7_CATEGORY_BLEND"]
    }))
    .unwrap();
    assert_eq!(result.nii_score, 71.0);
    assert_eq!(result.tilt_taxonomy, vec!["T7_CATEGORY_BLEND"]);
}

#[test]
fn triple_failure_demo_is_critical() {
    let result = ScoredResult::from_json(include_str!("../demos/triple_failure.json")).unwrap();
    let text = include_str!("../demos/triple_failure.txt");
    let model = render(&result, text);
    assert_eq!(model.issue_count, 7);
    assert_eq!(model.active_failure_modes, 3);
    assert_eq!(model.verdict_severity, VerdictSeverity::Critical);
    assert_eq!(model.footer_score.tone, Tone::Red);
    assert_eq!(model.footer_meta.latency, "38 ms");

    let deferral = highlight(text, "T6_CONSTRAINT_DEFERRAL");
    assert_eq!(
        matches(&deferral),
        vec!["figure it out", "later", "address the details", "eventually"]
    );
}
