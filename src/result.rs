use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::NtiError;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A scoring-service response after the one defaulting pass. Every field the
/// derivation reads is present; anything missing or malformed in the source
/// document has already become empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct ScoredResult {
    pub nii_score: f64,
    pub q1_constraints_explicit: bool,
    pub q2_constraints_before_capability: bool,
    pub q3_substitutes_after_enforcement: bool,
    /// Failure-mode code -> raw state string, only for codes the source carried.
    pub failure_modes: BTreeMap<String, String>,
    pub tilt_taxonomy: Vec<String>,
    /// `dominance_detected` with the `NONE` sentinel removed.
    pub dominance: Vec<String>,
    pub constraints_found: Vec<String>,
    pub objective: String,
    pub hedge_markers: Vec<String>,
    pub reassurance_markers: Vec<String>,
    pub category_blend_markers: Vec<String>,
    pub latency_ms: Option<f64>,
    pub version: Option<String>,
}

impl TryFrom<Value> for ScoredResult {
    type Error = NtiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl ScoredResult {
    pub fn from_json(json: &str) -> Result<Self, NtiError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Normalize a raw response. Fails only when `value` is not an object.
    pub fn from_value(value: &Value) -> Result<Self, NtiError> {
        let root = value.as_object().ok_or(NtiError::InputShape {
            found: kind_of(value),
        })?;

        let nii = root.get("nii");
        let layers = root.get("layers");
        let l2 = path(layers, &["L2_interpretive_framing"]);

        let failure_modes = root
            .get("parent_failure_modes")
            .or_else(|| root.get("failure_modes"))
            .and_then(Value::as_object)
            .map(failure_mode_states)
            .unwrap_or_default();

        Ok(Self {
            nii_score: path(nii, &["nii_score"]).and_then(number).unwrap_or(0.0),
            q1_constraints_explicit: truthy(path(nii, &["q1_constraints_explicit"])),
            q2_constraints_before_capability: truthy(path(
                nii,
                &["q2_constraints_before_capability"],
            )),
            q3_substitutes_after_enforcement: truthy(path(
                nii,
                &["q3_substitutes_after_enforcement"],
            )),
            failure_modes,
            tilt_taxonomy: tilt_tags(root.get("tilt_taxonomy")),
            dominance: strings(path(
                root.get("interaction_matrix"),
                &["dominance_detected"],
            ))
            .into_iter()
            .filter(|tag| tag != "NONE")
            .collect(),
            constraints_found: strings(path(
                layers,
                &["L0_reality_substrate", "constraints_found"],
            )),
            objective: path(layers, &["L1_input_freeze", "objective"])
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default(),
            hedge_markers: strings(path(l2, &["hedge_markers"])),
            reassurance_markers: strings(path(l2, &["reassurance_markers"])),
            category_blend_markers: strings(path(l2, &["category_blend_markers"])),
            latency_ms: path(root.get("telemetry"), &["latency_ms"]).and_then(number),
            version: root
                .get("version")
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn path<'a>(start: Option<&'a Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(start?, |v, k| v.get(k))
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

/// 0/1 flags arrive as booleans, numbers or strings depending on the producer.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim().to_ascii_lowercase();
            matches!(s.as_str(), "true" | "yes")
                || s.parse::<f64>().is_ok_and(|f| f.is_finite() && f != 0.0)
        }
        _ => false,
    }
}

fn strings(value: Option<&Value>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    match value.as_array() {
        Some(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        None => {
            warn!(kind = kind_of(value), "expected a string array, ignoring");
            Vec::new()
        }
    }
}

fn tilt_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Object(obj)) => {
            strings(obj.get("tags").or_else(|| obj.get("tags_detected")))
        }
        other => strings(other),
    }
}

fn failure_mode_states(modes: &Map<String, Value>) -> BTreeMap<String, String> {
    modes
        .iter()
        .map(|(code, entry)| (code.clone(), state_of(code, entry)))
        .collect()
}

fn state_of(code: &str, entry: &Value) -> String {
    match entry {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            let own_key = format!("{}_state", code.to_lowercase());
            obj.get(&own_key)
                .and_then(Value::as_str)
                .or_else(|| {
                    obj.iter()
                        .filter(|(k, _)| k.ends_with("_state"))
                        .find_map(|(_, v)| v.as_str())
                })
                .unwrap_or_default()
                .to_string()
        }
        _ => String::new(),
    }
}
