use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::NtiError;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// One tilt category: display metadata plus the literal trigger phrases used
/// to highlight it in source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltDefinition {
    pub tag: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl TiltDefinition {
    pub fn new(tag: &str, label: &str, triggers: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            label: label.to_string(),
            description: String::new(),
            icon: None,
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicons {
    pub vague: Vec<String>,
    pub specific: Vec<String>,
    pub emotional_high: Vec<String>,
    pub emotional_moderate: Vec<String>,
}

/// How the external scorer expresses `nii_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreScale {
    /// 0.0 ..= 1.0
    Fraction,
    /// 0 ..= 100
    Percent,
}

/// Footer banding. Cutoffs are in percent points after the raw score has
/// been converted from `scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBands {
    pub scale: ScoreScale,
    pub green_min: f64,
    pub amber_min: f64,
}

impl ScoreBands {
    pub fn to_percent(&self, raw: f64) -> f64 {
        let pct = match self.scale {
            ScoreScale::Fraction => raw * 100.0,
            ScoreScale::Percent => raw,
        };
        pct.clamp(0.0, 100.0)
    }
}

/// Everything the engine treats as configuration. Versioned as a whole:
/// thresholds in `score_bands` only make sense for the declared scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub version: String,
    pub tilts: Vec<TiltDefinition>,
    pub lexicons: Lexicons,
    pub score_bands: ScoreBands,
}

// ---------------------------------------------------------------------------
// Canonical tables (tilt-v1)
// ---------------------------------------------------------------------------

pub const CANONICAL_VERSION: &str = "tilt-v1";

static CANONICAL_TILTS: Lazy<Vec<TiltDefinition>> = Lazy::new(|| {
    vec![
        TiltDefinition::new(
            "T1_REASSURANCE_DRIFT",
            "Reassurance drift",
            &[
                "nothing to worry about",
                "don't worry",
                "rest assured",
                "no big deal",
                "under control",
                "we've got this",
                "you got this",
                "it's fine",
                "no problem",
            ],
        )
        .with_description("Reassures instead of stating what is needed.")
        .with_icon("~"),
        TiltDefinition::new(
            "T2_CERTAINTY_INFLATION",
            "Certainty inflation",
            &[
                "without a doubt",
                "consider it done",
                "guaranteed",
                "guarantee",
                "definitely",
                "certainly",
                "for sure",
                "100%",
            ],
        )
        .with_description("States outcomes with more certainty than the evidence supports.")
        .with_icon("!"),
        TiltDefinition::new(
            "T3_CONSENSUS_CLAIMS",
            "Consensus claims",
            &[
                "everybody knows",
                "widely accepted",
                "experts agree",
                "most people",
                "all of us",
                "everyone",
                "nobody",
            ],
        )
        .with_description("Leans on an implied majority instead of speaking for itself.")
        .with_icon("="),
        TiltDefinition::new(
            "T4_CAPABILITY_OVERREACH",
            "Capability overreach",
            &[
                "handle absolutely everything",
                "can handle everything",
                "perfect results",
                "can do anything",
                "we can do all",
                "never fails",
                "all of it",
            ],
        )
        .with_description("Claims capability with no stated limits.")
        .with_icon("^"),
        TiltDefinition::new(
            "T5_ABSOLUTE_LANGUAGE",
            "Absolute language",
            &[
                "every single",
                "nothing works",
                "absolutely",
                "completely",
                "everything",
                "totally",
                "always",
                "never",
            ],
        )
        .with_description("\"Always\" or \"never\" without evidence invites pushback.")
        .with_icon("#"),
        TiltDefinition::new(
            "T6_CONSTRAINT_DEFERRAL",
            "Constraint deferral",
            &[
                "address the details",
                "down the road",
                "figure it out",
                "sort those out",
                "at some point",
                "eventually",
                "for now",
                "later",
            ],
        )
        .with_description("Pushes the constraints that matter to some later moment.")
        .with_icon(">"),
        TiltDefinition::new(
            "T7_CATEGORY_BLEND",
            "Category blend",
            &[
                "more or less",
                "pretty much",
                "in a way",
                "basically",
                "sort of",
                "kind of",
            ],
        )
        .with_description("Blurs distinct categories so the claim cannot be pinned down.")
        .with_icon("%"),
        TiltDefinition::new(
            "T8_PRESSURE_OPTIMIZATION",
            "Pressure optimization",
            &[
                "before it's too late",
                "limited time",
                "today only",
                "immediately",
                "don't miss",
                "right now",
                "act now",
                "urgent",
                "asap",
            ],
        )
        .with_description("Urgency without substance; the reader feels pushed, not informed.")
        .with_icon("*"),
        TiltDefinition::new(
            "T9_SCOPE_EXPANSION",
            "Scope expansion",
            &[
                "add it to the backlog",
                "add it to the sprint",
                "while we're at it",
                "we should also",
                "oh and",
            ],
        )
        .with_description("Grows the ask beyond what was requested.")
        .with_icon("+"),
        TiltDefinition::new(
            "T10_AUTHORITY_IMPOSITION",
            "Authority imposition",
            &[
                "because i said so",
                "just tell us",
                "you have to",
                "you need to",
                "trust me",
                "you must",
            ],
        )
        .with_description("Substitutes position for reasons.")
        .with_icon("@"),
    ]
});

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

static CANONICAL_LEXICONS: Lazy<Lexicons> = Lazy::new(|| Lexicons {
    vague: owned(&[
        "community",
        "values",
        "leadership",
        "excellence",
        "innovative",
        "solutions",
        "synergy",
        "holistic",
        "world-class",
        "best-in-class",
        "commitment",
        "empower",
        "journey",
        "passion",
        "impact",
        "vision",
        "mission",
        "transform",
        "stuff",
        "things",
        "various",
    ]),
    specific: owned(&[
        "percent",
        "%",
        "$",
        "deadline",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "quarterly",
        "audited",
        "measured",
        "reported",
        "contract",
        "invoice",
        "signed",
        "hours",
        "days",
        "weeks",
        "months",
        "employees",
        "revenue",
    ]),
    emotional_high: owned(&[
        "catastrophic",
        "devastating",
        "disaster",
        "betrayal",
        "outrage",
        "furious",
        "terrified",
        "shocking",
        "desperate",
        "crisis",
        "panic",
        "destroy",
        "hate",
    ]),
    emotional_moderate: owned(&[
        "frustrated",
        "disappointed",
        "concerned",
        "worried",
        "anxious",
        "annoyed",
        "upset",
        "excited",
        "thrilled",
        "amazing",
        "incredible",
        "love",
        "fear",
    ]),
});

static CANONICAL: Lazy<Tables> = Lazy::new(|| Tables {
    version: CANONICAL_VERSION.to_string(),
    tilts: CANONICAL_TILTS.clone(),
    lexicons: CANONICAL_LEXICONS.clone(),
    score_bands: ScoreBands {
        scale: ScoreScale::Percent,
        green_min: 75.0,
        amber_min: 50.0,
    },
});

impl Lexicons {
    /// Enrichment matches against lowercased text, so entries are folded the
    /// same way when tables are loaded.
    pub fn lowercase(&mut self) {
        for list in [
            &mut self.vague,
            &mut self.specific,
            &mut self.emotional_high,
            &mut self.emotional_moderate,
        ] {
            for entry in list.iter_mut() {
                *entry = entry.to_lowercase();
            }
        }
    }
}

impl Default for Lexicons {
    fn default() -> Self {
        CANONICAL_LEXICONS.clone()
    }
}

impl Default for ScoreBands {
    fn default() -> Self {
        CANONICAL.score_bands.clone()
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::canonical().clone()
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl Tables {
    pub fn canonical() -> &'static Tables {
        &CANONICAL
    }

    /// Parse a tables document. Omitted sections fall back to the canonical
    /// ones; the result is validated before it is returned.
    pub fn from_json(json: &str) -> Result<Self, NtiError> {
        let mut tables: Tables = serde_json::from_str(json)?;
        tables.lexicons.lowercase();
        tables.validate()?;
        Ok(tables)
    }

    pub fn validate(&self) -> Result<(), NtiError> {
        let mut seen = HashSet::new();
        for def in &self.tilts {
            if !seen.insert(def.tag.as_str()) {
                return Err(NtiError::DuplicateTag {
                    tag: def.tag.clone(),
                });
            }
            if def.triggers.iter().any(|t| t.trim().is_empty()) {
                return Err(NtiError::EmptyTrigger {
                    tag: def.tag.clone(),
                });
            }
        }

        let bands = &self.score_bands;
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(bands.green_min) || !in_range(bands.amber_min) || bands.amber_min > bands.green_min
        {
            return Err(NtiError::InvalidBands {
                green_min: bands.green_min,
                amber_min: bands.amber_min,
            });
        }
        Ok(())
    }

    pub fn tilt(&self, tag: &str) -> Option<&TiltDefinition> {
        self.tilts.iter().find(|d| d.tag == tag)
    }
}
