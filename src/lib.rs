use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

pub mod error;
pub mod highlight;
pub mod render;
pub mod result;
pub mod tables;
pub mod verdict;

pub use error::NtiError;
pub use highlight::{escape_markup, to_markup, DrillDown, Segment, Span};
pub use result::ScoredResult;
pub use tables::{Lexicons, ScoreBands, ScoreScale, Tables, TiltDefinition};
pub use verdict::{
    CheckStatus, Enrichment, FailureModeRow, FailureModeState, FooterMeta, FooterScore, Metric,
    PresentationModel, StructuralCheck, TiltRow, Tone, VerdictSeverity,
};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Tables plus the trigger patterns compiled from them. Immutable once built,
/// so one engine can serve any number of independent renders.
#[derive(Debug, Clone)]
pub struct Engine {
    tables: Tables,
    triggers: HashMap<String, Vec<Regex>>,
}

static CANONICAL_ENGINE: Lazy<Engine> = Lazy::new(|| {
    Engine::new(Tables::canonical().clone()).expect("canonical tables are valid")
});

impl Engine {
    pub fn new(mut tables: Tables) -> Result<Self, NtiError> {
        tables.lexicons.lowercase();
        tables.validate()?;
        let mut triggers = HashMap::with_capacity(tables.tilts.len());
        for def in &tables.tilts {
            triggers.insert(def.tag.clone(), highlight::compile_triggers(&def.triggers)?);
        }
        Ok(Self { tables, triggers })
    }

    /// Engine over the built-in `tilt-v1` tables.
    pub fn canonical() -> &'static Engine {
        &CANONICAL_ENGINE
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Byte spans of `tag`'s trigger phrases in `text`, merged and ordered.
    pub fn spans(&self, text: &str, tag: &str) -> Vec<Span> {
        match self.triggers.get(tag) {
            Some(patterns) if !patterns.is_empty() => {
                highlight::merge_spans(highlight::find_spans(text, patterns))
            }
            _ => Vec::new(),
        }
    }

    /// Split `text` into literal and matched segments for `tag`. Unknown tags
    /// and tags without triggers give back the whole text unmatched.
    pub fn highlight(&self, text: &str, tag: &str) -> Vec<Segment> {
        let spans = self.spans(text, tag);
        trace!(tag, spans = spans.len(), "highlighted");
        highlight::segment(text, &spans)
    }

    pub fn highlight_markup(&self, text: &str, tag: &str) -> String {
        to_markup(&self.highlight(text, tag))
    }

    pub fn enrich(&self, text: &str) -> Enrichment {
        verdict::enrich(text, &self.tables.lexicons)
    }

    pub fn render(&self, result: &ScoredResult, original_text: &str) -> PresentationModel {
        verdict::build_presentation(result, original_text, &self.tables)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn highlight(text: &str, tag: &str) -> Vec<Segment> {
    Engine::canonical().highlight(text, tag)
}

pub fn enrich(text: &str) -> Enrichment {
    Engine::canonical().enrich(text)
}

pub fn render(result: &ScoredResult, original_text: &str) -> PresentationModel {
    Engine::canonical().render(result, original_text)
}
