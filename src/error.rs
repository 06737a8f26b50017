//! Errors raised at the crate's parse and construction boundaries.
//!
//! Derivation itself never fails: once a [`crate::ScoredResult`] exists and an
//! [`crate::Engine`] is built, rendering and highlighting are total.

/// Errors that can occur while loading inputs or configuration.
#[derive(Debug, thiserror::Error)]
pub enum NtiError {
    #[error("Scored result must be a JSON object, found {found}")]
    InputShape { found: &'static str },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate tilt tag in tables: {tag}")]
    DuplicateTag { tag: String },

    #[error("Tilt {tag} has an empty trigger phrase")]
    EmptyTrigger { tag: String },

    #[error("Invalid score bands: amber_min {amber_min} must be <= green_min {green_min}, both within 0..=100")]
    InvalidBands { green_min: f64, amber_min: f64 },

    #[error("Trigger pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl NtiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputShape { .. } => "NTI_INPUT_SHAPE",
            Self::Json(_) => "NTI_JSON",
            Self::DuplicateTag { .. } => "NTI_DUPLICATE_TAG",
            Self::EmptyTrigger { .. } => "NTI_EMPTY_TRIGGER",
            Self::InvalidBands { .. } => "NTI_INVALID_BANDS",
            Self::Pattern(_) => "NTI_PATTERN",
        }
    }
}
