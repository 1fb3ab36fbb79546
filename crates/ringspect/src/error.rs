//! Station-boundary error taxonomy.
//!
//! None of these escape [`crate::Station::evaluate`]: every variant maps to a
//! deterministic fallback [`crate::Verdict`] carrying the variant's wire tag,
//! because the caller drives hardware-facing pass/fail signaling and must
//! receive a verdict every cycle.

use crate::classify::ContourSlot;

/// Everything that can go wrong inside one station evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// A tolerance value failed to parse as a number at the recipe boundary.
    #[error("parameter `{key}` failed numeric conversion (got {value:?})")]
    ParameterConversion { key: String, value: String },

    /// Fewer contours survived preprocessing than the station's measurement
    /// set needs.
    #[error("not enough contours: need {needed}, found {found}")]
    NotEnoughContours { needed: usize, found: usize },

    /// The classifier produced no candidate for one or more required slots.
    #[error("contour not found for: {}", join_slots(.slots))]
    ContourNotFound { slots: Vec<ContourSlot> },

    /// The source frame was absent or had zero dimensions.
    #[error("empty or zero-sized frame")]
    EmptyFrame,

    /// Annotated-image persistence failed even after the fallback write.
    #[error("render output failed: {0}")]
    Render(String),

    /// Anything else, caught at the station boundary.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

fn join_slots(slots: &[ContourSlot]) -> String {
    slots
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl EvalError {
    /// Stable tag recorded in the verdict's error field.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ParameterConversion { .. } => "parameter_conversion",
            Self::NotEnoughContours { .. } => "not_enough_contours",
            Self::ContourNotFound { .. } => "contour_not_found",
            Self::EmptyFrame => "empty_frame",
            Self::Render(_) => "render_failure",
            Self::Unexpected(_) => "unexpected",
        }
    }
}
