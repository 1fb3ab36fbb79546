//! The per-station output aggregate.
//!
//! A `Verdict` is the sole artifact that crosses the core boundary outward;
//! every station invocation produces exactly one, success or not.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defect::DefectFinding;
use crate::error::EvalError;
use crate::measure::Measurement;
use crate::params::Status;

/// Error tag carried by degraded or failed verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictError {
    /// Stable machine tag, e.g. `not_enough_contours`.
    pub tag: String,
    /// Human-readable detail.
    pub detail: String,
}

impl From<&EvalError> for VerdictError {
    fn from(err: &EvalError) -> Self {
        Self {
            tag: err.tag().to_string(),
            detail: err.to_string(),
        }
    }
}

/// Complete inspection outcome for one station invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub station: u8,
    pub part_type: String,
    pub overall: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_diameter: Option<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub od_diameter: Option<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness: Option<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concentricity: Option<Measurement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orifice_diameter: Option<Measurement>,

    /// Folded defect status across zones; `Na` when the part has no
    /// burr/flash-checked zone at this station.
    pub defect_result: Status,
    pub defects: Vec<DefectFinding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<VerdictError>,

    /// Path of the persisted evidence image; `None` only when even the
    /// fallback write failed.
    pub annotated_image: Option<PathBuf>,
}

impl Verdict {
    /// Uniform NA verdict for a part type this station does not inspect.
    pub fn excluded(station: u8, part_type: impl Into<String>) -> Self {
        Self {
            station,
            part_type: part_type.into(),
            overall: Status::Na,
            id_diameter: None,
            od_diameter: None,
            thickness: None,
            concentricity: None,
            orifice_diameter: None,
            defect_result: Status::Na,
            defects: Vec::new(),
            error: None,
            annotated_image: None,
        }
    }

    /// Deterministic all-NOK fallback for a failed invocation: zero-valued
    /// measurements, tagged with the failure.
    pub fn failure(station: u8, part_type: impl Into<String>, err: &EvalError) -> Self {
        let nok = Measurement::failed();
        Self {
            station,
            part_type: part_type.into(),
            overall: Status::Nok,
            id_diameter: Some(nok),
            od_diameter: Some(nok),
            thickness: Some(nok),
            concentricity: Some(nok),
            orifice_diameter: Some(nok),
            defect_result: Status::Nok,
            defects: Vec::new(),
            error: Some(VerdictError::from(err)),
            annotated_image: None,
        }
    }

    /// Overall pass/fail as the line controller sees it.
    pub fn passed(&self) -> bool {
        self.overall == Status::Ok
    }
}
