//! ringspect — per-station geometric measurement and defect classification
//! for small ring-shaped parts (pistons, washers, O-rings, seals).
//!
//! The pipeline stages per station are:
//!
//! 1. **Preprocess** – grayscale, binary threshold, contour extraction with
//!    ROI gating and area-descending sort.
//! 2. **Classify** – ID/OD contour selection by area window plus optional
//!    circularity / aspect-ratio filters, or a positional rank policy.
//! 3. **Measure** – equivalent-radius chord diameters, single-line
//!    thickness, centroid concentricity, rank-selected orifice, all checked
//!    against per-recipe tolerance windows.
//! 4. **Defects** – annular burr/flash zones around the classified
//!    boundaries, Canny edges, dual-criterion (area AND perimeter) blob
//!    classification.
//! 5. **Render** – annotated evidence image with an idempotent per-station
//!    filename and a guaranteed fallback write.
//!
//! Stations are independent and stateless between invocations; the only
//! shared input is the immutable [`ToleranceParameters`] snapshot taken at
//! cycle start, so the four stations may run on parallel threads without
//! coordination.
//!
//! # Public API
//! [`Station::evaluate`] is the boundary: frame in, [`Verdict`] out, always.

mod classify;
mod contour;
mod defect;
mod error;
mod measure;
mod params;
mod preprocess;
mod profile;
mod render;
mod station;
#[cfg(test)]
mod test_utils;
mod verdict;

pub use classify::{classify, ContourSelection, ContourSlot, SelectionPolicy, ShapeFilters};
pub use contour::PartContour;
pub use defect::{analyze, BlobBox, DefectFinding, DefectZone};
pub use error::EvalError;
pub use measure::{measure, ChordFan, Measurement, MeasurementSet, N_CHORDS};
pub use params::{Status, ToleranceParameters, Window};
pub use preprocess::{
    preprocess, Preprocessed, PreprocessConfig, RetrievalMode, RoiRect, ThresholdKind,
    ThresholdPolarity,
};
pub use profile::{DefectPosition, PartProfile, ZoneSpec};
pub use render::{persist, render, RenderConfig};
pub use station::{Station, StationConfig};
pub use verdict::{Verdict, VerdictError};
