//! Station boundary: one synchronous `evaluate` per captured frame.
//!
//! The boundary is infallible by contract: whatever happens inside the
//! pipeline, the caller gets a complete [`Verdict`] — the line controller
//! gates conveyor motion on it every cycle and must never be left without an
//! answer.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, SelectionPolicy};
use crate::defect::analyze;
use crate::error::EvalError;
use crate::measure::measure;
use crate::params::{Status, ToleranceParameters};
use crate::preprocess::{preprocess, PreprocessConfig};
use crate::profile::PartProfile;
use crate::render::{persist, render, RenderConfig};
use crate::verdict::{Verdict, VerdictError};

/// Static per-station configuration (recipe-independent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Station index, 1-based to match camera naming.
    pub index: u8,
    pub preprocess: PreprocessConfig,
    pub selection: SelectionPolicy,
    pub render: RenderConfig,
    /// Directory holding the deterministic "latest result" image.
    pub output_dir: PathBuf,
}

impl StationConfig {
    pub fn new(index: u8, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            preprocess: PreprocessConfig::default(),
            selection: SelectionPolicy::default(),
            render: RenderConfig::default(),
            output_dir: output_dir.into(),
        }
    }

    /// One fixed filename per station; each cycle overwrites the previous
    /// result. Timestamped backups are the collaborator's concern.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("cam{}_bmp.bmp", self.index))
    }
}

/// One inspection station's measurement pipeline.
#[derive(Debug, Clone)]
pub struct Station {
    config: StationConfig,
}

impl Station {
    pub fn new(config: StationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Evaluate one frame against an already-parsed tolerance snapshot.
    ///
    /// Excluded part types short-circuit to a uniform NA verdict before any
    /// vision code runs. Internal panics are caught here and converted to a
    /// NOK verdict carrying the panic message.
    pub fn evaluate(
        &self,
        frame: &RgbImage,
        params: &ToleranceParameters,
        profile: &PartProfile,
    ) -> Verdict {
        if profile.excluded {
            tracing::debug!(
                station = self.config.index,
                part_type = %profile.part_type,
                "part excluded, returning NA verdict"
            );
            return Verdict::excluded(self.config.index, profile.part_type.clone());
        }

        let result = catch_unwind(AssertUnwindSafe(|| {
            self.evaluate_inner(frame, params, profile)
        }));
        match result {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(err)) => {
                tracing::warn!(station = self.config.index, %err, "evaluation failed");
                Verdict::failure(self.config.index, profile.part_type.clone(), &err)
            }
            Err(payload) => {
                let msg = panic_message(payload);
                tracing::error!(station = self.config.index, %msg, "evaluation panicked");
                Verdict::failure(
                    self.config.index,
                    profile.part_type.clone(),
                    &EvalError::Unexpected(msg),
                )
            }
        }
    }

    /// Evaluate against the collaborator's raw string parameter map. Parse
    /// failures yield the `parameter_conversion` fallback verdict.
    pub fn evaluate_raw(
        &self,
        frame: &RgbImage,
        raw_params: &BTreeMap<String, String>,
        profile: &PartProfile,
    ) -> Verdict {
        match ToleranceParameters::from_map(raw_params) {
            Ok(params) => self.evaluate(frame, &params, profile),
            Err(err) => {
                tracing::warn!(station = self.config.index, %err, "recipe parse failed");
                Verdict::failure(self.config.index, profile.part_type.clone(), &err)
            }
        }
    }

    fn evaluate_inner(
        &self,
        frame: &RgbImage,
        params: &ToleranceParameters,
        profile: &PartProfile,
    ) -> Result<Verdict, EvalError> {
        let pre = preprocess(frame, &self.config.preprocess)?;

        let needed = profile.min_contours();
        if pre.contours.len() < needed {
            return Err(EvalError::NotEnoughContours {
                needed,
                found: pre.contours.len(),
            });
        }

        let selection = classify(&pre.contours, &self.config.selection, params);
        let measurements = measure(&pre.contours, selection, params, profile);
        let findings = analyze(&pre.gray, &pre.contours, selection, params, profile);

        let defect_result = findings
            .iter()
            .fold(Status::Na, |acc, f| acc.and(f.result));

        let mut overall = [
            measurements.id_diameter,
            measurements.od_diameter,
            measurements.thickness,
            measurements.concentricity,
            measurements.orifice_diameter,
        ]
        .iter()
        .flatten()
        .fold(Status::Na, |acc, m| acc.and(m.status));
        overall = overall.and(defect_result);

        let mut error: Option<VerdictError> = None;
        if !measurements.missing.is_empty() {
            let err = EvalError::ContourNotFound {
                slots: measurements.missing.clone(),
            };
            tracing::debug!(station = self.config.index, %err, "required slots unmatched");
            error = Some(VerdictError::from(&err));
        }

        let annotated = render(
            frame,
            &pre.contours,
            selection,
            &measurements,
            &findings,
            overall,
            &self.config.render,
        );
        let annotated_image = match persist(&annotated, frame, &self.config.output_path()) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(station = self.config.index, %err, "evidence write failed");
                error.get_or_insert_with(|| VerdictError::from(&err));
                None
            }
        };

        Ok(Verdict {
            station: self.config.index,
            part_type: profile.part_type.clone(),
            overall,
            id_diameter: measurements.id_diameter,
            od_diameter: measurements.od_diameter,
            thickness: measurements.thickness,
            concentricity: measurements.concentricity,
            orifice_diameter: measurements.orifice_diameter,
            defect_result,
            defects: findings,
            error,
            annotated_image,
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
