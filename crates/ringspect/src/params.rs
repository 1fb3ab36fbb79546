//! Tolerance-parameter model.
//!
//! The collaborator's recipe store hands the pipeline a flat string map
//! (`"id_min" -> "11.85"`, `"NA"` meaning disabled). Parsing happens exactly
//! once, here, at the boundary: the pipeline itself only ever sees typed
//! optional numerics, never raw strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Three-state tolerance outcome. `Na` is a real third state (tolerance not
/// applicable), distinct from both `Ok` and `Nok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Nok,
    Na,
}

impl Status {
    /// Fold two statuses into the stricter one (`Nok` dominates, `Na` is
    /// neutral).
    pub fn and(self, other: Status) -> Status {
        match (self, other) {
            (Status::Nok, _) | (_, Status::Nok) => Status::Nok,
            (Status::Na, s) | (s, Status::Na) => s,
            _ => Status::Ok,
        }
    }
}

/// An optional `[min, max]` bound pair.
///
/// Two distinct semantics, both needed by the pipeline:
/// - as a *filter* (candidate gating): one absent bound disables the filter
///   entirely, never partially — see [`Window::filter_accepts`];
/// - as a *tolerance* (measurement check): one absent bound makes the check
///   inapplicable — see [`Window::status`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Window {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Window {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Disabled window: accepts everything, checks nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// True when both bounds are present.
    pub fn is_active(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }

    /// Filter semantics: a window missing either bound accepts every value.
    pub fn filter_accepts(&self, value: f64) -> bool {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => value >= lo && value <= hi,
            _ => true,
        }
    }

    /// Tolerance semantics: a window missing either bound is inapplicable.
    pub fn status(&self, value: f64) -> Status {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => {
                if value >= lo && value <= hi {
                    Status::Ok
                } else {
                    Status::Nok
                }
            }
            _ => Status::Na,
        }
    }
}

/// Immutable per-cycle tolerance snapshot for one station.
///
/// Constructed once per inspection cycle by the recipe collaborator (via
/// [`ToleranceParameters::from_map`]) and passed down by shared reference;
/// the pipeline never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceParameters {
    /// Calibration factor: microns per pixel. mm = px * pixel_to_micron / 1000.
    pub pixel_to_micron: f64,

    /// Diameter tolerances (mm).
    pub id_diameter: Window,
    pub od_diameter: Window,
    pub thickness: Window,
    pub concentricity: Window,
    pub orifice_diameter: Window,

    /// Classifier area windows (px²).
    pub id_area: Window,
    pub od_area: Window,

    /// Optional classifier shape filters.
    pub circularity: Window,
    pub aspect_ratio: Window,

    /// Annular defect-zone half-widths (px); `None` leaves the zone to the
    /// part profile's default.
    pub id_zone_offset_px: Option<f64>,
    pub od_zone_offset_px: Option<f64>,

    /// Defect blob windows: burr = ID-outward zone, flash = OD-inward zone.
    pub burr_area: Window,
    pub burr_perimeter: Window,
    pub flash_area: Window,
    pub flash_perimeter: Window,
}

impl Default for ToleranceParameters {
    fn default() -> Self {
        Self {
            pixel_to_micron: 1.0,
            id_diameter: Window::disabled(),
            od_diameter: Window::disabled(),
            thickness: Window::disabled(),
            concentricity: Window::disabled(),
            orifice_diameter: Window::disabled(),
            id_area: Window::disabled(),
            od_area: Window::disabled(),
            circularity: Window::disabled(),
            aspect_ratio: Window::disabled(),
            id_zone_offset_px: None,
            od_zone_offset_px: None,
            burr_area: Window::disabled(),
            burr_perimeter: Window::disabled(),
            flash_area: Window::disabled(),
            flash_perimeter: Window::disabled(),
        }
    }
}

impl ToleranceParameters {
    /// Parse the collaborator's flat string map.
    ///
    /// Missing keys and the `"NA"` sentinel both mean "disabled". Any value
    /// that is present but not numeric fails the whole snapshot with
    /// [`EvalError::ParameterConversion`] naming the offending key.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EvalError> {
        let mut p = Self::default();
        p.pixel_to_micron = num(map, "pixel_to_micron")?.ok_or_else(|| {
            EvalError::ParameterConversion {
                key: "pixel_to_micron".into(),
                value: "<missing>".into(),
            }
        })?;

        p.id_diameter = window(map, "id_min", "id_max")?;
        p.od_diameter = window(map, "od_min", "od_max")?;
        p.thickness = window(map, "thickness_min", "thickness_max")?;
        p.concentricity = window(map, "concentricity_min", "concentricity_max")?;
        p.orifice_diameter = window(map, "orifice_min", "orifice_max")?;

        p.id_area = window(map, "id_area_min", "id_area_max")?;
        p.od_area = window(map, "od_area_min", "od_area_max")?;
        p.circularity = window(map, "circularity_min", "circularity_max")?;
        p.aspect_ratio = window(map, "aspect_min", "aspect_max")?;

        p.id_zone_offset_px = num(map, "id_ring_offset")?;
        p.od_zone_offset_px = num(map, "od_ring_offset")?;

        p.burr_area = window(map, "burr_area_min", "burr_area_max")?;
        p.burr_perimeter = window(map, "burr_perimeter_min", "burr_perimeter_max")?;
        p.flash_area = window(map, "flash_area_min", "flash_area_max")?;
        p.flash_perimeter = window(map, "flash_perimeter_min", "flash_perimeter_max")?;

        Ok(p)
    }

    /// mm per pixel.
    pub fn mm_per_px(&self) -> f64 {
        self.pixel_to_micron / 1000.0
    }
}

fn num(map: &BTreeMap<String, String>, key: &str) -> Result<Option<f64>, EvalError> {
    let Some(raw) = map.get(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| EvalError::ParameterConversion {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

fn window(map: &BTreeMap<String, String>, lo: &str, hi: &str) -> Result<Window, EvalError> {
    Ok(Window {
        min: num(map, lo)?,
        max: num(map, hi)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_numeric_and_na_values() {
        let m = map(&[
            ("pixel_to_micron", "10.0"),
            ("id_min", "0.9"),
            ("id_max", "1.1"),
            ("od_min", "NA"),
            ("od_max", "3.5"),
        ]);
        let p = ToleranceParameters::from_map(&m).unwrap();
        assert_eq!(p.id_diameter, Window::new(0.9, 1.1));
        assert_eq!(p.od_diameter.min, None);
        assert_eq!(p.od_diameter.max, Some(3.5));
        assert!((p.mm_per_px() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn non_numeric_value_names_the_key() {
        let m = map(&[("pixel_to_micron", "10"), ("id_min", "abc")]);
        let err = ToleranceParameters::from_map(&m).unwrap_err();
        match err {
            EvalError::ParameterConversion { key, value } => {
                assert_eq!(key, "id_min");
                assert_eq!(value, "abc");
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn missing_calibration_is_a_conversion_error() {
        let err = ToleranceParameters::from_map(&map(&[("id_min", "1")])).unwrap_err();
        assert_eq!(err.tag(), "parameter_conversion");
    }

    #[test]
    fn half_open_window_is_fully_disabled_as_filter() {
        let w = Window {
            min: Some(5.0),
            max: None,
        };
        // One NA bound disables the filter entirely, it never half-applies.
        assert!(w.filter_accepts(0.0));
        assert!(w.filter_accepts(1e9));
        assert!(!w.is_active());
    }

    #[test]
    fn half_open_window_yields_na_as_tolerance() {
        let w = Window {
            min: None,
            max: Some(2.0),
        };
        assert_eq!(w.status(1.0), Status::Na);
        assert_eq!(w.status(3.0), Status::Na);
    }

    #[test]
    fn tolerance_widening_is_monotone() {
        let value = 4.2;
        let tight = Window::new(4.3, 4.4);
        let wide = Window::new(4.0, 5.0);
        assert_eq!(tight.status(value), Status::Nok);
        assert_eq!(wide.status(value), Status::Ok);
        // Widening an already-passing window can never flip OK back to NOK.
        let wider = Window::new(3.0, 6.0);
        assert_eq!(wider.status(value), Status::Ok);
    }

    #[test]
    fn status_fold_prefers_nok() {
        assert_eq!(Status::Ok.and(Status::Nok), Status::Nok);
        assert_eq!(Status::Na.and(Status::Ok), Status::Ok);
        assert_eq!(Status::Na.and(Status::Na), Status::Na);
    }
}
