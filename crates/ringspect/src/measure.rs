//! Dimensional measurement over classified contours.
//!
//! Diameters come from the equivalent radius (`sqrt(area/π)`) sampled as 36
//! chords through the centroid — an idealized circle derived from area, not
//! the raw boundary distance. The chord fan is kept as rendering evidence.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::classify::{ContourSelection, ContourSlot};
use crate::contour::PartContour;
use crate::params::{Status, ToleranceParameters};
use crate::profile::PartProfile;

/// Number of radial chords sampled per diameter (every 10°).
pub const N_CHORDS: usize = 36;

/// One dimension's value (mm) and tolerance outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value_mm: f64,
    pub status: Status,
}

impl Measurement {
    fn checked(value_mm: f64, window: &crate::params::Window) -> Self {
        Self {
            value_mm,
            status: window.status(value_mm),
        }
    }

    /// Zero-valued NOK placeholder used when a required contour is missing.
    pub(crate) fn failed() -> Self {
        Self {
            value_mm: 0.0,
            status: Status::Nok,
        }
    }
}

/// Chord fan drawn by the renderer as measurement evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordFan {
    pub center: [f32; 2],
    pub chords: Vec<([f32; 2], [f32; 2])>,
}

/// All applicable measurements for one station invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSet {
    pub id_diameter: Option<Measurement>,
    pub od_diameter: Option<Measurement>,
    pub thickness: Option<Measurement>,
    pub concentricity: Option<Measurement>,
    pub orifice_diameter: Option<Measurement>,
    /// Required slots whose contour was never classified.
    pub missing: Vec<ContourSlot>,
    /// Rendering evidence: one fan per chord-sampled diameter.
    pub fans: Vec<ChordFan>,
    /// Rendering evidence: the thickness scan line, when measured.
    pub scan_line: Option<([f32; 2], [f32; 2])>,
}

/// Measure every dimension the part profile asks for.
pub fn measure(
    contours: &[PartContour],
    selection: ContourSelection,
    params: &ToleranceParameters,
    profile: &PartProfile,
) -> MeasurementSet {
    let mut set = MeasurementSet::default();
    let mm = params.mm_per_px();

    if profile.needs_id {
        match selection.id.map(|i| &contours[i]) {
            Some(c) => {
                let (d_px, fan) = chord_diameter(c);
                set.id_diameter = Some(Measurement::checked(d_px * mm, &params.id_diameter));
                set.fans.push(fan);
            }
            None => {
                set.id_diameter = Some(Measurement::failed());
                set.missing.push(ContourSlot::Id);
            }
        }
    }

    if profile.needs_od {
        match selection.od.map(|i| &contours[i]) {
            Some(c) => {
                let (d_px, fan) = chord_diameter(c);
                set.od_diameter = Some(Measurement::checked(d_px * mm, &params.od_diameter));
                set.fans.push(fan);
            }
            None => {
                set.od_diameter = Some(Measurement::failed());
                set.missing.push(ContourSlot::Od);
            }
        }
    }

    if profile.needs_thickness {
        let source = selection.od.or(selection.id).map(|i| &contours[i]);
        set.thickness = match source.and_then(thickness_px) {
            Some((t_px, line)) => {
                set.scan_line = Some(line);
                Some(Measurement::checked(t_px * mm, &params.thickness))
            }
            None => {
                tracing::warn!("thickness scan line found fewer than two crossings");
                Some(Measurement::failed())
            }
        };
    }

    if profile.needs_concentricity {
        set.concentricity = match (
            selection.id.map(|i| &contours[i]),
            selection.od.map(|i| &contours[i]),
        ) {
            (Some(id), Some(od)) => {
                let d_px = nalgebra::distance(&id.centroid(), &od.centroid());
                Some(Measurement::checked(d_px * mm, &params.concentricity))
            }
            _ => Some(Measurement::failed()),
        };
    }

    if profile.needs_orifice {
        match contours.get(profile.orifice_rank) {
            Some(c) => {
                let (d_px, fan) = chord_diameter(c);
                set.orifice_diameter =
                    Some(Measurement::checked(d_px * mm, &params.orifice_diameter));
                set.fans.push(fan);
            }
            None => {
                set.orifice_diameter = Some(Measurement::failed());
                set.missing.push(ContourSlot::Orifice);
            }
        }
    }

    set
}

/// Diameter as the mean of [`N_CHORDS`] chords through the centroid at the
/// equivalent radius. All chords share that radius, so the mean equals
/// `2 * r_eq`; the fan is what makes the measurement auditable on the
/// rendered image.
fn chord_diameter(contour: &PartContour) -> (f64, ChordFan) {
    let r = contour.equivalent_radius();
    let c = contour.centroid();
    let mut chords = Vec::with_capacity(N_CHORDS);
    let mut sum = 0.0;
    for k in 0..N_CHORDS {
        let theta = (k as f64) * 2.0 * std::f64::consts::PI / N_CHORDS as f64;
        let (dx, dy) = (r * theta.cos(), r * theta.sin());
        let a = [(c.x - dx) as f32, (c.y - dy) as f32];
        let b = [(c.x + dx) as f32, (c.y + dy) as f32];
        sum += 2.0 * r;
        chords.push((a, b));
    }
    (
        sum / N_CHORDS as f64,
        ChordFan {
            center: [c.x as f32, c.y as f32],
            chords,
        },
    )
}

/// Thickness from a single vertical scan line at the bounding-box horizontal
/// center: boundary crossings sorted top-to-bottom, Euclidean distance of
/// the first two. Exactly one line; concave boundaries with more than two
/// crossings only contribute their first two.
fn thickness_px(contour: &PartContour) -> Option<(f64, ([f32; 2], [f32; 2]))> {
    let bb = contour.bounding_box();
    let cx = bb.left() + bb.width() as i32 / 2;
    let mut crossings: Vec<i32> = contour
        .points()
        .iter()
        .filter(|p| p.x == cx)
        .map(|p| p.y)
        .collect();
    crossings.sort_unstable();
    crossings.dedup();
    if crossings.len() < 2 {
        return None;
    }
    let (y0, y1) = (crossings[0], crossings[1]);
    let p0 = Point2::new(cx as f64, y0 as f64);
    let p1 = Point2::new(cx as f64, y1 as f64);
    Some((
        nalgebra::distance(&p0, &p1),
        ([cx as f32, y0 as f32], [cx as f32, y1 as f32]),
    ))
}
