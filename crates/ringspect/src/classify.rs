//! ID/OD contour classification.
//!
//! Pure function of the candidate list and the configured windows: the same
//! inputs always select the same contours. Empty slots are a valid
//! "part absent / misformed" signal, never an error here.

use serde::{Deserialize, Serialize};

use crate::contour::PartContour;
use crate::params::{ToleranceParameters, Window};

/// Which classified slot a consumer is talking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourSlot {
    Id,
    Od,
    Orifice,
}

impl std::fmt::Display for ContourSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id => write!(f, "ID"),
            Self::Od => write!(f, "OD"),
            Self::Orifice => write!(f, "orifice"),
        }
    }
}

/// Optional shape gates layered over the area window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeFilters {
    /// `4πA/P²` window; active only when both bounds are present.
    pub circularity: Window,
    /// Bounding-box `w/h` window; active only when both bounds are present.
    pub aspect_ratio: Window,
}

impl ShapeFilters {
    fn accepts(&self, c: &PartContour) -> bool {
        if self.circularity.is_active() {
            // Zero-perimeter degenerates are rejected while the filter is on.
            match c.circularity() {
                Some(v) if self.circularity.filter_accepts(v) => {}
                _ => return false,
            }
        }
        if self.aspect_ratio.is_active() {
            match c.aspect_ratio() {
                Some(v) if self.aspect_ratio.filter_accepts(v) => {}
                _ => return false,
            }
        }
        true
    }
}

/// How one station picks its ID/OD contours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Scan area-descending candidates; first one inside the slot's area
    /// window (and past the shape filters) wins. Area windows come from the
    /// tolerance snapshot (`id_area`/`od_area`); shape filters are shared.
    AreaShape { shape: ShapeFilters },
    /// Positional fallback for parts without a distinctive shape signature:
    /// pick contours by area rank. Either rank may be absent when the part
    /// intentionally lacks that side.
    Positional {
        od_rank: Option<usize>,
        id_rank: Option<usize>,
    },
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::AreaShape {
            shape: ShapeFilters::default(),
        }
    }
}

/// Classification result: indices into the area-sorted contour list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContourSelection {
    pub id: Option<usize>,
    pub od: Option<usize>,
}

/// Select the ID and OD contours from an area-descending candidate list.
pub fn classify(
    contours: &[PartContour],
    policy: &SelectionPolicy,
    params: &ToleranceParameters,
) -> ContourSelection {
    match policy {
        SelectionPolicy::AreaShape { shape } => {
            let od = first_match(contours, &params.od_area, shape);
            let id = first_match(contours, &params.id_area, shape);
            ContourSelection { id, od }
        }
        SelectionPolicy::Positional { od_rank, id_rank } => ContourSelection {
            id: (*id_rank).filter(|&r| r < contours.len()),
            od: (*od_rank).filter(|&r| r < contours.len()),
        },
    }
}

fn first_match(
    contours: &[PartContour],
    area: &Window,
    shape: &ShapeFilters,
) -> Option<usize> {
    contours
        .iter()
        .position(|c| area.filter_accepts(c.area()) && shape.accepts(c))
}
