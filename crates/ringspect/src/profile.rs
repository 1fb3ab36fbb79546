//! Data-driven part capability table.
//!
//! Which measurements and defect zones apply to a part type is recipe data
//! loaded by the collaborator, never an if/elif chain on part names inside
//! the pipeline. O-ring-style parts simply ship a profile without an OD
//! slot; NRV-seal-style parts ship one without an ID slot.

use serde::{Deserialize, Serialize};

/// Position label attached to a defect finding, matching the line
/// controller's historical label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefectPosition {
    None,
    #[serde(rename = "ID")]
    Id,
    #[serde(rename = "OD")]
    Od,
    #[serde(rename = "FID")]
    Fid,
    #[serde(rename = "FOD")]
    Fod,
}

/// One annular defect-analysis zone tied to a classified boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneSpec {
    /// Annulus half-width in pixels; grows outward from the ID boundary,
    /// shrinks inward from the OD boundary. A tolerance-snapshot override
    /// (`id_ring_offset`/`od_ring_offset`) takes precedence when present.
    pub offset_px: f64,
    /// Label reported when this zone produces a finding.
    pub position: DefectPosition,
}

/// Capability table for one (part type, station) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartProfile {
    pub part_type: String,

    pub needs_id: bool,
    pub needs_od: bool,
    pub needs_thickness: bool,
    pub needs_concentricity: bool,
    pub needs_orifice: bool,

    /// Area rank of the orifice contour (positional policy; see DESIGN.md).
    pub orifice_rank: usize,

    /// ID-outward burr zone; `None` means no burr check for this part.
    pub id_zone: Option<ZoneSpec>,
    /// OD-inward flash zone; `None` means no flash check for this part.
    pub od_zone: Option<ZoneSpec>,

    /// Part is not inspected at this station at all: the station returns a
    /// uniform NA verdict without running any vision code.
    pub excluded: bool,
}

impl Default for PartProfile {
    fn default() -> Self {
        Self {
            part_type: "washer".to_string(),
            needs_id: true,
            needs_od: true,
            needs_thickness: false,
            needs_concentricity: true,
            needs_orifice: false,
            orifice_rank: 2,
            id_zone: Some(ZoneSpec {
                offset_px: 12.0,
                position: DefectPosition::Id,
            }),
            od_zone: Some(ZoneSpec {
                offset_px: 12.0,
                position: DefectPosition::Od,
            }),
            excluded: false,
        }
    }
}

impl PartProfile {
    /// Profile for a part type the station does not inspect.
    pub fn excluded(part_type: impl Into<String>) -> Self {
        Self {
            part_type: part_type.into(),
            needs_id: false,
            needs_od: false,
            needs_thickness: false,
            needs_concentricity: false,
            needs_orifice: false,
            id_zone: None,
            od_zone: None,
            excluded: true,
            ..Default::default()
        }
    }

    /// Minimum number of contours the measurement set needs before the
    /// station can do anything useful.
    pub fn min_contours(&self) -> usize {
        let mut slots = 0;
        if self.needs_id {
            slots += 1;
        }
        if self.needs_od {
            slots += 1;
        }
        if self.needs_orifice {
            slots = slots.max(self.orifice_rank + 1);
        }
        slots.max(1)
    }
}
