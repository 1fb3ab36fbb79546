//! Annular burr/flash defect detection around classified boundaries.
//!
//! Each enabled zone is a thin annulus hugging one nominal boundary: the
//! set-difference between the filled reference contour and a filled circle
//! offset from its equivalent radius. Canny edges restricted to that annulus
//! are blobbed; a blob is a defect iff BOTH its area and its perimeter fall
//! inside the configured windows.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::classify::ContourSelection;
use crate::contour::PartContour;
use crate::params::{Status, ToleranceParameters, Window};
use crate::profile::{DefectPosition, PartProfile, ZoneSpec};

/// Fixed dual Canny thresholds used for all stations.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Which annulus a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectZone {
    /// Burr zone: from the ID boundary outward into ring material.
    IdOutward,
    /// Flash zone: from the OD boundary inward into ring material.
    OdInward,
}

/// Axis-aligned blob bounding box, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One zone's defect verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectFinding {
    pub zone: DefectZone,
    pub result: Status,
    pub position: DefectPosition,
    /// Failure reason when the zone could not be analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Bounding boxes of the contributing blobs.
    pub blobs: Vec<BlobBox>,
}

impl DefectFinding {
    fn clean(zone: DefectZone) -> Self {
        Self {
            zone,
            result: Status::Ok,
            position: DefectPosition::None,
            reason: None,
            blobs: Vec::new(),
        }
    }

    /// A zone whose reference contour was never classified fails the check
    /// outright: an absent expected boundary usually means a missing or
    /// misplaced part.
    fn contour_not_found(zone: DefectZone, position: DefectPosition) -> Self {
        Self {
            zone,
            result: Status::Nok,
            position,
            reason: Some("contour not found".to_string()),
            blobs: Vec::new(),
        }
    }
}

/// Analyze every zone the part profile enables.
///
/// Parts with no enabled zone return an empty list before any image analysis
/// runs; the station folds that into an NA defect verdict.
pub fn analyze(
    gray: &GrayImage,
    contours: &[PartContour],
    selection: ContourSelection,
    params: &ToleranceParameters,
    profile: &PartProfile,
) -> Vec<DefectFinding> {
    if profile.id_zone.is_none() && profile.od_zone.is_none() {
        return Vec::new();
    }

    let edges = imageproc::edges::canny(gray, CANNY_LOW, CANNY_HIGH);
    let mut findings = Vec::new();

    if let Some(spec) = &profile.id_zone {
        let offset = params.id_zone_offset_px.unwrap_or(spec.offset_px);
        findings.push(analyze_zone(
            &edges,
            DefectZone::IdOutward,
            spec,
            selection.id.map(|i| &contours[i]),
            offset,
            &params.burr_area,
            &params.burr_perimeter,
        ));
    }

    if let Some(spec) = &profile.od_zone {
        let offset = params.od_zone_offset_px.unwrap_or(spec.offset_px);
        findings.push(analyze_zone(
            &edges,
            DefectZone::OdInward,
            spec,
            selection.od.map(|i| &contours[i]),
            offset,
            &params.flash_area,
            &params.flash_perimeter,
        ));
    }

    findings
}

fn analyze_zone(
    edges: &GrayImage,
    zone: DefectZone,
    spec: &ZoneSpec,
    reference: Option<&PartContour>,
    offset_px: f64,
    area_window: &Window,
    perimeter_window: &Window,
) -> DefectFinding {
    let Some(reference) = reference else {
        return DefectFinding::contour_not_found(zone, spec.position);
    };
    let Some(fill) = filled_contour_mask(edges.width(), edges.height(), reference) else {
        return DefectFinding::contour_not_found(zone, spec.position);
    };

    let c = reference.centroid();
    let r_eq = reference.equivalent_radius();
    let circle_radius = match zone {
        DefectZone::IdOutward => r_eq + offset_px,
        DefectZone::OdInward => (r_eq - offset_px).max(1.0),
    };
    let mut circle = GrayImage::new(edges.width(), edges.height());
    draw_filled_circle_mut(
        &mut circle,
        (c.x.round() as i32, c.y.round() as i32),
        circle_radius.round() as i32,
        Luma([255u8]),
    );

    // Annulus = set-difference of the two masks, then AND with the edges.
    let mut masked = GrayImage::new(edges.width(), edges.height());
    for (x, y, p) in edges.enumerate_pixels() {
        if p[0] == 0 {
            continue;
        }
        let in_fill = fill.get_pixel(x, y)[0] > 0;
        let in_circle = circle.get_pixel(x, y)[0] > 0;
        let in_zone = match zone {
            DefectZone::IdOutward => in_circle && !in_fill,
            DefectZone::OdInward => in_fill && !in_circle,
        };
        if in_zone {
            masked.put_pixel(x, y, Luma([255]));
        }
    }

    let mut blobs = Vec::new();
    for blob in find_contours::<i32>(&masked) {
        if blob.border_type != BorderType::Outer {
            continue;
        }
        let blob = PartContour::new(blob.points, blob.border_type);
        // Dual criterion: area AND perimeter must both sit in-window.
        if area_window.filter_accepts(blob.area())
            && perimeter_window.filter_accepts(blob.perimeter())
        {
            let bb = blob.bounding_box();
            blobs.push(BlobBox {
                x: bb.left(),
                y: bb.top(),
                width: bb.width(),
                height: bb.height(),
            });
        }
    }

    if blobs.is_empty() {
        DefectFinding::clean(zone)
    } else {
        tracing::debug!(?zone, n_blobs = blobs.len(), "defect blobs found");
        DefectFinding {
            zone,
            result: Status::Nok,
            position: spec.position,
            reason: None,
            blobs,
        }
    }
}

/// Filled mask of the reference contour. `None` for degenerate boundaries.
fn filled_contour_mask(w: u32, h: u32, contour: &PartContour) -> Option<GrayImage> {
    let mut pts: Vec<Point<i32>> = contour.points().to_vec();
    if pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return None;
    }
    let mut mask = GrayImage::new(w, h);
    draw_polygon_mut(&mut mask, &pts, Luma([255u8]));
    Some(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, SelectionPolicy};
    use crate::preprocess::{preprocess, PreprocessConfig};
    use crate::test_utils::{draw_washer_gray, rgb_from_gray, stamp_disk};

    // Thin nominal-boundary edge fragments can never satisfy both windows:
    // a blob with perimeter <= 45 and area >= 60 has to be compact.
    const CLEAN_AREA: Window = Window {
        min: Some(60.0),
        max: Some(200.0),
    };
    const CLEAN_PERIM: Window = Window {
        min: Some(15.0),
        max: Some(45.0),
    };

    fn pipeline(gray: image::GrayImage) -> (crate::preprocess::Preprocessed, ContourSelection) {
        let frame = rgb_from_gray(&gray);
        let pre = preprocess(&frame, &PreprocessConfig::default()).unwrap();
        let sel = classify(
            &pre.contours,
            &SelectionPolicy::Positional {
                od_rank: Some(0),
                id_rank: Some(1),
            },
            &ToleranceParameters::default(),
        );
        (pre, sel)
    }

    fn zone_params(burr: (Window, Window), flash: (Window, Window)) -> ToleranceParameters {
        ToleranceParameters {
            burr_area: burr.0,
            burr_perimeter: burr.1,
            flash_area: flash.0,
            flash_perimeter: flash.1,
            // Wide annuli so test blobs sit clear of the nominal edges.
            id_zone_offset_px: Some(20.0),
            od_zone_offset_px: Some(20.0),
            ..Default::default()
        }
    }

    #[test]
    fn clean_washer_has_no_defects() {
        let gray = draw_washer_gray(400, 400, [200.0, 200.0], 150.0, 50.0, 230, 20);
        let (pre, sel) = pipeline(gray);
        let params = zone_params((CLEAN_AREA, CLEAN_PERIM), (CLEAN_AREA, CLEAN_PERIM));
        let findings = analyze(&pre.gray, &pre.contours, sel, &params, &PartProfile::default());
        assert_eq!(findings.len(), 2);
        for f in &findings {
            assert_eq!(f.result, Status::Ok, "zone {:?}: {:?}", f.zone, f.blobs);
            assert_eq!(f.position, DefectPosition::None);
        }
    }

    #[test]
    fn dark_blob_in_burr_zone_is_a_defect() {
        let mut gray = draw_washer_gray(400, 400, [200.0, 200.0], 150.0, 50.0, 230, 20);
        // Dot in ring material just outside the ID boundary (r ~ 60).
        stamp_disk(&mut gray, [260.0, 200.0], 4.0, 20);
        let (pre, sel) = pipeline(gray);
        let params = zone_params(
            (Window::new(25.0, 300.0), Window::new(12.0, 80.0)),
            (CLEAN_AREA, CLEAN_PERIM),
        );
        let findings = analyze(&pre.gray, &pre.contours, sel, &params, &PartProfile::default());
        let burr = findings
            .iter()
            .find(|f| f.zone == DefectZone::IdOutward)
            .unwrap();
        assert_eq!(burr.result, Status::Nok);
        assert_eq!(burr.position, DefectPosition::Id);
        assert!(!burr.blobs.is_empty());
    }

    #[test]
    fn blobs_in_both_zones_are_both_reported() {
        let mut gray = draw_washer_gray(400, 400, [200.0, 200.0], 150.0, 50.0, 230, 20);
        stamp_disk(&mut gray, [260.0, 200.0], 4.0, 20); // burr zone, r ~ 60
        stamp_disk(&mut gray, [200.0, 60.0], 4.0, 20); // flash zone, r ~ 140
        let (pre, sel) = pipeline(gray);
        let wide = (Window::new(25.0, 300.0), Window::new(12.0, 80.0));
        let params = zone_params(wide, wide);
        let findings = analyze(&pre.gray, &pre.contours, sel, &params, &PartProfile::default());
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.result == Status::Nok));
    }

    /// A blob failing either criterion alone is not a defect.
    #[test]
    fn blob_failing_perimeter_window_alone_is_not_a_defect() {
        let mut gray = draw_washer_gray(400, 400, [200.0, 200.0], 150.0, 50.0, 230, 20);
        stamp_disk(&mut gray, [260.0, 200.0], 4.0, 20);
        let (pre, sel) = pipeline(gray);
        // Area window accepts the blob; a perimeter window this low cannot
        // (no blob of area >= 25 fits a perimeter of 5).
        let params = zone_params(
            (Window::new(25.0, 300.0), Window::new(1.0, 5.0)),
            (CLEAN_AREA, CLEAN_PERIM),
        );
        let findings = analyze(&pre.gray, &pre.contours, sel, &params, &PartProfile::default());
        let burr = findings
            .iter()
            .find(|f| f.zone == DefectZone::IdOutward)
            .unwrap();
        assert_eq!(burr.result, Status::Ok);
    }

    #[test]
    fn missing_reference_contour_fails_the_zone_explicitly() {
        let gray = draw_washer_gray(400, 400, [200.0, 200.0], 150.0, 50.0, 230, 20);
        let (pre, _) = pipeline(gray);
        let sel = ContourSelection {
            id: None,
            od: Some(0),
        };
        let params = zone_params((CLEAN_AREA, CLEAN_PERIM), (CLEAN_AREA, CLEAN_PERIM));
        let findings = analyze(&pre.gray, &pre.contours, sel, &params, &PartProfile::default());
        let burr = findings
            .iter()
            .find(|f| f.zone == DefectZone::IdOutward)
            .unwrap();
        assert_eq!(burr.result, Status::Nok);
        assert_eq!(burr.reason.as_deref(), Some("contour not found"));
        let flash = findings
            .iter()
            .find(|f| f.zone == DefectZone::OdInward)
            .unwrap();
        assert_eq!(flash.result, Status::Ok);
    }

    #[test]
    fn part_without_zones_short_circuits() {
        let gray = draw_washer_gray(100, 100, [50.0, 50.0], 30.0, 10.0, 230, 20);
        let (pre, sel) = pipeline(gray);
        let profile = PartProfile {
            id_zone: None,
            od_zone: None,
            ..Default::default()
        };
        let findings = analyze(
            &pre.gray,
            &pre.contours,
            sel,
            &ToleranceParameters::default(),
            &profile,
        );
        assert!(findings.is_empty());
    }
}
