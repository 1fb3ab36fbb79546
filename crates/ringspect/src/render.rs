//! Annotated-evidence rendering and idempotent persistence.
//!
//! Draws on a private copy of the capture buffer, crops to a fixed window
//! around the part, and guarantees that *some* image exists at the expected
//! path: if the annotated write fails, the unannotated frame is written with
//! an explicit BMP encoder instead.

use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{
    draw_cross_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::classify::ContourSelection;
use crate::contour::PartContour;
use crate::defect::DefectFinding;
use crate::error::EvalError;
use crate::measure::MeasurementSet;
use crate::params::Status;

const OD_COLOR: Rgb<u8> = Rgb([52, 168, 83]);
const ID_COLOR: Rgb<u8> = Rgb([66, 133, 244]);
const CHORD_COLOR: Rgb<u8> = Rgb([200, 200, 60]);
const DEFECT_COLOR: Rgb<u8> = Rgb([234, 67, 53]);
const BANNER_OK: Rgb<u8> = Rgb([40, 180, 70]);
const BANNER_NOK: Rgb<u8> = Rgb([210, 40, 40]);
const BANNER_NA: Rgb<u8> = Rgb([120, 120, 120]);

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Side of the fixed square crop around the part; clamped to the frame.
    pub crop_size: u32,
    /// Minimum drawn size of a defect highlight box.
    pub highlight_px: u32,
    /// Height of the status banner bar.
    pub banner_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            crop_size: 360,
            highlight_px: 24,
            banner_height: 12,
        }
    }
}

/// Draw all overlays and crop. Never exceeds the source dimensions.
pub fn render(
    frame: &RgbImage,
    contours: &[PartContour],
    selection: ContourSelection,
    measurements: &MeasurementSet,
    findings: &[DefectFinding],
    overall: Status,
    config: &RenderConfig,
) -> RgbImage {
    let mut canvas = frame.clone();

    if let Some(i) = selection.od {
        draw_contour(&mut canvas, &contours[i], OD_COLOR);
    }
    if let Some(i) = selection.id {
        draw_contour(&mut canvas, &contours[i], ID_COLOR);
    }

    for fan in &measurements.fans {
        for (a, b) in &fan.chords {
            draw_line_segment_mut(&mut canvas, (a[0], a[1]), (b[0], b[1]), CHORD_COLOR);
        }
        draw_cross_mut(
            &mut canvas,
            DEFECT_COLOR,
            fan.center[0].round() as i32,
            fan.center[1].round() as i32,
        );
    }
    if let Some((a, b)) = measurements.scan_line {
        draw_line_segment_mut(&mut canvas, (a[0], a[1]), (b[0], b[1]), ID_COLOR);
    }

    for finding in findings {
        for blob in &finding.blobs {
            let rect = highlight_rect(blob, config.highlight_px, frame.width(), frame.height());
            draw_hollow_rect_mut(&mut canvas, rect, DEFECT_COLOR);
        }
    }

    let mut out = crop_around_part(&canvas, contours, selection, config.crop_size);

    let banner_w = out.width();
    let banner_h = config.banner_height.min(out.height());
    if banner_h > 0 {
        let color = match overall {
            Status::Ok => BANNER_OK,
            Status::Nok => BANNER_NOK,
            Status::Na => BANNER_NA,
        };
        draw_filled_rect_mut(&mut out, Rect::at(0, 0).of_size(banner_w, banner_h), color);
    }
    out
}

/// Write the annotated image; on failure write the unannotated frame as BMP
/// at the same path. `Err` only when both writes fail.
pub fn persist(
    annotated: &RgbImage,
    fallback: &RgbImage,
    path: &Path,
) -> Result<PathBuf, EvalError> {
    match annotated.save(path) {
        Ok(()) => Ok(path.to_path_buf()),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "annotated save failed, writing fallback");
            fallback
                .save_with_format(path, ImageFormat::Bmp)
                .map(|()| path.to_path_buf())
                .map_err(|e| EvalError::Render(e.to_string()))
        }
    }
}

fn draw_contour(canvas: &mut RgbImage, contour: &PartContour, color: Rgb<u8>) {
    let pts = contour.points();
    for w in pts.windows(2) {
        draw_line_segment_mut(
            canvas,
            (w[0].x as f32, w[0].y as f32),
            (w[1].x as f32, w[1].y as f32),
            color,
        );
    }
    if let (Some(first), Some(last)) = (pts.first(), pts.last()) {
        draw_line_segment_mut(
            canvas,
            (last.x as f32, last.y as f32),
            (first.x as f32, first.y as f32),
            color,
        );
    }
}

fn highlight_rect(blob: &crate::defect::BlobBox, min_side: u32, w: u32, h: u32) -> Rect {
    let side_w = blob.width.max(min_side);
    let side_h = blob.height.max(min_side);
    let cx = blob.x + blob.width as i32 / 2;
    let cy = blob.y + blob.height as i32 / 2;
    let x = (cx - side_w as i32 / 2).clamp(0, (w.saturating_sub(side_w)) as i32);
    let y = (cy - side_h as i32 / 2).clamp(0, (h.saturating_sub(side_h)) as i32);
    Rect::at(x, y).of_size(side_w.min(w).max(1), side_h.min(h).max(1))
}

/// Fixed-size square crop centered on the union bounding box of the
/// classified contours, clamped inside the frame.
fn crop_around_part(
    canvas: &RgbImage,
    contours: &[PartContour],
    selection: ContourSelection,
    crop_size: u32,
) -> RgbImage {
    let (w, h) = canvas.dimensions();
    let side = crop_size.min(w).min(h).max(1);

    let mut boxes = Vec::new();
    if let Some(i) = selection.od {
        boxes.push(contours[i].bounding_box());
    }
    if let Some(i) = selection.id {
        boxes.push(contours[i].bounding_box());
    }
    let (cx, cy) = if boxes.is_empty() {
        (w as i64 / 2, h as i64 / 2)
    } else {
        let left = boxes.iter().map(|b| b.left() as i64).min().unwrap();
        let top = boxes.iter().map(|b| b.top() as i64).min().unwrap();
        let right = boxes
            .iter()
            .map(|b| b.left() as i64 + b.width() as i64)
            .max()
            .unwrap();
        let bottom = boxes
            .iter()
            .map(|b| b.top() as i64 + b.height() as i64)
            .max()
            .unwrap();
        ((left + right) / 2, (top + bottom) / 2)
    };

    let x0 = (cx - side as i64 / 2).clamp(0, (w - side) as i64) as u32;
    let y0 = (cy - side as i64 / 2).clamp(0, (h - side) as i64) as u32;
    image::imageops::crop_imm(canvas, x0, y0, side, side).to_image()
}
