//! Frame preprocessing: grayscale, binary threshold, contour extraction.
//!
//! Output contours are sorted by area descending; an empty list is an
//! ordinary "no part present" outcome, not an error.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use serde::{Deserialize, Serialize};

use crate::contour::PartContour;
use crate::error::EvalError;

/// Binary threshold rule applied to the grayscale frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// `pixel > value` is foreground.
    Fixed { value: u8 },
    /// `min <= pixel <= max` is foreground; bounds are clamped to `[0,255]`
    /// at application time so recipes may carry out-of-range software values.
    Band { min: i32, max: i32 },
}

/// Direct keeps the threshold's foreground; Inverse flips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolarity {
    Direct,
    Inverse,
}

/// Contour retrieval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Keep the full hierarchy (outer borders and hole borders).
    Tree,
    /// Keep top-level outer borders only; holes and anything nested inside
    /// them are dropped.
    External,
}

/// Fixed rectangle a contour's bounding box must sit inside to survive.
///
/// Rejects conveyor/background clutter outside the expected part-presentation
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RoiRect {
    fn contains_box(&self, bb: imageproc::rect::Rect) -> bool {
        bb.left() >= self.x
            && bb.top() >= self.y
            && bb.left() + bb.width() as i32 <= self.x + self.width as i32
            && bb.top() + bb.height() as i32 <= self.y + self.height as i32
    }
}

/// Per-station preprocessing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub threshold: ThresholdKind,
    pub polarity: ThresholdPolarity,
    pub retrieval: RetrievalMode,
    /// Optional part-presentation gate.
    pub roi: Option<RoiRect>,
    /// Speckle pre-filter: contours below this area are dropped before sort.
    pub min_area_px: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdKind::Fixed { value: 127 },
            polarity: ThresholdPolarity::Direct,
            retrieval: RetrievalMode::Tree,
            roi: None,
            min_area_px: 4.0,
        }
    }
}

/// Preprocessing output consumed by the classifier and the defect analyzer.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Surviving contours, area descending.
    pub contours: Vec<PartContour>,
    /// Thresholded frame (foreground = 255).
    pub binary: GrayImage,
    /// Grayscale frame, kept for downstream edge detection.
    pub gray: GrayImage,
}

/// Run the preprocessing stage on one captured frame.
pub fn preprocess(frame: &RgbImage, config: &PreprocessConfig) -> Result<Preprocessed, EvalError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(EvalError::EmptyFrame);
    }

    let gray = image::imageops::grayscale(frame);
    let binary = apply_threshold(&gray, config.threshold, config.polarity);

    let raw = find_contours::<i32>(&binary);
    let mut contours: Vec<PartContour> = raw
        .into_iter()
        .filter(|c| match config.retrieval {
            RetrievalMode::Tree => true,
            // An island inside a hole is still an outer border, but has a
            // parent; external mode keeps top-level borders only.
            RetrievalMode::External => c.border_type == BorderType::Outer && c.parent.is_none(),
        })
        .map(|c| PartContour::new(c.points, c.border_type))
        .filter(|c| c.area() >= config.min_area_px)
        .filter(|c| match &config.roi {
            Some(roi) => roi.contains_box(c.bounding_box()),
            None => true,
        })
        .collect();

    contours.sort_by(|a, b| b.area().total_cmp(&a.area()));

    tracing::debug!(
        n_contours = contours.len(),
        retrieval = ?config.retrieval,
        "preprocess done"
    );

    Ok(Preprocessed {
        contours,
        binary,
        gray,
    })
}

fn apply_threshold(gray: &GrayImage, kind: ThresholdKind, polarity: ThresholdPolarity) -> GrayImage {
    let (lo, hi) = match kind {
        ThresholdKind::Fixed { value } => (value as i32 + 1, 255),
        ThresholdKind::Band { min, max } => (min.clamp(0, 255), max.clamp(0, 255)),
    };
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, p) in gray.enumerate_pixels() {
        let v = p[0] as i32;
        let mut fg = v >= lo && v <= hi;
        if polarity == ThresholdPolarity::Inverse {
            fg = !fg;
        }
        out.put_pixel(x, y, Luma([if fg { 255 } else { 0 }]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::washer_frame;
    use image::RgbImage;

    #[test]
    fn blank_frame_yields_zero_contours() {
        let frame = RgbImage::new(64, 64);
        let pre = preprocess(&frame, &PreprocessConfig::default()).unwrap();
        assert!(pre.contours.is_empty());
    }

    #[test]
    fn zero_sized_frame_is_an_error() {
        let frame = RgbImage::new(0, 0);
        let err = preprocess(&frame, &PreprocessConfig::default()).unwrap_err();
        assert_eq!(err, EvalError::EmptyFrame);
    }

    #[test]
    fn washer_produces_outer_then_hole_sorted_by_area() {
        let frame = washer_frame(400, 400, [200.0, 200.0], 150.0, 50.0);
        let pre = preprocess(&frame, &PreprocessConfig::default()).unwrap();
        assert!(pre.contours.len() >= 2, "got {}", pre.contours.len());
        assert!(pre.contours[0].area() > pre.contours[1].area());
        assert_eq!(pre.contours[0].border(), BorderType::Outer);
        // Outer boundary encloses roughly pi * 150^2.
        let expect = std::f64::consts::PI * 150.0 * 150.0;
        assert!((pre.contours[0].area() - expect).abs() / expect < 0.05);
    }

    #[test]
    fn external_retrieval_drops_hole_borders() {
        let frame = washer_frame(400, 400, [200.0, 200.0], 150.0, 50.0);
        let cfg = PreprocessConfig {
            retrieval: RetrievalMode::External,
            ..Default::default()
        };
        let pre = preprocess(&frame, &cfg).unwrap();
        assert!(pre.contours.iter().all(|c| c.border() == BorderType::Outer));
    }

    #[test]
    fn external_retrieval_drops_islands_nested_inside_the_hole() {
        let mut gray =
            crate::test_utils::draw_washer_gray(400, 400, [200.0, 200.0], 150.0, 50.0, 230, 20);
        // Bright debris sitting inside the hole: an outer border with a parent.
        crate::test_utils::stamp_disk(&mut gray, [200.0, 200.0], 15.0, 230);
        let frame = crate::test_utils::rgb_from_gray(&gray);

        let tree = preprocess(&frame, &PreprocessConfig::default()).unwrap();
        assert_eq!(tree.contours.len(), 3);

        let cfg = PreprocessConfig {
            retrieval: RetrievalMode::External,
            ..Default::default()
        };
        let pre = preprocess(&frame, &cfg).unwrap();
        assert_eq!(pre.contours.len(), 1, "only the part's outer boundary survives");
        let expect = std::f64::consts::PI * 150.0 * 150.0;
        assert!((pre.contours[0].area() - expect).abs() / expect < 0.05);
    }

    #[test]
    fn roi_gate_rejects_contours_outside_window() {
        let frame = washer_frame(400, 400, [200.0, 200.0], 80.0, 30.0);
        let inside = PreprocessConfig {
            roi: Some(RoiRect {
                x: 100,
                y: 100,
                width: 200,
                height: 200,
            }),
            ..Default::default()
        };
        let outside = PreprocessConfig {
            roi: Some(RoiRect {
                x: 0,
                y: 0,
                width: 120,
                height: 120,
            }),
            ..Default::default()
        };
        assert!(!preprocess(&frame, &inside).unwrap().contours.is_empty());
        assert!(preprocess(&frame, &outside).unwrap().contours.is_empty());
    }

    #[test]
    fn inverse_polarity_finds_dark_part_on_bright_background() {
        let gray = crate::test_utils::draw_washer_gray(
            200,
            200,
            [100.0, 100.0],
            70.0,
            25.0,
            20,  // dark part
            230, // bright background
        );
        let frame = crate::test_utils::rgb_from_gray(&gray);
        let cfg = PreprocessConfig {
            polarity: ThresholdPolarity::Inverse,
            ..Default::default()
        };
        let pre = preprocess(&frame, &cfg).unwrap();
        // The dark annulus itself must come back as the dominant contour.
        let expect = std::f64::consts::PI * 70.0 * 70.0;
        assert!((pre.contours[0].area() - expect).abs() / expect < 0.1);
    }
}
