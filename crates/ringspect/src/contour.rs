//! Contour value type with on-demand derived geometry.
//!
//! A contour is an ordered closed boundary produced fresh by one
//! preprocessing pass; it is owned by that pipeline invocation and never
//! shared across stations or frames.

use imageproc::contours::BorderType;
use imageproc::point::Point;
use imageproc::rect::Rect;
use nalgebra::Point2;

/// One closed boundary extracted from a binary frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PartContour {
    points: Vec<Point<i32>>,
    border: BorderType,
    /// Shoelace area, cached because the preprocessor sorts by it.
    area: f64,
}

impl PartContour {
    pub fn new(points: Vec<Point<i32>>, border: BorderType) -> Self {
        let area = shoelace_area(&points);
        Self {
            points,
            border,
            area,
        }
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    /// Outer border or hole border, from the hierarchical retrieval.
    pub fn border(&self) -> BorderType {
        self.border
    }

    /// Green's-theorem polygon area in px².
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Closed arc length in px.
    pub fn perimeter(&self) -> f64 {
        imageproc::geometry::arc_length(&self.points, true)
    }

    /// Area-weighted centroid; falls back to the vertex mean for degenerate
    /// (near-zero-area) boundaries.
    pub fn centroid(&self) -> Point2<f64> {
        let n = self.points.len();
        if n == 0 {
            return Point2::new(0.0, 0.0);
        }
        let mut a2 = 0.0; // twice the signed area
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
            a2 += cross;
            cx += (p.x + q.x) as f64 * cross;
            cy += (p.y + q.y) as f64 * cross;
        }
        if a2.abs() < 1e-9 {
            let (sx, sy) = self
                .points
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
            return Point2::new(sx / n as f64, sy / n as f64);
        }
        Point2::new(cx / (3.0 * a2), cy / (3.0 * a2))
    }

    /// Axis-aligned bounding box. Empty contours get a zero-sized box at the
    /// origin.
    pub fn bounding_box(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::at(0, 0).of_size(1, 1);
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::at(min_x, min_y).of_size((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32)
    }

    /// Radius of the circle with the same area: `sqrt(area/π)`.
    pub fn equivalent_radius(&self) -> f64 {
        (self.area / std::f64::consts::PI).sqrt()
    }

    /// `4πA/P²`, 1.0 for a perfect circle. `None` for zero-perimeter
    /// degenerates so active filters can reject them explicitly.
    pub fn circularity(&self) -> Option<f64> {
        let p = self.perimeter();
        if p <= 0.0 {
            return None;
        }
        Some(4.0 * std::f64::consts::PI * self.area / (p * p))
    }

    /// Bounding-box `width/height`. `None` for zero-height degenerates.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let bb = self.bounding_box();
        if bb.height() == 0 {
            return None;
        }
        Some(bb.width() as f64 / bb.height() as f64)
    }
}

fn shoelace_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        acc += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (acc.abs() as f64) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: i32, y0: i32, side: i32) -> PartContour {
        let mut pts = Vec::new();
        for i in 0..side {
            pts.push(Point::new(x0 + i, y0));
        }
        for i in 0..side {
            pts.push(Point::new(x0 + side, y0 + i));
        }
        for i in 0..side {
            pts.push(Point::new(x0 + side - i, y0 + side));
        }
        for i in 0..side {
            pts.push(Point::new(x0, y0 + side - i));
        }
        PartContour::new(pts, BorderType::Outer)
    }

    #[test]
    fn square_area_perimeter_centroid() {
        let c = square(10, 20, 40);
        assert!((c.area() - 1600.0).abs() < 1e-9);
        assert!((c.perimeter() - 160.0).abs() < 1.0);
        let ctr = c.centroid();
        assert!((ctr.x - 30.0).abs() < 1e-6);
        assert!((ctr.y - 40.0).abs() < 1e-6);
        let bb = c.bounding_box();
        assert_eq!((bb.left(), bb.top()), (10, 20));
        assert_eq!((bb.width(), bb.height()), (41, 41));
    }

    #[test]
    fn equivalent_radius_matches_circle_area() {
        let pts: Vec<Point<i32>> = (0..360)
            .map(|deg| {
                let t = (deg as f64).to_radians();
                Point::new(
                    (100.0 + 50.0 * t.cos()).round() as i32,
                    (100.0 + 50.0 * t.sin()).round() as i32,
                )
            })
            .collect();
        let c = PartContour::new(pts, BorderType::Outer);
        assert!((c.equivalent_radius() - 50.0).abs() < 1.0);
        // Rasterized circle boundaries overestimate arc length (duplicate
        // and diagonal steps), so a pixel circle scores well under the
        // ideal 1.0; ~0.79 is typical at this radius.
        let circ = c.circularity().unwrap();
        assert!(circ > 0.7 && circ < 1.1, "circularity {circ}");
    }

    #[test]
    fn degenerate_contour_has_no_circularity() {
        let c = PartContour::new(vec![Point::new(5, 5)], BorderType::Outer);
        assert_eq!(c.area(), 0.0);
        assert!(c.circularity().is_none());
    }

    #[test]
    fn aspect_ratio_of_square_is_one() {
        let c = square(0, 0, 20);
        assert!((c.aspect_ratio().unwrap() - 1.0).abs() < 1e-9);
    }
}
