//! Four-corner polygons in canonical TL, TR, BR, BL order.

use std::cmp::Ordering;

use glam::DVec2;

use crate::error::GeometryError;

/// Corners closer than this are treated as the same point.
pub const COINCIDENT_EPSILON: f64 = 1e-3;

/// Ordered quadrilateral: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub top_left: DVec2,
    pub top_right: DVec2,
    pub bottom_right: DVec2,
    pub bottom_left: DVec2,
}

impl Quad {
    pub fn new(top_left: DVec2, top_right: DVec2, bottom_right: DVec2, bottom_left: DVec2) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Axis-aligned rectangle spanning pixel centers `(x, y)` to `(x + w - 1, y + h - 1)`.
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        let r = x + width - 1.0;
        let b = y + height - 1.0;
        Self::new(
            DVec2::new(x, y),
            DVec2::new(r, y),
            DVec2::new(r, b),
            DVec2::new(x, b),
        )
    }

    /// Order four unlabeled points with the sum/diff heuristic.
    ///
    /// TL has the smallest `x + y`, BR the largest; TR has the smallest
    /// `y - x`, BL the largest. Ties are broken by lexicographic `(x, y)`
    /// order, so the result does not depend on input order.
    pub fn from_unordered(points: [DVec2; 4]) -> Result<Self, GeometryError> {
        let sum = |p: &DVec2| p.x + p.y;
        let diff = |p: &DVec2| p.y - p.x;

        let top_left = pick(&points, sum, Ordering::Less);
        let bottom_right = pick(&points, sum, Ordering::Greater);
        let top_right = pick(&points, diff, Ordering::Less);
        let bottom_left = pick(&points, diff, Ordering::Greater);

        let quad = Self::new(top_left, top_right, bottom_right, bottom_left);
        let corners = quad.points();
        for i in 0..4 {
            for j in (i + 1)..4 {
                if corners[i] == corners[j] {
                    return Err(GeometryError::AmbiguousOrdering);
                }
            }
        }

        Ok(quad)
    }

    pub fn points(&self) -> [DVec2; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Shoelace area; positive for clockwise corners in image coordinates.
    pub fn signed_area(&self) -> f64 {
        polygon_signed_area(&self.points())
    }

    /// Greater of the two horizontal edge lengths.
    pub fn natural_width(&self) -> f64 {
        let top = self.top_left.distance(self.top_right);
        let bottom = self.bottom_left.distance(self.bottom_right);
        top.max(bottom)
    }

    /// Greater of the two vertical edge lengths.
    pub fn natural_height(&self) -> f64 {
        let left = self.top_left.distance(self.bottom_left);
        let right = self.top_right.distance(self.bottom_right);
        left.max(right)
    }

    /// Pixel extent of the flattened quad. Corners land on the first and
    /// last pixel centers, so an edge of length `l` spans `floor(l) + 1` pixels.
    pub fn pixel_extent(&self) -> (u32, u32) {
        let to_px = |len: f64| (len.floor() as u32).saturating_add(1);
        (to_px(self.natural_width()), to_px(self.natural_height()))
    }

    /// Reject coincident corners and near-zero area.
    pub fn check_degenerate(&self, min_area: f64) -> Result<(), GeometryError> {
        let corners = self.points();
        if corners.iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::Homography("corner coordinates are not finite"));
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                if corners[i].distance(corners[j]) < COINCIDENT_EPSILON {
                    return Err(GeometryError::CoincidentCorners(i, j));
                }
            }
        }

        let area = self.signed_area().abs();
        if area < min_area {
            return Err(GeometryError::DegenerateQuad { area, min_area });
        }

        Ok(())
    }
}

fn pick<F>(points: &[DVec2; 4], key: F, want: Ordering) -> DVec2
where
    F: Fn(&DVec2) -> f64,
{
    let mut best = points[0];
    for p in &points[1..] {
        let ord = key(p)
            .partial_cmp(&key(&best))
            .unwrap_or(Ordering::Equal)
            .then_with(|| lexicographic(p, &best));
        if ord == want {
            best = *p;
        }
    }
    best
}

fn lexicographic(a: &DVec2, b: &DVec2) -> Ordering {
    a.x.partial_cmp(&b.x)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}

/// Shoelace formula over a closed polygon.
pub fn polygon_signed_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    acc * 0.5
}

/// Collapse a 4- or 5-point zone polygon to four corners.
///
/// A fifth point is an extra vertex on the top edge (an arch apex). Of the
/// three points with the smallest `y`, the one in the middle by `x` is dropped.
pub fn reduce_to_four(points: &[DVec2]) -> Result<[DVec2; 4], GeometryError> {
    match points.len() {
        4 => Ok([points[0], points[1], points[2], points[3]]),
        5 => {
            let mut by_height: Vec<usize> = (0..5).collect();
            by_height.sort_by(|&a, &b| {
                points[a]
                    .y
                    .partial_cmp(&points[b].y)
                    .unwrap_or(Ordering::Equal)
            });

            let mut top: Vec<usize> = by_height[..3].to_vec();
            top.sort_by(|&a, &b| {
                points[a]
                    .x
                    .partial_cmp(&points[b].x)
                    .unwrap_or(Ordering::Equal)
            });
            let dropped = top[1];

            let mut kept = [DVec2::ZERO; 4];
            let mut k = 0;
            for (i, p) in points.iter().enumerate() {
                if i != dropped {
                    kept[k] = *p;
                    k += 1;
                }
            }
            Ok(kept)
        }
        n => Err(GeometryError::InvalidPolygon(n)),
    }
}
