//! Projective transform estimated from four point correspondences.

use glam::DVec2;
use nalgebra::{DMatrix, Matrix3, Vector3, SVD};

use crate::error::GeometryError;

/// Below this the projective denominator is treated as zero.
const W_EPSILON: f64 = 1e-12;

/// Planar homography: maps points of one quadrilateral onto another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Estimate the homography taking `src[i]` to `dst[i]`.
    ///
    /// Normalized DLT: both point sets are centered and scaled to a mean
    /// distance of sqrt(2) before the SVD, then the result is denormalized
    /// and scaled so that `h[(2, 2)] == 1`.
    pub fn from_correspondences(src: &[DVec2; 4], dst: &[DVec2; 4]) -> Result<Self, GeometryError> {
        let (src_norm, src_t) = normalize_points(src)?;
        let (dst_norm, dst_t) = normalize_points(dst)?;

        // Each correspondence gives two rows:
        // [-x -y -1  0  0  0  x*x'  y*x'  x']
        // [ 0  0  0 -x -y -1  x*y'  y*y'  y']
        // Padded to 9x9 with a zero row so the thin SVD keeps the null-space vector.
        let mut a = DMatrix::<f64>::zeros(9, 9);
        for (i, (s, d)) in src_norm.iter().zip(dst_norm.iter()).enumerate() {
            let r0 = [-s.x, -s.y, -1.0, 0.0, 0.0, 0.0, s.x * d.x, s.y * d.x, d.x];
            let r1 = [0.0, 0.0, 0.0, -s.x, -s.y, -1.0, s.x * d.y, s.y * d.y, d.y];
            for c in 0..9 {
                a[(2 * i, c)] = r0[c];
                a[(2 * i + 1, c)] = r1[c];
            }
        }

        let svd = SVD::new(a, false, true);
        let v_t = svd
            .v_t
            .ok_or(GeometryError::Homography("SVD did not produce V^T"))?;
        let null = v_t.row(svd.singular_values.imin());
        let h_norm = Matrix3::from_row_slice(&null.iter().copied().collect::<Vec<_>>());

        let dst_t_inv = dst_t
            .try_inverse()
            .ok_or(GeometryError::Homography("normalization is singular"))?;
        let h = normalized(dst_t_inv * h_norm * src_t)
            .ok_or(GeometryError::Homography("projective scale is zero"))?;

        if !h.iter().all(|v| v.is_finite()) || h.try_inverse().is_none() {
            return Err(GeometryError::Homography("matrix is singular"));
        }

        Ok(Self { matrix: h })
    }

    /// Homography taking the corners of `quad` (TL, TR, BR, BL) onto an
    /// axis-aligned `width x height` pixel rectangle.
    pub fn quad_to_rect(quad: &[DVec2; 4], width: u32, height: u32) -> Result<Self, GeometryError> {
        Self::from_correspondences(quad, &rect_corners(width, height))
    }

    /// Homography taking a `width x height` pixel rectangle onto `quad`.
    pub fn rect_to_quad(width: u32, height: u32, quad: &[DVec2; 4]) -> Result<Self, GeometryError> {
        Self::from_correspondences(&rect_corners(width, height), quad)
    }

    /// `None` for points mapped to infinity.
    #[inline]
    pub fn apply(&self, p: DVec2) -> Option<DVec2> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < W_EPSILON {
            return None;
        }
        Some(DVec2::new(v.x / v.z, v.y / v.z))
    }

    pub fn inverse(&self) -> Result<Self, GeometryError> {
        self.matrix
            .try_inverse()
            .and_then(normalized)
            .map(|matrix| Self { matrix })
            .ok_or(GeometryError::Homography("matrix is not invertible"))
    }

    /// `self` after `other`: applies `other` first.
    pub fn compose(&self, other: &Homography) -> Homography {
        Homography {
            matrix: self.matrix * other.matrix,
        }
    }
}

/// Pixel-center corners of a `width x height` rectangle in TL, TR, BR, BL order.
pub fn rect_corners(width: u32, height: u32) -> [DVec2; 4] {
    let w = width.saturating_sub(1) as f64;
    let h = height.saturating_sub(1) as f64;
    [
        DVec2::new(0.0, 0.0),
        DVec2::new(w, 0.0),
        DVec2::new(w, h),
        DVec2::new(0.0, h),
    ]
}

/// Scale so the bottom-right entry is 1.
fn normalized(m: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let w = m[(2, 2)];
    if w.abs() < W_EPSILON {
        return None;
    }
    Some(m / w)
}

fn normalize_points(points: &[DVec2; 4]) -> Result<([DVec2; 4], Matrix3<f64>), GeometryError> {
    let c = points.iter().copied().sum::<DVec2>() / 4.0;
    let avg_dist = points.iter().map(|p| (*p - c).length()).sum::<f64>() / 4.0;

    if avg_dist < 1e-10 || !avg_dist.is_finite() {
        return Err(GeometryError::Homography("points collapse to a single location"));
    }

    let scale = std::f64::consts::SQRT_2 / avg_dist;
    let normalized = points.map(|p| (p - c) * scale);
    #[rustfmt::skip]
    let t = Matrix3::new(
        scale, 0.0, -c.x * scale,
        0.0, scale, -c.y * scale,
        0.0, 0.0, 1.0,
    );

    Ok((normalized, t))
}
