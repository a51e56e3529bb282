mod homography;
mod quad;

pub use homography::{rect_corners, Homography};
pub use quad::{polygon_signed_area, reduce_to_four, Quad, COINCIDENT_EPSILON};
