//! Pixel bounding boxes and clamping them into page bounds.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub const ZERO: BoundingBox = BoundingBox { x: 0, y: 0, w: 0, h: 0 };

    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Smallest box containing every point of the polygon.
    ///
    /// Coordinates are truncated toward zero. An empty polygon gives `ZERO`.
    pub fn from_quad(points: &[(f32, f32)]) -> Self {
        if points.is_empty() {
            return Self::ZERO;
        }
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &(px, py) in points {
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        // `as` saturates and maps NaN to 0.
        let x = min_x as i32;
        let y = min_y as i32;
        Self {
            x,
            y,
            w: (max_x as i32).saturating_sub(x),
            h: (max_y as i32).saturating_sub(y),
        }
    }
}

/// Clamps `bbox` into a `width` x `height` page.
///
/// For pages at least one pixel in each direction the result satisfies
/// `0 <= x <= width`, `0 <= y <= height`, `1 <= w <= width - x` and
/// `1 <= h <= height - y`, except that the floor of 1 wins when the box sits
/// on the right or bottom edge. Never panics.
pub fn normalize(bbox: BoundingBox, width: u32, height: u32) -> BoundingBox {
    let (x, w) = clamp_axis(bbox.x, bbox.w, width);
    let (y, h) = clamp_axis(bbox.y, bbox.h, height);
    BoundingBox { x, y, w, h }
}

fn clamp_axis(start: i32, extent: i32, limit: u32) -> (i32, i32) {
    let limit = i64::from(limit);
    let start = i64::from(start).clamp(0, limit);
    let extent = i64::from(extent).min(limit - start).max(1);
    // Both values are bounded by `limit`, which fits in i32 for any real page.
    (
        i32::try_from(start).unwrap_or(i32::MAX),
        i32::try_from(extent).unwrap_or(i32::MAX),
    )
}
