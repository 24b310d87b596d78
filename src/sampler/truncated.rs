//! Truncated Gaussian draws through precomputed CDF tables
//!
//! Inverse-transform sampling from a Gaussian conditioned on a bounded
//! interval: restricting the uniform draw to the bucket range of the
//! interval's endpoints is equivalent to conditioning, so no conditional
//! normalization happens at draw time.

use nalgebra::Point2;

use super::cdf::CdfTable;
use super::types::RegionBounds;
use crate::common::rng::Rng;

/// Draw one integer coordinate from a Gaussian centered at `mean`,
/// truncated to the closed interval `[min, max]`.
///
/// When the whole interval lies outside the table's support window the draw
/// saturates at the boundary closest to the mode. Consumes one uniform draw
/// from `rng` (none on the saturation paths).
pub fn sample_truncated_axis(
    rng: &mut impl Rng,
    table: &CdfTable,
    mean: f64,
    min: i32,
    max: i32,
) -> i32 {
    let rel_min = (min as f64 - mean) as i32;
    let rel_max = (max as f64 - mean) as i32;

    let value = if rel_min >= table.max_offset() {
        // Interval entirely above the support window
        min
    } else if rel_max <= table.min_offset() {
        // Interval entirely below the support window
        max
    } else {
        let lo = rel_min.max(table.min_offset());
        let hi = rel_max.min(table.max_offset());

        let bucket_lo = table.bucket(lo) as i64;
        let bucket_hi = table.bucket(hi) as i64;
        let bucket = rng.uniform_int(bucket_lo, bucket_hi) as usize;

        (table.offset(bucket) as f64 + mean) as i32
    };

    // Guards against off-by-one rounding at table edges
    value.clamp(min, max)
}

/// Draw one 2D integer sample truncated to `bounds`, axes independent.
///
/// The x and y tables are evaluated in that order, consuming up to two
/// uniform draws from the shared stream.
pub fn sample_truncated_point(
    rng: &mut impl Rng,
    table_x: &CdfTable,
    table_y: &CdfTable,
    mean: Point2<f64>,
    bounds: &RegionBounds,
) -> Point2<f64> {
    let x = sample_truncated_axis(rng, table_x, mean.x, bounds.x_min, bounds.x_max);
    let y = sample_truncated_axis(rng, table_y, mean.y, bounds.y_min, bounds.y_max);
    Point2::new(x as f64, y as f64)
}
