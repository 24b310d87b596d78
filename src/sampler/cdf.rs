//! Discretized Gaussian CDF tables
//!
//! A [`CdfTable`] maps each integer offset inside a zero-mean Gaussian's
//! +/-3 sigma window to a quantized cumulative-probability bucket, and maps
//! buckets back to representative offsets. Built once per standard
//! deviation, a table serves an unbounded number of truncated
//! inverse-transform draws without any per-draw CDF evaluation.

use super::errors::SamplerError;
use super::{CDF_BUCKETS, CDF_SUPPORT_SIGMAS};

/// Closed-form normal CDF at `x` for N(0, std_dev^2)
#[inline]
fn normal_cdf(x: f64, std_dev: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / (std_dev * std::f64::consts::SQRT_2)))
}

/// Forward/inverse mapping of a discretized zero-mean Gaussian CDF.
///
/// `forward[i]` maps the unit integer offset `min_offset + i` to its
/// cumulative bucket in `[0, CDF_BUCKETS)`, normalized over the support
/// window; `inverse[j]` maps a bucket back to the representative offset.
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct CdfTable {
    /// Offset-to-bucket staircase, one entry per support offset
    forward: Vec<u32>,
    /// Bucket-to-offset mapping, exactly `CDF_BUCKETS` entries
    inverse: Vec<i32>,
    /// Smallest offset in the support window
    min_offset: i32,
    /// Largest offset in the support window (inclusive)
    max_offset: i32,
}

impl CdfTable {
    /// Build the table for a zero-mean Gaussian with the given standard
    /// deviation.
    ///
    /// The support window is `[floor(-3 sigma), ceil(3 sigma) - 1]`. The CDF
    /// is normalized by the probability mass inside the window, then
    /// quantized into [`CDF_BUCKETS`] buckets as a monotone staircase.
    pub fn build(std_dev: f64) -> Result<Self, SamplerError> {
        if !(std_dev > 0.0) {
            return Err(SamplerError::NonPositiveStdDev {
                std_dev,
                context: "cdf table".to_string(),
            });
        }

        let min_offset = (-CDF_SUPPORT_SIGMAS * std_dev).floor() as i32;
        // Exclusive upper bound of the staircase; the recorded support max is
        // one below it.
        let upper = (CDF_SUPPORT_SIGMAS * std_dev).ceil() as i32;
        let max_offset = upper - 1;

        let cdf_lo = normal_cdf((min_offset - 1) as f64, std_dev);
        let cdf_hi = normal_cdf(upper as f64, std_dev);
        let mass = cdf_hi - cdf_lo;

        let width = (upper - min_offset) as usize;
        let mut forward = Vec::with_capacity(width);
        let mut inverse = vec![0i32; CDF_BUCKETS];

        let mut start = 0usize;
        for x in min_offset..upper {
            let val = normal_cdf(x as f64, std_dev);
            let end = ((CDF_BUCKETS as f64 * (val - cdf_lo) / mass) as usize).min(CDF_BUCKETS - 1);

            forward.push(end as u32);
            for bucket in inverse.iter_mut().take(end).skip(start) {
                *bucket = x;
            }
            start = end;
        }

        // Buckets past the last staircase step all map to the support max.
        for bucket in inverse.iter_mut().skip(start) {
            *bucket = max_offset;
        }

        Ok(Self {
            forward,
            inverse,
            min_offset,
            max_offset,
        })
    }

    /// Smallest offset in the support window
    #[inline]
    pub fn min_offset(&self) -> i32 {
        self.min_offset
    }

    /// Largest offset in the support window (inclusive)
    #[inline]
    pub fn max_offset(&self) -> i32 {
        self.max_offset
    }

    /// Number of integer offsets in the support window
    #[inline]
    pub fn support_width(&self) -> usize {
        self.forward.len()
    }

    /// Cumulative bucket of a support offset.
    ///
    /// `offset` must lie within `[min_offset, max_offset]`.
    #[inline]
    pub fn bucket(&self, offset: i32) -> usize {
        self.forward[(offset - self.min_offset) as usize] as usize
    }

    /// Representative support offset of a bucket.
    ///
    /// `bucket` must lie within `[0, CDF_BUCKETS)`.
    #[inline]
    pub fn offset(&self, bucket: usize) -> i32 {
        self.inverse[bucket]
    }
}
