/*!
Proposal sampling for a batch of candidate object poses.

The pipeline per tracking step:

1. [`SamplingEngine::set_reference`] fixes the reference pose the proposals
   perturb.
2. [`SamplingEngine::sample_viewpoint`] draws a continuous viewpoint per
   candidate (azimuth is circular, elevation/distance are bounded).
3. [`SamplingEngine::sample_root_locations`] draws root centers and bounding
   boxes for the whole batch.
4. [`SamplingEngine::sample_part_centers`] propagates per-node truncated
   Gaussian offsets from the root down through dependent parts.

Truncated Gaussian draws go through per-node [`CdfTable`]s: a discretized
forward/inverse mapping of the Gaussian CDF built once at engine
construction, so each draw is a single uniform bucket index plus two table
lookups regardless of the truncation interval.
*/

pub mod cdf;
pub mod config;
pub mod engine;
pub mod errors;
pub mod traits;
pub mod truncated;
pub mod types;

pub use cdf::CdfTable;
pub use config::{SamplerConfigSnapshot, SamplingConfig, SamplingConfigBuilder};
pub use engine::{wrap_azimuth, ReferenceState, SamplingEngine};
pub use errors::SamplerError;
pub use truncated::{sample_truncated_axis, sample_truncated_point};
pub use types::{CandidateState, Rect, RegionBounds, RootPrior, SamplingMode, Viewpoint};

/// Resolution of the discretized CDF mapping (buckets per table).
pub const CDF_BUCKETS: usize = 10_000;

/// Half-width of the CDF support window, in standard deviations.
pub const CDF_SUPPORT_SIGMAS: f64 = 3.0;

/// Part-node proposal std-dev as a fraction of the part's front-facing size.
pub const PART_STD_DIVISOR: f64 = 4.0;

/// Root-node proposal std-dev as a fraction of the root's front-facing size.
/// Roots move far less relative to their own bounding box than articulated
/// parts do.
pub const ROOT_STD_DIVISOR: f64 = 32.0;

/// Default number of candidate states per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default azimuth proposal std-dev (degrees).
pub const DEFAULT_STD_AZIMUTH: f64 = 5.0;

/// Default elevation proposal std-dev (degrees).
pub const DEFAULT_STD_ELEVATION: f64 = 2.0;

/// Default distance proposal std-dev (model units).
pub const DEFAULT_STD_DISTANCE: f64 = 1.0;

/// Default detector-score threshold above which the detector prior is
/// trusted for root-location proposals.
pub const DEFAULT_DETECTOR_CONFIDENCE: f64 = 0.5;

/// Default cap on rejection-loop attempts before a draw fails.
pub const DEFAULT_MAX_REJECTION_ATTEMPTS: usize = 10_000;
