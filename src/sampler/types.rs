//! Candidate-state and geometry types
//!
//! This module defines the pose types flowing through the proposal sampler.
//! Coordinates are image-space pixels unless a field says otherwise.

use nalgebra::Point2;
use smallvec::{smallvec, SmallVec};

/// Continuous viewpoint of the tracked object.
///
/// Azimuth is circular in [0, 360); elevation and distance are bounded by
/// the object model's discretization grids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    /// Azimuth angle in degrees, [0, 360)
    pub azimuth: f64,
    /// Elevation angle in degrees
    pub elevation: f64,
    /// Distance to the object in model units
    pub distance: f64,
}

impl Viewpoint {
    /// Create a new viewpoint
    pub fn new(azimuth: f64, elevation: f64, distance: f64) -> Self {
        Self {
            azimuth,
            elevation,
            distance,
        }
    }
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Axis-aligned rectangle in image space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the rectangle
    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Closed integer intervals bounding a sampling region on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionBounds {
    /// Smallest valid x
    pub x_min: i32,
    /// Largest valid x (inclusive)
    pub x_max: i32,
    /// Smallest valid y
    pub y_min: i32,
    /// Largest valid y (inclusive)
    pub y_max: i32,
}

impl RegionBounds {
    /// Create new bounds
    pub fn new(x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Bounds covering a (cols x rows) image, pixel-inclusive
    pub fn of_image(cols: usize, rows: usize) -> Self {
        Self::new(0, cols as i32 - 1, 0, rows as i32 - 1)
    }

    /// Whether an integer point lies within the closed bounds
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x_min as i64
            && x <= self.x_max as i64
            && y >= self.y_min as i64
            && y <= self.y_max as i64
    }
}

/// Which proposal regime the viewpoint sampler runs in.
///
/// Replaces a process-wide "initializing" flag with an explicit per-call
/// argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// No usable reference: draw viewpoints uniformly over their full ranges
    Initialize,
    /// Perturb the reference viewpoint with per-component Gaussians
    Refine,
}

impl SamplingMode {
    /// Whether this is the broad initialization regime
    #[inline]
    pub fn is_initializing(&self) -> bool {
        matches!(self, SamplingMode::Initialize)
    }
}

/// Detector guidance for root-location proposals.
///
/// Passed explicitly to [`crate::SamplingEngine::sample_root_locations`]
/// rather than read from process-wide state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootPrior {
    /// No detector guidance: search the image interior broadly
    Uninformed,
    /// A detector box with a confidence score. The tight search branch is
    /// taken only when `score` exceeds the engine's configured confidence
    /// threshold; the box size always fixes candidate box placement.
    Detector {
        /// Detector box width
        width: f64,
        /// Detector box height
        height: f64,
        /// Detector confidence score
        score: f64,
    },
}

/// One hypothesized full object pose in a batch.
///
/// Candidate batches are allocated and owned by the caller; the engine only
/// writes into them. Per-node arrays are indexed by hierarchy node, parts
/// first, then roots (SmallVec avoids heap for typical small hierarchies).
#[derive(Debug, Clone)]
pub struct CandidateState {
    /// Sampled viewpoint
    pub viewpoint: Viewpoint,
    /// Root node center, image space
    pub root_center: Point2<f64>,
    /// Root bounding box, image space
    pub root_bbox: Rect,
    /// Per-node absolute centers, image space
    pub centers: SmallVec<[Point2<f64>; 8]>,
    /// Per-node centers in each node's rectified space. Occluded nodes carry
    /// the origin sentinel.
    pub rectified_centers: SmallVec<[Point2<f64>; 8]>,
    /// Aggregate bounding box over parts and roots
    pub bbox: Rect,
}

impl CandidateState {
    /// Create a zeroed candidate for a hierarchy of `node_count` nodes
    pub fn new(node_count: usize) -> Self {
        Self {
            viewpoint: Viewpoint::default(),
            root_center: Point2::origin(),
            root_bbox: Rect::default(),
            centers: smallvec![Point2::origin(); node_count],
            rectified_centers: smallvec![Point2::origin(); node_count],
            bbox: Rect::default(),
        }
    }

    /// Allocate a batch of `n` zeroed candidates
    pub fn batch(node_count: usize, n: usize) -> Vec<Self> {
        (0..n).map(|_| Self::new(node_count)).collect()
    }

    /// Number of hierarchy nodes this candidate covers
    #[inline]
    pub fn node_count(&self) -> usize {
        self.centers.len()
    }
}
