//! The sampling engine
//!
//! [`SamplingEngine`] owns one CDF table pair per hierarchy node, the
//! reference pose, and the viewpoint/location boundaries, and exposes the
//! three per-step sampling operations: viewpoint, root locations, and
//! hierarchical part centers.
//!
//! The engine owns no RNG and no mode flag; both are per-call arguments so
//! runs are reproducible from the caller's seed alone.

use log::{debug, trace};
use nalgebra::Point2;
use smallvec::SmallVec;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::cdf::CdfTable;
use super::config::{SamplerConfigSnapshot, SamplingConfig};
use super::errors::SamplerError;
use super::traits::{ImageModel, ObjectModel};
use super::truncated::sample_truncated_point;
use super::types::{CandidateState, Rect, RegionBounds, RootPrior, SamplingMode, Viewpoint};
use super::{PART_STD_DIVISOR, ROOT_STD_DIVISOR};
use crate::common::rng::Rng;
#[cfg(feature = "rayon")]
use crate::common::rng::SimpleRng;

/// Wrap an azimuth into [0, 360) by repeated +/-360 correction.
///
/// Azimuth is circular: out-of-range values are wrapped, never rejected.
pub fn wrap_azimuth(mut azimuth: f64) -> f64 {
    while azimuth < 0.0 || azimuth >= 360.0 {
        if azimuth < 0.0 {
            azimuth += 360.0;
        }
        if azimuth >= 360.0 {
            azimuth -= 360.0;
        }
    }
    azimuth
}

/// Reference pose the proposals perturb.
///
/// Captured by [`SamplingEngine::set_reference`]; read-only during sampling.
#[derive(Debug, Clone)]
pub struct ReferenceState {
    /// Reference viewpoint
    pub viewpoint: Viewpoint,
    /// Reference root center, image space
    pub root_center: Point2<f64>,
    /// Reference root bounding box
    pub root_bbox: Rect,
    /// Per-node reference centers. Occluded nodes carry their nominal
    /// offset from the root; additional root-like nodes carry the root
    /// center.
    pub centers: SmallVec<[Point2<f64>; 8]>,
}

/// Per-node sampling state: the CDF table pair and the rectified-space
/// bounds refreshed on every part-centers pass.
#[derive(Debug)]
struct NodeSampler {
    std_x: f64,
    std_y: f64,
    cdf_x: CdfTable,
    cdf_y: CdfTable,
    rect_bounds: RegionBounds,
}

/// Batch-sized scratch buffers, reused across sampling calls.
///
/// Exclusively owned by the engine; sized once per call, not per candidate.
#[derive(Debug)]
struct BatchScratch {
    /// Image-space target points fed into rectification
    targets: Vec<Point2<f64>>,
    /// Rectified-space means for the truncated draws
    rect_means: Vec<Point2<f64>>,
    /// Rectified-space draw results
    drawn: Vec<Point2<f64>>,
    /// Image-space points restored from rectified space
    restored: Vec<Point2<f64>>,
    /// Per-candidate running root coordinate
    roots: Vec<Point2<f64>>,
}

impl BatchScratch {
    fn with_capacity(n: usize) -> Self {
        Self {
            targets: Vec::with_capacity(n),
            rect_means: Vec::with_capacity(n),
            drawn: Vec::with_capacity(n),
            restored: Vec::with_capacity(n),
            roots: Vec::with_capacity(n),
        }
    }

    /// Size every buffer to `n` candidates and anchor all running roots at
    /// the reference root.
    fn reset(&mut self, n: usize, root: Point2<f64>) {
        self.targets.clear();
        self.rect_means.clear();
        self.drawn.clear();
        self.restored.clear();
        self.roots.clear();
        self.roots.resize(n, root);
    }
}

/// Proposal sampler for one tracked articulated object.
///
/// Constructed once per object from the object model; per tracking step,
/// callers first [`set_reference`], then draw viewpoints, root locations,
/// and part centers for a batch of candidates.
///
/// Node traversal in [`sample_part_centers`] runs in reverse index order and
/// relies on the node-index invariant that every part's parent is a
/// higher-index node (roots occupy the top indices).
///
/// [`set_reference`]: SamplingEngine::set_reference
/// [`sample_part_centers`]: SamplingEngine::sample_part_centers
#[derive(Debug)]
pub struct SamplingEngine {
    config: SamplingConfig,
    node_count: usize,
    part_count: usize,
    elevation_min: f64,
    elevation_max: f64,
    distance_min: f64,
    distance_max: f64,
    /// Image-space bounds, refreshed by `set_reference`
    image_bounds: RegionBounds,
    nodes: Vec<NodeSampler>,
    reference: Option<ReferenceState>,
    scratch: BatchScratch,
}

impl SamplingEngine {
    /// Build an engine for the given object model.
    ///
    /// Derives per-node proposal std-devs from each node's front-facing
    /// dimensions (parts `dim/4`, roots `dim/32`), builds one CDF table pair
    /// per node, and reads the elevation/distance sampling bounds from the
    /// model's discretization grids.
    pub fn new(config: SamplingConfig, object: &impl ObjectModel) -> Result<Self, SamplerError> {
        let node_count = object.node_count();
        let part_count = object.part_count();
        if node_count == 0 || part_count > node_count {
            return Err(SamplerError::Configuration {
                description: format!(
                    "invalid hierarchy: {} nodes, {} parts",
                    node_count, part_count
                ),
            });
        }

        let elevation = object.elevation_grid();
        if elevation.len() < 2 {
            return Err(SamplerError::Configuration {
                description: "elevation grid needs at least two entries".to_string(),
            });
        }
        let elevation_step = elevation[1] - elevation[0];
        let elevation_min = elevation[0];
        // Widened by half a grid step past the second grid line
        let elevation_max = elevation[1] + elevation_step / 2.0;

        let distance = object.distance_grid();
        if distance.len() < 2 {
            return Err(SamplerError::Configuration {
                description: "distance grid needs at least two entries".to_string(),
            });
        }
        let distance_min = distance[0];
        let distance_max = distance[distance.len() - 1];

        let mut nodes = Vec::with_capacity(node_count);
        for pr in 0..node_count {
            let (width, height) = object.node_front_dimensions(pr);
            let divisor = if pr < part_count {
                PART_STD_DIVISOR
            } else {
                ROOT_STD_DIVISOR
            };
            let std_x = width / divisor;
            let std_y = height / divisor;

            let cdf_x = CdfTable::build(std_x).map_err(|e| node_axis_context(e, pr, "x"))?;
            let cdf_y = CdfTable::build(std_y).map_err(|e| node_axis_context(e, pr, "y"))?;

            nodes.push(NodeSampler {
                std_x,
                std_y,
                cdf_x,
                cdf_y,
                rect_bounds: RegionBounds::default(),
            });
        }

        debug!(
            "sampling engine ready: {} nodes ({} parts), elevation [{:.2}, {:.2}], distance [{:.2}, {:.2}]",
            node_count, part_count, elevation_min, elevation_max, distance_min, distance_max
        );

        let scratch = BatchScratch::with_capacity(config.batch_size);
        Ok(Self {
            config,
            node_count,
            part_count,
            elevation_min,
            elevation_max,
            distance_min,
            distance_max,
            image_bounds: RegionBounds::default(),
            nodes,
            reference: None,
            scratch,
        })
    }

    /// Capture the reference pose for the current tracking step.
    ///
    /// Per node: visible parts keep their observed center, visible
    /// root-like nodes take the root center, and occluded nodes fall back
    /// to the root center plus the node's nominal rest-pose offset.
    /// Image-space bounds are refreshed from the image dimensions.
    pub fn set_reference(
        &mut self,
        reference: &CandidateState,
        image: &impl ImageModel,
    ) -> Result<(), SamplerError> {
        if reference.centers.len() != self.node_count {
            return Err(SamplerError::DimensionMismatch {
                expected: self.node_count,
                actual: reference.centers.len(),
                context: "reference centers".to_string(),
            });
        }

        let (cols, rows) = image.image_size();
        self.image_bounds = RegionBounds::of_image(cols, rows);

        let root_center = reference.root_center;
        let mut centers: SmallVec<[Point2<f64>; 8]> = SmallVec::with_capacity(self.node_count);
        for pr in 0..self.node_count {
            let center = if !image.is_occluded(pr) {
                if pr < self.part_count {
                    reference.centers[pr]
                } else {
                    root_center
                }
            } else {
                root_center + image.nominal_part_offset(pr)
            };
            centers.push(center);
        }

        trace!(
            "reference set: root ({:.1}, {:.1}), azimuth {:.1}",
            root_center.x,
            root_center.y,
            reference.viewpoint.azimuth
        );

        self.reference = Some(ReferenceState {
            viewpoint: reference.viewpoint,
            root_center,
            root_bbox: reference.root_bbox,
            centers,
        });
        Ok(())
    }

    /// Draw one continuous viewpoint.
    ///
    /// In [`SamplingMode::Initialize`] all components are uniform over
    /// their full ranges; in [`SamplingMode::Refine`] they are Gaussian
    /// perturbations of the reference viewpoint. Azimuth is wrapped into
    /// [0, 360); elevation and distance are rejection-sampled against the
    /// object model's validity predicates, with distance clamped to its
    /// upper bound before each validity check in refinement.
    pub fn sample_viewpoint(
        &self,
        rng: &mut impl Rng,
        mode: SamplingMode,
        object: &impl ObjectModel,
    ) -> Result<Viewpoint, SamplerError> {
        match mode {
            SamplingMode::Initialize => {
                let azimuth = wrap_azimuth(rng.uniform(0.0, 360.0));
                let elevation = self.rejection_sample(
                    rng,
                    "elevation",
                    |rng| rng.uniform(self.elevation_min, self.elevation_max),
                    |v| object.is_valid_elevation(v),
                )?;
                let distance = self.rejection_sample(
                    rng,
                    "distance",
                    |rng| rng.uniform(self.distance_min, self.distance_max),
                    |v| object.is_valid_distance(v),
                )?;
                Ok(Viewpoint::new(azimuth, elevation, distance))
            }
            SamplingMode::Refine => {
                let reference = self.reference.as_ref().ok_or(SamplerError::MissingReference)?;
                let azimuth = wrap_azimuth(
                    rng.gaussian(self.config.std_azimuth) + reference.viewpoint.azimuth,
                );
                let elevation = self.rejection_sample(
                    rng,
                    "elevation",
                    |rng| rng.gaussian(self.config.std_elevation) + reference.viewpoint.elevation,
                    |v| object.is_valid_elevation(v),
                )?;
                let distance = self.rejection_sample(
                    rng,
                    "distance",
                    |rng| {
                        let d = rng.gaussian(self.config.std_distance)
                            + reference.viewpoint.distance;
                        // Clamp before validation; the overshoot past the
                        // open upper bound would otherwise never pass.
                        d.min(self.distance_max)
                    },
                    |v| object.is_valid_distance(v),
                )?;
                Ok(Viewpoint::new(azimuth, elevation, distance))
            }
        }
    }

    /// Draw root centers and bounding boxes for a batch of candidates.
    ///
    /// With a trusted detector prior (score above the configured
    /// confidence), roots are drawn in a tight Gaussian neighborhood of the
    /// reference root; otherwise uniformly over the image interior reduced
    /// by half the reference box, with box size perturbed only slightly.
    /// Centers falling outside the image are redrawn, up to the configured
    /// attempt cap per candidate. Box placement centers on the detector box
    /// size when a detector prior is supplied, else on the sampled size.
    pub fn sample_root_locations(
        &self,
        rng: &mut impl Rng,
        prior: &RootPrior,
        states: &mut [CandidateState],
    ) -> Result<(), SamplerError> {
        let reference = self.reference.as_ref().ok_or(SamplerError::MissingReference)?;
        let bounds = self.image_bounds;
        let ref_bbox = reference.root_bbox;
        let ref_root = reference.root_center;

        let trusted = matches!(
            prior,
            RootPrior::Detector { score, .. } if *score > self.config.detector_confidence
        );

        for state in states.iter_mut() {
            let mut accepted = false;
            for _ in 0..self.config.max_rejection_attempts {
                let (x, y, w, h) = if trusted {
                    (
                        (rng.gaussian(ref_bbox.width / 8.0) + ref_root.x).trunc(),
                        (rng.gaussian(ref_bbox.height / 8.0) + ref_root.y).trunc(),
                        (rng.gaussian(ref_bbox.width / 16.0) + ref_bbox.width).trunc(),
                        (rng.gaussian(ref_bbox.height / 16.0) + ref_bbox.height).trunc(),
                    )
                } else {
                    let x_lo = bounds.x_min as f64 + ref_bbox.width / 2.0;
                    let x_hi = bounds.x_max as f64 - ref_bbox.width / 2.0;
                    let y_lo = bounds.y_min as f64 + ref_bbox.height / 2.0;
                    let y_hi = bounds.y_max as f64 - ref_bbox.height / 2.0;
                    (
                        rng.uniform(x_lo, x_hi).trunc(),
                        rng.uniform(y_lo, y_hi).trunc(),
                        (rng.gaussian(ref_bbox.width / 32.0) + ref_bbox.width).trunc(),
                        (rng.gaussian(ref_bbox.height / 32.0) + ref_bbox.height).trunc(),
                    )
                };

                if bounds.contains(x as i64, y as i64) {
                    state.root_center = Point2::new(x, y);
                    let (box_w, box_h) = match prior {
                        RootPrior::Detector { width, height, .. } => (*width, *height),
                        RootPrior::Uninformed => (w, h),
                    };
                    state.root_bbox = Rect::new(x - box_w / 2.0, y - box_h / 2.0, w, h);
                    accepted = true;
                    break;
                }
            }
            if !accepted {
                return Err(SamplerError::RejectionLimitExceeded {
                    quantity: "root location",
                    attempts: self.config.max_rejection_attempts,
                });
            }
        }
        Ok(())
    }

    /// Propagate per-node truncated Gaussian offsets through the hierarchy
    /// for a batch of candidates.
    ///
    /// Nodes are processed in reverse index order so root-like nodes are
    /// sampled before the parts that hang off them; each candidate's running
    /// root starts at the reference root and is re-anchored whenever a
    /// root-type node is sampled. Visible nodes are perturbed in their
    /// rectified space and restored to image space; occluded nodes are set
    /// deterministically to the nominal rest-pose offset from the running
    /// root, with the rectified coordinate at the origin sentinel. Every
    /// node pass rewrites each candidate's aggregate bounding box.
    pub fn sample_part_centers(
        &mut self,
        rng: &mut impl Rng,
        image: &impl ImageModel,
        states: &mut [CandidateState],
    ) -> Result<(), SamplerError> {
        let Self {
            reference,
            nodes,
            scratch,
            node_count,
            part_count,
            ..
        } = self;
        let node_count = *node_count;
        let part_count = *part_count;
        let reference = reference.as_ref().ok_or(SamplerError::MissingReference)?;

        for state in states.iter() {
            if state.centers.len() != node_count {
                return Err(SamplerError::DimensionMismatch {
                    expected: node_count,
                    actual: state.centers.len(),
                    context: "candidate centers".to_string(),
                });
            }
        }

        let n = states.len();
        scratch.reset(n, reference.root_center);
        let BatchScratch {
            targets,
            rect_means,
            drawn,
            restored,
            roots,
        } = scratch;

        // Roots occupy the top indices: sample them first so dependent
        // parts see this traversal's root coordinates.
        for pr in (0..node_count).rev() {
            if !image.is_occluded(pr) {
                let relative = reference.centers[pr] - reference.root_center;

                targets.clear();
                targets.extend(roots.iter().map(|root| *root + relative));
                image.rectify_points(pr, targets, rect_means);

                // Rectified image size can change between poses.
                let (cols, rows) = image.rectified_size(pr);
                {
                    let node = &mut nodes[pr];
                    node.rect_bounds.x_max = cols as i32 - 1;
                    node.rect_bounds.y_max = rows as i32 - 1;
                }
                let node = &nodes[pr];

                #[cfg(not(feature = "rayon"))]
                {
                    drawn.clear();
                    for mean in rect_means.iter() {
                        drawn.push(sample_truncated_point(
                            rng,
                            &node.cdf_x,
                            &node.cdf_y,
                            *mean,
                            &node.rect_bounds,
                        ));
                    }
                }

                #[cfg(feature = "rayon")]
                {
                    // One stream draw seeds an independent per-candidate
                    // RNG; concurrent draws never share mutable state.
                    let base_seed = rng.next_u64();
                    drawn.clear();
                    drawn.resize(n, Point2::origin());
                    drawn
                        .par_iter_mut()
                        .zip(rect_means.par_iter())
                        .enumerate()
                        .for_each(|(s, (out, mean))| {
                            let mut rng = SimpleRng::new(
                                base_seed.wrapping_add(s as u64 * 0x9E37_79B9_7F4A_7C15),
                            );
                            *out = sample_truncated_point(
                                &mut rng,
                                &node.cdf_x,
                                &node.cdf_y,
                                *mean,
                                &node.rect_bounds,
                            );
                        });
                }

                image.unrectify_points(pr, drawn, restored);

                // A sampled root-type node re-anchors the running roots for
                // the shallower nodes still to come.
                if pr >= part_count {
                    for s in 0..n {
                        roots[s] = restored[s];
                        states[s].root_center = restored[s];
                    }
                }
            } else {
                let offset = image.nominal_part_offset(pr);
                restored.clear();
                restored.extend(roots.iter().map(|root| *root + offset));
                drawn.clear();
                drawn.resize(n, Point2::origin());
            }

            for (s, state) in states.iter_mut().enumerate() {
                state.centers[pr] = restored[s];
                state.rectified_centers[pr] = drawn[s];
                let bbox = image.bounding_box(state);
                state.bbox = bbox;
            }

            trace!(
                "node {} sampled ({})",
                pr,
                if image.is_occluded(pr) {
                    "occluded"
                } else {
                    "visible"
                }
            );
        }
        Ok(())
    }

    /// Whether a candidate pose leaves every visible node enough rectified
    /// room to sample in.
    ///
    /// Rejects poses under which some visible node's rectified image cannot
    /// contain the node's sampling window.
    pub fn is_valid_pose(&self, image: &impl ImageModel) -> bool {
        for pr in 0..self.node_count {
            if !image.is_occluded(pr) {
                let (cols, rows) = image.rectified_size(pr);
                let bounds = self.nodes[pr].rect_bounds;
                if (bounds.x_min as i64) * 2 >= cols as i64
                    || (bounds.y_min as i64) * 2 >= rows as i64
                {
                    return false;
                }
            }
        }
        true
    }

    /// Bounded rejection loop shared by the viewpoint components.
    fn rejection_sample<R: Rng>(
        &self,
        rng: &mut R,
        quantity: &'static str,
        mut draw: impl FnMut(&mut R) -> f64,
        accept: impl Fn(f64) -> bool,
    ) -> Result<f64, SamplerError> {
        for _ in 0..self.config.max_rejection_attempts {
            let value = draw(rng);
            if accept(value) {
                return Ok(value);
            }
        }
        Err(SamplerError::RejectionLimitExceeded {
            quantity,
            attempts: self.config.max_rejection_attempts,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Total number of hierarchy nodes
    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Number of deformable part nodes
    #[inline]
    pub fn part_count(&self) -> usize {
        self.part_count
    }

    /// Derived (x, y) proposal std-dev of a node
    #[inline]
    pub fn node_std_dev(&self, node: usize) -> (f64, f64) {
        (self.nodes[node].std_x, self.nodes[node].std_y)
    }

    /// Elevation sampling bounds (min, max)
    #[inline]
    pub fn elevation_bounds(&self) -> (f64, f64) {
        (self.elevation_min, self.elevation_max)
    }

    /// Distance sampling bounds (min, max)
    #[inline]
    pub fn distance_bounds(&self) -> (f64, f64) {
        (self.distance_min, self.distance_max)
    }

    /// Image-space sampling bounds from the last `set_reference`
    #[inline]
    pub fn image_bounds(&self) -> RegionBounds {
        self.image_bounds
    }

    /// Rectified-space bounds a node last sampled under
    #[inline]
    pub fn rectified_bounds(&self, node: usize) -> RegionBounds {
        self.nodes[node].rect_bounds
    }

    /// The engine's configuration
    #[inline]
    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// The captured reference state, if any
    #[inline]
    pub fn reference(&self) -> Option<&ReferenceState> {
        self.reference.as_ref()
    }

    /// Snapshot of the effective configuration, including quantities
    /// derived from the object model.
    pub fn config_snapshot(&self) -> SamplerConfigSnapshot {
        SamplerConfigSnapshot {
            batch_size: self.config.batch_size,
            std_azimuth: self.config.std_azimuth,
            std_elevation: self.config.std_elevation,
            std_distance: self.config.std_distance,
            detector_confidence: self.config.detector_confidence,
            max_rejection_attempts: self.config.max_rejection_attempts,
            node_count: self.node_count,
            part_count: self.part_count,
            node_std_devs: self.nodes.iter().map(|n| (n.std_x, n.std_y)).collect(),
            elevation_bounds: (self.elevation_min, self.elevation_max),
            distance_bounds: (self.distance_min, self.distance_max),
        }
    }
}

/// Re-tag a table-build error with the node and axis it came from.
fn node_axis_context(err: SamplerError, node: usize, axis: &str) -> SamplerError {
    match err {
        SamplerError::NonPositiveStdDev { std_dev, .. } => SamplerError::NonPositiveStdDev {
            std_dev,
            context: format!("node {} {}-axis", node, axis),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::rng::SimpleRng;
    use nalgebra::Vector2;

    struct GridObject {
        parts: usize,
        dims: Vec<(f64, f64)>,
        elevation: Vec<f64>,
        distance: Vec<f64>,
        reject_elevation: bool,
    }

    impl GridObject {
        /// One 40x40 part under one 100x100 root
        fn two_node() -> Self {
            Self {
                parts: 1,
                dims: vec![(40.0, 40.0), (100.0, 100.0)],
                elevation: vec![0.0, 15.0, 30.0],
                distance: vec![3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0],
                reject_elevation: false,
            }
        }
    }

    impl ObjectModel for GridObject {
        fn node_count(&self) -> usize {
            self.dims.len()
        }
        fn part_count(&self) -> usize {
            self.parts
        }
        fn elevation_grid(&self) -> &[f64] {
            &self.elevation
        }
        fn distance_grid(&self) -> &[f64] {
            &self.distance
        }
        fn node_front_dimensions(&self, node: usize) -> (f64, f64) {
            self.dims[node]
        }
        fn is_valid_elevation(&self, elevation: f64) -> bool {
            !self.reject_elevation
                && elevation >= self.elevation[0] - 10.0
                && elevation <= self.elevation[self.elevation.len() - 1] + 10.0
        }
        fn is_valid_distance(&self, distance: f64) -> bool {
            distance >= self.distance[0] && distance <= self.distance[self.distance.len() - 1]
        }
    }

    struct FlatImage {
        cols: usize,
        rows: usize,
        rect: (usize, usize),
        occluded: Vec<bool>,
        offsets: Vec<Vector2<f64>>,
    }

    impl FlatImage {
        /// Identity rectification over a 320x240 image
        fn new(node_count: usize) -> Self {
            Self {
                cols: 320,
                rows: 240,
                rect: (320, 240),
                occluded: vec![false; node_count],
                offsets: vec![Vector2::zeros(); node_count],
            }
        }
    }

    impl ImageModel for FlatImage {
        fn is_occluded(&self, node: usize) -> bool {
            self.occluded[node]
        }
        fn image_size(&self) -> (usize, usize) {
            (self.cols, self.rows)
        }
        fn rectified_size(&self, _node: usize) -> (usize, usize) {
            self.rect
        }
        fn rectify_points(&self, _node: usize, points: &[Point2<f64>], out: &mut Vec<Point2<f64>>) {
            out.clear();
            out.extend_from_slice(points);
        }
        fn unrectify_points(
            &self,
            _node: usize,
            points: &[Point2<f64>],
            out: &mut Vec<Point2<f64>>,
        ) {
            out.clear();
            out.extend_from_slice(points);
        }
        fn nominal_part_offset(&self, node: usize) -> Vector2<f64> {
            self.offsets[node]
        }
        fn bounding_box(&self, state: &CandidateState) -> Rect {
            let mut x_min = f64::MAX;
            let mut y_min = f64::MAX;
            let mut x_max = f64::MIN;
            let mut y_max = f64::MIN;
            for center in &state.centers {
                x_min = x_min.min(center.x);
                y_min = y_min.min(center.y);
                x_max = x_max.max(center.x);
                y_max = y_max.max(center.y);
            }
            Rect::new(x_min, y_min, x_max - x_min, y_max - y_min)
        }
    }

    fn reference_state() -> CandidateState {
        let mut reference = CandidateState::new(2);
        reference.viewpoint = Viewpoint::new(0.0, 10.0, 9.0);
        reference.root_center = Point2::new(160.0, 120.0);
        reference.root_bbox = Rect::new(120.0, 90.0, 80.0, 60.0);
        reference.centers[0] = Point2::new(170.0, 125.0);
        reference.centers[1] = Point2::new(160.0, 120.0);
        reference
    }

    fn ready_engine(image: &FlatImage) -> SamplingEngine {
        let mut engine =
            SamplingEngine::new(SamplingConfig::default(), &GridObject::two_node()).unwrap();
        engine.set_reference(&reference_state(), image).unwrap();
        engine
    }

    #[test]
    fn test_wrap_azimuth() {
        assert_eq!(wrap_azimuth(-10.0), 350.0);
        assert_eq!(wrap_azimuth(370.0), 10.0);
        assert_eq!(wrap_azimuth(725.0), 5.0);
        assert_eq!(wrap_azimuth(-725.0), 355.0);
        assert_eq!(wrap_azimuth(0.0), 0.0);
        assert_eq!(wrap_azimuth(359.5), 359.5);
    }

    #[test]
    fn test_construction_derives_std_devs() {
        let engine =
            SamplingEngine::new(SamplingConfig::default(), &GridObject::two_node()).unwrap();
        assert_eq!(engine.node_count(), 2);
        assert_eq!(engine.part_count(), 1);
        assert_eq!(engine.node_std_dev(0), (10.0, 10.0));
        assert_eq!(engine.node_std_dev(1), (3.125, 3.125));
        assert_eq!(engine.elevation_bounds(), (0.0, 22.5));
        assert_eq!(engine.distance_bounds(), (3.0, 15.0));
    }

    #[test]
    fn test_construction_rejects_short_grid() {
        let mut object = GridObject::two_node();
        object.elevation = vec![0.0];
        assert!(matches!(
            SamplingEngine::new(SamplingConfig::default(), &object),
            Err(SamplerError::Configuration { .. })
        ));
    }

    #[test]
    fn test_construction_rejects_degenerate_dimensions() {
        let mut object = GridObject::two_node();
        object.dims[0] = (0.0, 40.0);
        let err = SamplingEngine::new(SamplingConfig::default(), &object).unwrap_err();
        match err {
            SamplerError::NonPositiveStdDev { context, .. } => {
                assert!(context.contains("node 0 x-axis"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_set_reference_center_selection() {
        let image = FlatImage::new(2);
        let engine = ready_engine(&image);
        let reference = engine.reference().unwrap();

        // Visible part keeps its observed center, root-like node takes the
        // root center
        assert_eq!(reference.centers[0], Point2::new(170.0, 125.0));
        assert_eq!(reference.centers[1], Point2::new(160.0, 120.0));
        assert_eq!(engine.image_bounds(), RegionBounds::new(0, 319, 0, 239));
    }

    #[test]
    fn test_set_reference_occluded_uses_nominal_offset() {
        let mut image = FlatImage::new(2);
        image.occluded[0] = true;
        image.offsets[0] = Vector2::new(5.0, -5.0);
        let engine = ready_engine(&image);

        assert_eq!(
            engine.reference().unwrap().centers[0],
            Point2::new(165.0, 115.0)
        );
    }

    #[test]
    fn test_set_reference_dimension_mismatch() {
        let mut engine =
            SamplingEngine::new(SamplingConfig::default(), &GridObject::two_node()).unwrap();
        let image = FlatImage::new(3);
        let err = engine
            .set_reference(&CandidateState::new(3), &image)
            .unwrap_err();
        assert!(matches!(err, SamplerError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_sample_viewpoint_initialize_in_bounds() {
        let object = GridObject::two_node();
        let engine = SamplingEngine::new(SamplingConfig::default(), &object).unwrap();
        let mut rng = SimpleRng::new(42);

        for _ in 0..200 {
            let vp = engine
                .sample_viewpoint(&mut rng, SamplingMode::Initialize, &object)
                .unwrap();
            assert!(vp.azimuth >= 0.0 && vp.azimuth < 360.0);
            assert!(vp.elevation >= 0.0 && vp.elevation < 22.5);
            assert!(object.is_valid_elevation(vp.elevation));
            assert!(object.is_valid_distance(vp.distance));
        }
    }

    #[test]
    fn test_sample_viewpoint_refine_requires_reference() {
        let object = GridObject::two_node();
        let engine = SamplingEngine::new(SamplingConfig::default(), &object).unwrap();
        let mut rng = SimpleRng::new(42);
        assert!(matches!(
            engine.sample_viewpoint(&mut rng, SamplingMode::Refine, &object),
            Err(SamplerError::MissingReference)
        ));
    }

    #[test]
    fn test_sample_viewpoint_refine_wraps_and_clamps() {
        let object = GridObject::two_node();
        let image = FlatImage::new(2);
        let mut engine = ready_engine(&image);
        // Reference azimuth next to the wrap point so perturbations cross it
        let mut reference = reference_state();
        reference.viewpoint.azimuth = 359.0;
        reference.viewpoint.distance = 14.5;
        engine.set_reference(&reference, &image).unwrap();

        let mut rng = SimpleRng::new(7);
        for _ in 0..500 {
            let vp = engine
                .sample_viewpoint(&mut rng, SamplingMode::Refine, &object)
                .unwrap();
            assert!(vp.azimuth >= 0.0 && vp.azimuth < 360.0);
            assert!(vp.distance <= 15.0, "distance must clamp to the grid max");
            assert!(object.is_valid_elevation(vp.elevation));
            assert!(object.is_valid_distance(vp.distance));
        }
    }

    #[test]
    fn test_rejection_limit_surfaces() {
        let mut object = GridObject::two_node();
        object.reject_elevation = true;
        let config = SamplingConfig::builder().max_rejection_attempts(50).build();
        let engine = SamplingEngine::new(config, &object).unwrap();
        let mut rng = SimpleRng::new(42);

        let err = engine
            .sample_viewpoint(&mut rng, SamplingMode::Initialize, &object)
            .unwrap_err();
        match err {
            SamplerError::RejectionLimitExceeded { quantity, attempts } => {
                assert_eq!(quantity, "elevation");
                assert_eq!(attempts, 50);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_root_locations_require_reference() {
        let engine =
            SamplingEngine::new(SamplingConfig::default(), &GridObject::two_node()).unwrap();
        let mut rng = SimpleRng::new(42);
        let mut batch = CandidateState::batch(2, 4);
        assert!(matches!(
            engine.sample_root_locations(&mut rng, &RootPrior::Uninformed, &mut batch),
            Err(SamplerError::MissingReference)
        ));
    }

    #[test]
    fn test_root_locations_uninformed_in_bounds() {
        let image = FlatImage::new(2);
        let engine = ready_engine(&image);
        let mut rng = SimpleRng::new(42);
        let mut batch = CandidateState::batch(2, 200);

        engine
            .sample_root_locations(&mut rng, &RootPrior::Uninformed, &mut batch)
            .unwrap();

        for state in &batch {
            let bounds = engine.image_bounds();
            assert!(bounds.contains(state.root_center.x as i64, state.root_center.y as i64));
            // Box placement centers on the sampled size
            assert!(
                (state.root_bbox.x + state.root_bbox.width / 2.0 - state.root_center.x).abs()
                    < 1e-9
            );
            // Box size stays near the reference size (sigma = dim/32)
            assert!((state.root_bbox.width - 80.0).abs() < 20.0);
            assert!((state.root_bbox.height - 60.0).abs() < 20.0);
        }
    }

    #[test]
    fn test_root_locations_trusted_detector_tight() {
        let image = FlatImage::new(2);
        let engine = ready_engine(&image);
        let mut rng = SimpleRng::new(42);
        let mut batch = CandidateState::batch(2, 500);
        let prior = RootPrior::Detector {
            width: 80.0,
            height: 60.0,
            score: 0.9,
        };

        engine
            .sample_root_locations(&mut rng, &prior, &mut batch)
            .unwrap();

        let mean_x: f64 = batch.iter().map(|s| s.root_center.x).sum::<f64>() / 500.0;
        let mean_y: f64 = batch.iter().map(|s| s.root_center.y).sum::<f64>() / 500.0;
        assert!(
            (mean_x - 160.0).abs() < 5.0,
            "trusted roots should cluster at the reference root, mean x {}",
            mean_x
        );
        assert!((mean_y - 120.0).abs() < 5.0);

        for state in &batch {
            // Placement centers on the detector box size
            assert!((state.root_bbox.x - (state.root_center.x - 40.0)).abs() < 1e-9);
            assert!((state.root_bbox.y - (state.root_center.y - 30.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_part_centers_require_reference() {
        let mut engine =
            SamplingEngine::new(SamplingConfig::default(), &GridObject::two_node()).unwrap();
        let image = FlatImage::new(2);
        let mut rng = SimpleRng::new(42);
        let mut batch = CandidateState::batch(2, 4);
        assert!(matches!(
            engine.sample_part_centers(&mut rng, &image, &mut batch),
            Err(SamplerError::MissingReference)
        ));
    }

    #[test]
    fn test_part_centers_dimension_mismatch() {
        let image = FlatImage::new(2);
        let mut engine = ready_engine(&image);
        let mut rng = SimpleRng::new(42);
        let mut batch = CandidateState::batch(3, 4);
        assert!(matches!(
            engine.sample_part_centers(&mut rng, &image, &mut batch),
            Err(SamplerError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_part_centers_root_propagation() {
        let image = FlatImage::new(2);
        let mut engine = ready_engine(&image);
        let mut rng = SimpleRng::new(42);
        let mut batch = CandidateState::batch(2, 100);

        engine.sample_part_centers(&mut rng, &image, &mut batch).unwrap();

        for state in &batch {
            // The sampled root-type node becomes the candidate root
            assert_eq!(state.root_center, state.centers[1]);
            // The part offset is re-anchored on this candidate's root:
            // reference offset (10, 5) plus truncated part noise
            let anchored = state.root_center + Vector2::new(10.0, 5.0);
            assert!(
                (state.centers[0].x - anchored.x).abs() <= 31.0,
                "part x {} strayed from anchor {}",
                state.centers[0].x,
                anchored.x
            );
            assert!((state.centers[0].y - anchored.y).abs() <= 31.0);
            // Rectified coordinates stay inside the rectified image
            assert!(engine
                .rectified_bounds(0)
                .contains(state.rectified_centers[0].x as i64, state.rectified_centers[0].y as i64));
        }
    }

    #[test]
    fn test_part_centers_rect_bounds_refreshed() {
        let image = FlatImage::new(2);
        let mut engine = ready_engine(&image);
        let mut rng = SimpleRng::new(42);
        let mut batch = CandidateState::batch(2, 8);

        engine.sample_part_centers(&mut rng, &image, &mut batch).unwrap();

        assert_eq!(engine.rectified_bounds(0), RegionBounds::new(0, 319, 0, 239));
        assert_eq!(engine.rectified_bounds(1), RegionBounds::new(0, 319, 0, 239));
    }

    #[test]
    fn test_part_centers_occluded_deterministic() {
        let mut image = FlatImage::new(2);
        image.occluded = vec![true, true];
        image.offsets[0] = Vector2::new(12.0, -8.0);
        let mut engine = ready_engine(&image);

        let mut batch_a = CandidateState::batch(2, 16);
        let mut batch_b = CandidateState::batch(2, 16);
        let mut rng_a = SimpleRng::new(1);
        let mut rng_b = SimpleRng::new(999);

        engine.sample_part_centers(&mut rng_a, &image, &mut batch_a).unwrap();
        engine.sample_part_centers(&mut rng_b, &image, &mut batch_b).unwrap();

        for (a, b) in batch_a.iter().zip(batch_b.iter()) {
            assert_eq!(a.centers[0], b.centers[0]);
            assert_eq!(a.centers[0], Point2::new(172.0, 112.0));
            // Occluded nodes carry the origin sentinel in rectified space
            assert_eq!(a.rectified_centers[0], Point2::origin());
        }
    }

    #[test]
    fn test_part_centers_update_bbox() {
        let image = FlatImage::new(2);
        let mut engine = ready_engine(&image);
        let mut rng = SimpleRng::new(5);
        let mut batch = CandidateState::batch(2, 10);

        engine.sample_part_centers(&mut rng, &image, &mut batch).unwrap();

        for state in &batch {
            let expected = image.bounding_box(state);
            assert_eq!(state.bbox, expected);
        }
    }

    #[test]
    fn test_is_valid_pose() {
        let image = FlatImage::new(2);
        let engine = ready_engine(&image);
        assert!(engine.is_valid_pose(&image));

        let mut degenerate = FlatImage::new(2);
        degenerate.rect = (0, 0);
        assert!(!engine.is_valid_pose(&degenerate));
    }

    #[test]
    fn test_config_snapshot_reflects_derivations() {
        let image = FlatImage::new(2);
        let engine = ready_engine(&image);
        let snapshot = engine.config_snapshot();

        assert_eq!(snapshot.node_count, 2);
        assert_eq!(snapshot.part_count, 1);
        assert_eq!(snapshot.node_std_devs, vec![(10.0, 10.0), (3.125, 3.125)]);
        assert_eq!(snapshot.elevation_bounds, (0.0, 22.5));
        assert!(snapshot.to_json().contains("\"part_count\":1"));
    }
}
