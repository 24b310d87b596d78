//! Collaborator contracts consumed by the sampling engine
//!
//! The 3D object model and the per-pose 2D image model are external
//! collaborators; the engine only calls through these traits and never
//! manages their lifecycles.

use nalgebra::{Point2, Vector2};

use super::types::{CandidateState, Rect};

/// Geometry and topology of the tracked articulated 3D object.
///
/// Nodes are indexed `[0, node_count)`: indices below [`part_count`]
/// are deformable parts, the rest are roots.
///
/// [`part_count`]: ObjectModel::part_count
pub trait ObjectModel {
    /// Total number of hierarchy nodes (parts plus roots)
    fn node_count(&self) -> usize;

    /// Number of deformable part nodes
    fn part_count(&self) -> usize;

    /// Discretized elevation grid, ascending, at least two entries
    fn elevation_grid(&self) -> &[f64];

    /// Discretized distance grid, ascending, at least two entries
    fn distance_grid(&self) -> &[f64];

    /// Front-facing (width, height) of a node, in pixels
    fn node_front_dimensions(&self, node: usize) -> (f64, f64);

    /// Whether an elevation value lies in the externally defined acceptance
    /// region
    fn is_valid_elevation(&self, elevation: f64) -> bool;

    /// Whether a distance value lies in the externally defined acceptance
    /// region
    fn is_valid_distance(&self, distance: f64) -> bool;
}

/// Per-pose 2D image geometry: occlusion, rectification, bounding boxes.
///
/// Rectified space is a per-node normalized frame with perspective and scale
/// effects of the current viewpoint removed; its extent can change between
/// poses, so the engine re-reads [`rectified_size`] on every sampling pass.
///
/// [`rectified_size`]: ImageModel::rectified_size
pub trait ImageModel {
    /// Whether a node is occluded under the current pose
    fn is_occluded(&self, node: usize) -> bool;

    /// Source image size as (cols, rows)
    fn image_size(&self) -> (usize, usize);

    /// Rectified image size for a node as (cols, rows)
    fn rectified_size(&self, node: usize) -> (usize, usize);

    /// Map image-space points into a node's rectified space.
    ///
    /// Clears and fills `out`; `out` is a caller-owned scratch buffer so
    /// batch transforms do not allocate per call.
    fn rectify_points(&self, node: usize, points: &[Point2<f64>], out: &mut Vec<Point2<f64>>);

    /// Map rectified-space points back into image space.
    ///
    /// Clears and fills `out`, same contract as [`rectify_points`].
    ///
    /// [`rectify_points`]: ImageModel::rectify_points
    fn unrectify_points(&self, node: usize, points: &[Point2<f64>], out: &mut Vec<Point2<f64>>);

    /// Canonical rest-pose offset of a node's center from the root center,
    /// image space. Stands in for the unobservable center of an occluded
    /// node.
    fn nominal_part_offset(&self, node: usize) -> Vector2<f64>;

    /// Aggregate bounding box over a candidate's parts and roots
    fn bounding_box(&self, state: &CandidateState) -> Rect;
}
