//! Shared mock collaborators for integration tests.

use nalgebra::{Point2, Vector2};

use articulated_pose_sampler_rs::{CandidateState, ImageModel, ObjectModel, Rect};

/// Configurable articulated-object model backed by plain vectors.
pub struct SceneObject {
    pub parts: usize,
    pub dims: Vec<(f64, f64)>,
    pub elevation: Vec<f64>,
    pub distance: Vec<f64>,
}

impl SceneObject {
    /// Hierarchy of one 40x40 part under one 100x100 root.
    pub fn part_and_root() -> Self {
        Self {
            parts: 1,
            dims: vec![(40.0, 40.0), (100.0, 100.0)],
            elevation: vec![0.0, 15.0, 30.0],
            distance: vec![3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0],
        }
    }
}

impl ObjectModel for SceneObject {
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
        elevation >= self.elevation[0] && elevation <= self.elevation[self.elevation.len() - 1]
    }

    fn is_valid_distance(&self, distance: f64) -> bool {
        distance >= self.distance[0] && distance <= self.distance[self.distance.len() - 1]
    }
}

/// Image model with near-identity rectification: rectified space is the
/// image shifted by a constant offset, so rectify/unrectify are exact
/// inverses and Gaussian noise keeps its scale across the transform.
pub struct SceneImage {
    pub cols: usize,
    pub rows: usize,
    pub rect_cols: usize,
    pub rect_rows: usize,
    pub shift: Vector2<f64>,
    pub occluded: Vec<bool>,
    pub offsets: Vec<Vector2<f64>>,
}

impl SceneImage {
    pub fn new(node_count: usize, cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            rect_cols: cols,
            rect_rows: rows,
            shift: Vector2::new(4.0, 6.0),
            occluded: vec![false; node_count],
            offsets: vec![Vector2::zeros(); node_count],
        }
    }
}

impl ImageModel for SceneImage {
    fn is_occluded(&self, node: usize) -> bool {
        self.occluded[node]
    }

    fn image_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    fn rectified_size(&self, _node: usize) -> (usize, usize) {
        (self.rect_cols, self.rect_rows)
    }

    fn rectify_points(&self, _node: usize, points: &[Point2<f64>], out: &mut Vec<Point2<f64>>) {
        out.clear();
        out.extend(points.iter().map(|p| *p - self.shift));
    }

    fn unrectify_points(&self, _node: usize, points: &[Point2<f64>], out: &mut Vec<Point2<f64>>) {
        out.clear();
        out.extend(points.iter().map(|p| *p + self.shift));
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

/// Initialize test logging; safe to call from every test.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Empirical mean and standard deviation of a sample.
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}
