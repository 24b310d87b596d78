//! Sampling configuration
//!
//! Batch size, viewpoint proposal std-devs, and the policy knobs that were
//! process-wide globals in earlier designs.

use serde::Serialize;

/// Tuning parameters for a [`crate::SamplingEngine`].
///
/// Per-node positional std-devs are not configured here; they derive from
/// each node's front-facing dimensions at engine construction.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Number of candidate states the engine's scratch buffers are sized for
    pub batch_size: usize,
    /// Azimuth proposal std-dev, degrees
    pub std_azimuth: f64,
    /// Elevation proposal std-dev, degrees
    pub std_elevation: f64,
    /// Distance proposal std-dev, model units
    pub std_distance: f64,
    /// Detector-score threshold above which root proposals trust the
    /// detector prior
    pub detector_confidence: f64,
    /// Cap on rejection-loop attempts before a draw fails with
    /// [`crate::SamplerError::RejectionLimitExceeded`]
    pub max_rejection_attempts: usize,
}

impl SamplingConfig {
    /// Create a new configuration
    pub fn new(
        batch_size: usize,
        std_azimuth: f64,
        std_elevation: f64,
        std_distance: f64,
    ) -> Self {
        Self {
            batch_size,
            std_azimuth,
            std_elevation,
            std_distance,
            detector_confidence: super::DEFAULT_DETECTOR_CONFIDENCE,
            max_rejection_attempts: super::DEFAULT_MAX_REJECTION_ATTEMPTS,
        }
    }

    /// Create with builder pattern
    pub fn builder() -> SamplingConfigBuilder {
        SamplingConfigBuilder::default()
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            batch_size: super::DEFAULT_BATCH_SIZE,
            std_azimuth: super::DEFAULT_STD_AZIMUTH,
            std_elevation: super::DEFAULT_STD_ELEVATION,
            std_distance: super::DEFAULT_STD_DISTANCE,
            detector_confidence: super::DEFAULT_DETECTOR_CONFIDENCE,
            max_rejection_attempts: super::DEFAULT_MAX_REJECTION_ATTEMPTS,
        }
    }
}

/// Builder for SamplingConfig
#[derive(Debug, Default)]
pub struct SamplingConfigBuilder {
    batch_size: Option<usize>,
    std_azimuth: Option<f64>,
    std_elevation: Option<f64>,
    std_distance: Option<f64>,
    detector_confidence: Option<f64>,
    max_rejection_attempts: Option<usize>,
}

impl SamplingConfigBuilder {
    /// Set the batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the azimuth proposal std-dev
    pub fn std_azimuth(mut self, std_azimuth: f64) -> Self {
        self.std_azimuth = Some(std_azimuth);
        self
    }

    /// Set the elevation proposal std-dev
    pub fn std_elevation(mut self, std_elevation: f64) -> Self {
        self.std_elevation = Some(std_elevation);
        self
    }

    /// Set the distance proposal std-dev
    pub fn std_distance(mut self, std_distance: f64) -> Self {
        self.std_distance = Some(std_distance);
        self
    }

    /// Set the detector confidence threshold
    pub fn detector_confidence(mut self, detector_confidence: f64) -> Self {
        self.detector_confidence = Some(detector_confidence);
        self
    }

    /// Set the rejection-loop attempt cap
    pub fn max_rejection_attempts(mut self, max_rejection_attempts: usize) -> Self {
        self.max_rejection_attempts = Some(max_rejection_attempts);
        self
    }

    /// Build the configuration
    pub fn build(self) -> SamplingConfig {
        SamplingConfig {
            batch_size: self.batch_size.unwrap_or(super::DEFAULT_BATCH_SIZE),
            std_azimuth: self.std_azimuth.unwrap_or(super::DEFAULT_STD_AZIMUTH),
            std_elevation: self.std_elevation.unwrap_or(super::DEFAULT_STD_ELEVATION),
            std_distance: self.std_distance.unwrap_or(super::DEFAULT_STD_DISTANCE),
            detector_confidence: self
                .detector_confidence
                .unwrap_or(super::DEFAULT_DETECTOR_CONFIDENCE),
            max_rejection_attempts: self
                .max_rejection_attempts
                .unwrap_or(super::DEFAULT_MAX_REJECTION_ATTEMPTS),
        }
    }
}

// ============================================================================
// Configuration Snapshots (for debugging/comparison)
// ============================================================================

/// Snapshot of an engine's effective sampling configuration.
///
/// Captures both the caller-supplied knobs and the quantities derived from
/// the object model at construction, making it easy to compare runs across
/// implementations.
#[derive(Debug, Clone, Serialize)]
pub struct SamplerConfigSnapshot {
    /// Batch size the scratch buffers are sized for
    pub batch_size: usize,
    /// Azimuth proposal std-dev
    pub std_azimuth: f64,
    /// Elevation proposal std-dev
    pub std_elevation: f64,
    /// Distance proposal std-dev
    pub std_distance: f64,
    /// Detector confidence threshold
    pub detector_confidence: f64,
    /// Rejection-loop attempt cap
    pub max_rejection_attempts: usize,
    /// Number of hierarchy nodes
    pub node_count: usize,
    /// Number of deformable parts
    pub part_count: usize,
    /// Derived per-node (x, y) proposal std-devs
    pub node_std_devs: Vec<(f64, f64)>,
    /// Elevation sampling bounds (min, max)
    pub elevation_bounds: (f64, f64),
    /// Distance sampling bounds (min, max)
    pub distance_bounds: (f64, f64),
}

impl SamplerConfigSnapshot {
    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Serialize to pretty-printed JSON string
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
