/*!
# Proposal sampling for articulated-object particle filters

Given a reference pose of an articulated 3D object (viewpoint plus per-part
2D image positions), this crate generates batches of perturbed candidate
poses by sampling continuous viewpoint parameters and 2D part-center offsets
from per-part truncated Gaussian distributions.

Per-sample Gaussian evaluation is replaced by a precomputed discretized-CDF
inverse-transform sampler that supports truncation to a validity interval
without re-normalizing at draw time. Sampled offsets propagate from the root
node down through dependent part nodes in hierarchy order, respecting the
occlusion flags and rectification transforms supplied by the caller's object
and image models.

## Features

- Discretized Gaussian CDF tables built once per node, O(1) truncated draws
- Viewpoint sampling with circular azimuth and bounded elevation/distance
- Root-location proposals with an optional detector prior
- Hierarchical part-center propagation over a candidate batch
- Deterministic sampling from a caller-supplied RNG stream

## Modules

- [`sampler`] - CDF tables, truncated draws, and the sampling engine
- [`common`] - Low-level utilities (RNG)

## Example

```rust,no_run
use articulated_pose_sampler_rs::{
    CandidateState, RootPrior, SamplingConfig, SamplingEngine, SamplingMode, SimpleRng,
};
# use articulated_pose_sampler_rs::{ImageModel, ObjectModel};
# fn example(object: &impl ObjectModel, image: &impl ImageModel, reference: &CandidateState) {
let config = SamplingConfig::builder().batch_size(1000).build();
let mut engine = SamplingEngine::new(config, object).unwrap();
let mut rng = SimpleRng::new(42);

engine.set_reference(reference, image).unwrap();
let mut batch = CandidateState::batch(engine.node_count(), 1000);
for state in &mut batch {
    state.viewpoint = engine
        .sample_viewpoint(&mut rng, SamplingMode::Refine, object)
        .unwrap();
}
engine
    .sample_root_locations(&mut rng, &RootPrior::Uninformed, &mut batch)
    .unwrap();
engine.sample_part_centers(&mut rng, image, &mut batch).unwrap();
# }
```
*/

// ============================================================================
// Core modules
// ============================================================================

/// Proposal sampling: CDF tables, truncated draws, and the engine
pub mod sampler;

/// Low-level utilities (RNG)
pub mod common;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Core types
pub use sampler::{
    CandidateState, CdfTable, Rect, RegionBounds, RootPrior, SamplerConfigSnapshot,
    SamplingConfig, SamplingEngine, SamplingMode, Viewpoint,
};

// Errors
pub use sampler::SamplerError;

// Collaborator traits
pub use sampler::traits::{ImageModel, ObjectModel};

// RNG
pub use common::rng::{Rng, SimpleRng};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
