/*!
# Multi-camera 3D marker tracking

Estimates the time-varying 3D position of point markers from noisy 2D
projections captured by several fixed, calibrated cameras. Each marker is
tracked by its own extended Kalman filter, fed asynchronously by a
measurement router with one execution context per marker.

## Modules

- [`models`] - Motion model and affine camera measurement model
- [`ekf`] - Per-marker EKF: predict/update recursion with timestep gating
- [`router`] - Observation validation, marker selection, dispatch
- [`harness`] - Batch runs over a full observation stream
- [`synth`] - Seeded synthetic scene and observation generation
- [`errors`] - Filter-level and run-level error types
- [`types`] - Observation records and run reports

## Example

```rust
use multicam_ekf_tracker_rs::{CameraModel, Ekf, EkfConfig};
use nalgebra::{Matrix3, Vector2, Vector3};

// Identity projection: the camera observes the x and y coordinates
let camera = CameraModel::from_parts(Matrix3::identity(), Vector3::zeros());

let mut ekf = Ekf::new(EkfConfig::default());
ekf.fuse(&Vector2::new(1.0, 1.0), &camera, 1).unwrap();

assert!((ekf.state().x - 1.0).abs() < 1e-3);
```

Running a whole dataset concurrently:

```rust
use multicam_ekf_tracker_rs::{BatchHarness, HarnessConfig, SceneConfig, generate_scene};

let scene = generate_scene(&SceneConfig {
    num_markers: 2,
    num_frames: 10,
    num_cameras: 3,
    seed: Some(7),
    ..SceneConfig::default()
});

let harness = BatchHarness::new(HarnessConfig {
    num_markers: 2,
    ..HarnessConfig::default()
});
let report = harness.run(&scene.cameras, &scene.observations).unwrap();
assert_eq!(report.markers.len(), 2);
```
*/

pub mod ekf;
pub mod errors;
pub mod harness;
pub mod linalg;
pub mod models;
pub mod router;
pub mod synth;
pub mod types;

mod worker;

pub use ekf::{CovariancePolicy, Ekf, EkfConfig, StalePolicy};
pub use errors::{FilterError, RunError};
pub use harness::{BatchHarness, HarnessConfig};
pub use models::{CameraModel, MotionModel};
pub use router::{DispatchOrder, MarkerSelection, RouterConfig};
pub use synth::{generate_scene, SceneConfig, SyntheticScene};
pub use types::{BatchReport, CameraId, MarkerId, MarkerReport, Observation, Timestep};
