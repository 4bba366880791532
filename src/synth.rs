//! Synthetic scene and observation generation
//!
//! Produces ground-truth marker clouds, cameras on a sphere looking at the
//! origin, and the flattened per-camera 2D observation stream the tracking
//! pipeline consumes. A pure seeded function: same seed, same scene.

use std::f64::consts::{PI, TAU};

use nalgebra::{Vector2, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::models::CameraModel;
use crate::types::{Observation, Timestep};

/// Scenario parameters for synthetic data generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneConfig {
    /// How many markers to track
    pub num_markers: usize,
    /// How many timesteps to generate
    pub num_frames: usize,
    /// How many cameras observe the scene
    pub num_cameras: usize,
    /// Per-axis distance each marker moves per frame
    pub frame_delta: f64,
    /// Side length of the cubic domain markers start in
    pub domain: f64,
    /// Minimum pairwise marker distance in the first frame
    pub min_separation: f64,
    /// Standard deviation of Gaussian noise added to each measurement
    /// component; zero for noiseless projections
    pub measurement_noise_std: f64,
    /// RNG seed; `None` derives one from the wall clock
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            num_markers: 10,
            num_frames: 100,
            num_cameras: 10,
            frame_delta: 0.1,
            domain: 10.0,
            min_separation: 3.0,
            measurement_noise_std: 0.0,
            seed: None,
        }
    }
}

/// A generated scene: ground truth, cameras, and the observation stream.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    /// Ground-truth marker positions, indexed `[frame][marker]`
    pub ground_truth: Vec<Vec<Vector3<f64>>>,
    /// Camera models, indexed by camera id
    pub cameras: Vec<CameraModel>,
    /// Camera positions on the viewing sphere
    pub camera_positions: Vec<Vector3<f64>>,
    /// Flattened observation stream in timestep-major, then marker, then
    /// camera order
    pub observations: Vec<Observation>,
}

/// Generate a complete synthetic scene from a configuration.
pub fn generate_scene(config: &SceneConfig) -> SyntheticScene {
    let seed = config.seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });
    let mut rng = StdRng::seed_from_u64(seed);
    log::debug!("generating synthetic scene with seed {}", seed);

    let ground_truth = generate_clouds(&mut rng, config);
    let (cameras, camera_positions) = generate_cameras(&mut rng, config);

    let noise = if config.measurement_noise_std > 0.0 {
        Normal::new(0.0, config.measurement_noise_std).ok()
    } else {
        None
    };

    let mut observations =
        Vec::with_capacity(config.num_frames * config.num_markers * config.num_cameras);
    for (frame, cloud) in ground_truth.iter().enumerate() {
        for (marker, position) in cloud.iter().enumerate() {
            for (camera_id, camera) in cameras.iter().enumerate() {
                let mut measurement = camera.project(position);
                if let Some(ref normal) = noise {
                    measurement +=
                        Vector2::new(normal.sample(&mut rng), normal.sample(&mut rng));
                }
                observations.push(Observation::new(
                    frame as Timestep,
                    marker,
                    camera_id,
                    measurement,
                ));
            }
        }
    }

    SyntheticScene {
        ground_truth,
        cameras,
        camera_positions,
        observations,
    }
}

/// Sample the initial cloud and random-walk it over the frames.
fn generate_clouds(rng: &mut StdRng, config: &SceneConfig) -> Vec<Vec<Vector3<f64>>> {
    let initial = sample_separated_cloud(rng, config);

    let mut clouds = Vec::with_capacity(config.num_frames);
    clouds.push(initial);
    for frame in 1..config.num_frames {
        let next: Vec<Vector3<f64>> = clouds[frame - 1]
            .iter()
            .map(|position| {
                let step = Vector3::new(
                    signed_delta(rng, config.frame_delta),
                    signed_delta(rng, config.frame_delta),
                    signed_delta(rng, config.frame_delta),
                );
                position + step
            })
            .collect();
        clouds.push(next);
    }
    clouds
}

fn signed_delta(rng: &mut StdRng, delta: f64) -> f64 {
    if rng.gen_bool(0.5) {
        delta
    } else {
        -delta
    }
}

/// Rejection-sample marker positions in the cube until the pairwise
/// separation constraint holds.
fn sample_separated_cloud(rng: &mut StdRng, config: &SceneConfig) -> Vec<Vector3<f64>> {
    // The constraint may be unsatisfiable for dense configurations, so the
    // sampler gives up after a bound and keeps the last draw
    const MAX_ATTEMPTS: usize = 10_000;

    for attempt in 1..=MAX_ATTEMPTS {
        let cloud: Vec<Vector3<f64>> = (0..config.num_markers)
            .map(|_| {
                Vector3::new(
                    (rng.gen::<f64>() - 0.5) * config.domain,
                    (rng.gen::<f64>() - 0.5) * config.domain,
                    (rng.gen::<f64>() - 0.5) * config.domain,
                )
            })
            .collect();
        if well_separated(&cloud, config.min_separation) {
            if attempt > 1 {
                log::trace!("initial cloud accepted after {} attempts", attempt);
            }
            return cloud;
        }
    }

    log::warn!(
        "separation constraint not met after {} attempts; using an unconstrained cloud",
        MAX_ATTEMPTS
    );
    (0..config.num_markers)
        .map(|_| {
            Vector3::new(
                (rng.gen::<f64>() - 0.5) * config.domain,
                (rng.gen::<f64>() - 0.5) * config.domain,
                (rng.gen::<f64>() - 0.5) * config.domain,
            )
        })
        .collect()
}

fn well_separated(cloud: &[Vector3<f64>], min_separation: f64) -> bool {
    for (i, a) in cloud.iter().enumerate() {
        for b in &cloud[i + 1..] {
            if (a - b).norm() <= min_separation {
                return false;
            }
        }
    }
    true
}

/// Place cameras uniformly on a sphere around the domain, all looking at
/// the origin.
fn generate_cameras(
    rng: &mut StdRng,
    config: &SceneConfig,
) -> (Vec<CameraModel>, Vec<Vector3<f64>>) {
    // Sphere circumscribing the domain cube
    let radius = (3.0 * (config.domain / 2.0).powi(2)).sqrt();
    let origin = Vector3::zeros();

    let mut cameras = Vec::with_capacity(config.num_cameras);
    let mut positions = Vec::with_capacity(config.num_cameras);
    for _ in 0..config.num_cameras {
        let theta = rng.gen::<f64>() * PI;
        let phi = rng.gen::<f64>() * TAU;
        let position = polar_to_cartesian(radius, theta, phi);
        cameras.push(CameraModel::look_at(&position, &origin));
        positions.push(position);
    }
    (cameras, positions)
}

fn polar_to_cartesian(r: f64, theta: f64, phi: f64) -> Vector3<f64> {
    Vector3::new(
        r * theta.sin() * phi.cos(),
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SceneConfig {
        SceneConfig {
            num_markers: 3,
            num_frames: 5,
            num_cameras: 4,
            seed: Some(42),
            ..SceneConfig::default()
        }
    }

    #[test]
    fn test_scene_dimensions() {
        let config = small_config();
        let scene = generate_scene(&config);

        assert_eq!(scene.ground_truth.len(), 5);
        assert_eq!(scene.ground_truth[0].len(), 3);
        assert_eq!(scene.cameras.len(), 4);
        assert_eq!(scene.observations.len(), 5 * 3 * 4);
    }

    #[test]
    fn test_observation_stream_is_timestep_major() {
        let scene = generate_scene(&small_config());
        let keys: Vec<(u64, usize, usize)> = scene
            .observations
            .iter()
            .map(|obs| (obs.timestep, obs.marker, obs.camera))
            .collect();

        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_initial_cloud_separation() {
        let scene = generate_scene(&small_config());
        let first = &scene.ground_truth[0];
        for (i, a) in first.iter().enumerate() {
            for b in &first[i + 1..] {
                assert!((a - b).norm() > 3.0);
            }
        }
    }

    #[test]
    fn test_noiseless_observations_match_projections() {
        let scene = generate_scene(&small_config());
        for obs in &scene.observations {
            let truth = &scene.ground_truth[obs.timestep as usize][obs.marker];
            let expected = scene.cameras[obs.camera].project(truth);
            assert!((obs.measurement - expected).norm() < 1e-12);
        }
    }

    #[test]
    fn test_seed_determinism() {
        let a = generate_scene(&small_config());
        let b = generate_scene(&small_config());
        assert_eq!(a.observations, b.observations);
        assert_eq!(a.camera_positions, b.camera_positions);
    }

    #[test]
    fn test_markers_move_by_frame_delta() {
        let scene = generate_scene(&small_config());
        for frame in 1..scene.ground_truth.len() {
            for marker in 0..3 {
                let step = scene.ground_truth[frame][marker] - scene.ground_truth[frame - 1][marker];
                for axis in 0..3 {
                    assert!((step[axis].abs() - 0.1).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_measurement_noise_perturbs_projections() {
        let config = SceneConfig {
            measurement_noise_std: 0.5,
            ..small_config()
        };
        let scene = generate_scene(&config);
        let perturbed = scene.observations.iter().any(|obs| {
            let truth = &scene.ground_truth[obs.timestep as usize][obs.marker];
            let clean = scene.cameras[obs.camera].project(truth);
            (obs.measurement - clean).norm() > 1e-6
        });
        assert!(perturbed);
    }

    #[test]
    fn test_cameras_sit_on_the_viewing_sphere() {
        let config = small_config();
        let scene = generate_scene(&config);
        let radius = (3.0 * (config.domain / 2.0).powi(2)).sqrt();
        for position in &scene.camera_positions {
            assert!((position.norm() - radius).abs() < 1e-9);
        }
    }
}
