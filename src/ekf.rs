//! Per-marker extended Kalman filter
//!
//! Each marker is tracked by one [`Ekf`] instance owning its belief (mean +
//! covariance) and its timestep gate. The single public operation is
//! [`Ekf::fuse`]: feed one 2D observation from one camera, run the
//! predict-then-update recursion, mutate the belief in place.
//!
//! Timestep policy:
//! - `timestep < last_processed`: stale, handled per [`StalePolicy`]
//!   (silently dropped by default, counted for observability).
//! - `timestep > last_processed`: predict first, with the covariance handled
//!   per [`CovariancePolicy`] before propagation.
//! - `timestep == last_processed`: no prediction; this is how several
//!   cameras observing the same instant are fused sequentially within one
//!   frame.

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};
use serde::Serialize;

use crate::errors::FilterError;
use crate::models::{CameraModel, MotionModel};
use crate::types::Timestep;

/// How the covariance is carried across frame boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CovariancePolicy {
    /// Reset the covariance to its configured initial value at every new
    /// timestep. Uncertainty shrinks within a frame across cameras but no
    /// confidence is accumulated across frames. The default.
    ResetPerFrame,
    /// Carry the posterior covariance forward through prediction, the
    /// textbook Kalman recursion.
    Accumulate,
}

/// How observations older than the last processed timestep are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StalePolicy {
    /// Silently ignore the observation (default). The drop is counted and
    /// exposed via [`Ekf::stale_dropped`] but never logged or raised.
    Drop,
    /// Surface [`FilterError::StaleObservation`] to the caller.
    Reject,
}

/// Configuration for one marker's estimator, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EkfConfig {
    /// Measurement noise covariance `R` (2×2)
    pub measurement_noise: Matrix2<f64>,
    /// Process noise covariance `Q` (3×3)
    pub process_noise: Matrix3<f64>,
    /// Initial state estimate
    pub initial_state: Vector3<f64>,
    /// Initial covariance, also the reset target under
    /// [`CovariancePolicy::ResetPerFrame`]
    pub initial_covariance: Matrix3<f64>,
    /// Motion model used by the prediction step
    pub motion: MotionModel,
    /// Cross-frame covariance policy
    pub covariance_policy: CovariancePolicy,
    /// Stale-observation policy
    pub stale_policy: StalePolicy,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            measurement_noise: Matrix2::identity() * 1e-3,
            process_noise: Matrix3::identity() * 1e-6,
            initial_state: Vector3::zeros(),
            initial_covariance: Matrix3::identity() * 1e3,
            motion: MotionModel::default(),
            covariance_policy: CovariancePolicy::ResetPerFrame,
            stale_policy: StalePolicy::Drop,
        }
    }
}

/// Extended Kalman filter tracking one marker's 3D position.
///
/// The motion and measurement models are affine, so the Jacobians are exact
/// and the recursion is algorithmically a linear Kalman filter; the EKF
/// structure keeps the interface stable if either model becomes nonlinear.
#[derive(Debug, Clone)]
pub struct Ekf {
    motion: MotionModel,
    measurement_noise: Matrix2<f64>,
    process_noise: Matrix3<f64>,
    initial_covariance: Matrix3<f64>,
    covariance_policy: CovariancePolicy,
    stale_policy: StalePolicy,

    state: Vector3<f64>,
    covariance: Matrix3<f64>,
    last_timestep: Timestep,
    stale_dropped: u64,
}

impl Ekf {
    /// Create an estimator from its configuration.
    pub fn new(config: EkfConfig) -> Self {
        Self {
            motion: config.motion,
            measurement_noise: config.measurement_noise,
            process_noise: config.process_noise,
            initial_covariance: config.initial_covariance,
            covariance_policy: config.covariance_policy,
            stale_policy: config.stale_policy,
            state: config.initial_state,
            covariance: config.initial_covariance,
            last_timestep: 0,
            stale_dropped: 0,
        }
    }

    /// Current 3D position estimate.
    #[inline]
    pub fn state(&self) -> &Vector3<f64> {
        &self.state
    }

    /// Current covariance.
    #[inline]
    pub fn covariance(&self) -> &Matrix3<f64> {
        &self.covariance
    }

    /// Last timestep the estimator has processed.
    #[inline]
    pub fn last_timestep(&self) -> Timestep {
        self.last_timestep
    }

    /// Number of observations dropped by the stale-timestep gate.
    #[inline]
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    /// Fuse one observation into the belief.
    ///
    /// Runs the timestep gate, a prediction step when the timestep advances,
    /// and the measurement update. The only observable effect is mutation of
    /// the estimator's own `(state, covariance, last_timestep)`.
    ///
    /// # Errors
    /// - [`FilterError::SingularInnovationCovariance`] if `S = H Σ Hᵀ + R`
    ///   is not invertible; the belief is left at its predicted value and
    ///   the caller must treat this estimator as failed.
    /// - [`FilterError::StaleObservation`] for an out-of-order observation
    ///   under [`StalePolicy::Reject`].
    pub fn fuse(
        &mut self,
        measurement: &Vector2<f64>,
        camera: &CameraModel,
        timestep: Timestep,
    ) -> Result<(), FilterError> {
        if timestep < self.last_timestep {
            return match self.stale_policy {
                StalePolicy::Drop => {
                    self.stale_dropped += 1;
                    Ok(())
                }
                StalePolicy::Reject => Err(FilterError::StaleObservation {
                    timestep,
                    last_processed: self.last_timestep,
                }),
            };
        }

        if timestep > self.last_timestep {
            self.predict(timestep);
        }

        self.update(measurement, camera, timestep)
    }

    /// Apply [`Ekf::fuse`] to an ordered sequence of observations.
    ///
    /// Purely a looped convenience; no reordering. Stops at the first error.
    pub fn fuse_sequence<I>(&mut self, sequence: I) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = (Vector2<f64>, CameraModel, Timestep)>,
    {
        for (measurement, camera, timestep) in sequence {
            self.fuse(&measurement, &camera, timestep)?;
        }
        Ok(())
    }

    /// Prediction step for a timestep strictly past the last processed one.
    fn predict(&mut self, timestep: Timestep) {
        let dt = (timestep - self.last_timestep) as f64;
        self.last_timestep = timestep;

        if self.covariance_policy == CovariancePolicy::ResetPerFrame {
            self.covariance = self.initial_covariance;
        }

        let f = self.motion.jacobian();
        self.state = self.motion.step(&self.state, dt);
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
    }

    /// Measurement update step.
    fn update(
        &mut self,
        measurement: &Vector2<f64>,
        camera: &CameraModel,
        timestep: Timestep,
    ) -> Result<(), FilterError> {
        let h = camera.jacobian();
        let innovation = measurement - camera.project(&self.state);

        let s = h * self.covariance * h.transpose() + self.measurement_noise;
        let s_inv = s
            .try_inverse()
            .ok_or(FilterError::SingularInnovationCovariance { timestep })?;

        let gain = self.covariance * h.transpose() * s_inv;

        self.state += gain * innovation;
        self.covariance = (Matrix3::identity() - gain * h) * self.covariance;
        Ok(())
    }
}
