//! Motion and camera measurement models
//!
//! Both models are affine, so their Jacobians are exact and constant. The
//! estimator still treats them through the linearization interface so a
//! nonlinear motion or projection model can be swapped in without touching
//! the fusion math.

use nalgebra::{Matrix2x3, Matrix3, Matrix3x4, Vector2, Vector3};
use serde::Serialize;

/// Default constant drift velocity applied by the motion model.
pub const DEFAULT_DRIFT: [f64; 3] = [0.1, 0.1, 0.1];

/// Constant-drift motion model: `f(x, dt) = x + dt * drift`.
///
/// The drift is a fixed configuration constant, not an estimated velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionModel {
    /// Constant drift velocity (units per timestep)
    pub drift: Vector3<f64>,
}

impl MotionModel {
    /// Create a motion model with the given constant drift.
    pub fn new(drift: Vector3<f64>) -> Self {
        Self { drift }
    }

    /// A motion model with zero drift (stationary markers).
    pub fn stationary() -> Self {
        Self::new(Vector3::zeros())
    }

    /// Propagate a state estimate forward by `dt` timesteps.
    #[inline]
    pub fn step(&self, state: &Vector3<f64>, dt: f64) -> Vector3<f64> {
        state + dt * self.drift
    }

    /// Jacobian of the motion model `F = ∂f/∂x`.
    ///
    /// The model is linear in the state, so this is the identity for any
    /// state and any `dt`.
    #[inline]
    pub fn jacobian(&self) -> Matrix3<f64> {
        Matrix3::identity()
    }
}

impl Default for MotionModel {
    fn default() -> Self {
        Self::new(Vector3::from(DEFAULT_DRIFT))
    }
}

/// Affine camera model built from a 3×4 projection matrix `T = [R | t]`.
///
/// The measurement model uses only the top two rows:
/// `h(x) = T[:2,:3] x + T[:2,3]`. This is an affine camera, not a full
/// perspective projection with homogeneous divide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraModel {
    matrix: Matrix3x4<f64>,
}

impl CameraModel {
    /// Wrap an existing 3×4 camera matrix.
    pub fn new(matrix: Matrix3x4<f64>) -> Self {
        Self { matrix }
    }

    /// Build a camera matrix from a rotation and a translation.
    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let mut matrix = Matrix3x4::zeros();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        matrix.set_column(3, &translation);
        Self { matrix }
    }

    /// Build a camera positioned at `from`, looking at `to`, with world z up.
    ///
    /// Rows of the rotation are the camera's right, up and forward axes;
    /// translation is `-R * from`. Falls back to the world y axis when the
    /// view direction is parallel to z.
    pub fn look_at(from: &Vector3<f64>, to: &Vector3<f64>) -> Self {
        let forward = (to - from).normalize();
        let mut right = forward.cross(&Vector3::z());
        if right.norm() < 1e-9 {
            right = forward.cross(&Vector3::y());
        }
        let right = right.normalize();
        let up = right.cross(&forward).normalize();

        let rotation =
            Matrix3::from_rows(&[right.transpose(), up.transpose(), forward.transpose()]);
        let translation = -rotation * from;
        Self::from_parts(rotation, translation)
    }

    /// The full 3×4 camera matrix.
    pub fn matrix(&self) -> &Matrix3x4<f64> {
        &self.matrix
    }

    /// Measurement model `h(x)`: project a 3D point to unnormalized 2D
    /// image coordinates.
    #[inline]
    pub fn project(&self, state: &Vector3<f64>) -> Vector2<f64> {
        self.jacobian() * state + self.offset()
    }

    /// Jacobian of the measurement model `H = ∂h/∂x = T[:2,:3]`.
    ///
    /// Independent of the state because the projection is affine.
    #[inline]
    pub fn jacobian(&self) -> Matrix2x3<f64> {
        self.matrix.fixed_view::<2, 3>(0, 0).into_owned()
    }

    #[inline]
    fn offset(&self) -> Vector2<f64> {
        self.matrix.fixed_view::<2, 1>(0, 3).into_owned()
    }
}
