//! Small numeric helpers for covariance matrices

use nalgebra::Matrix3;

/// Make a matrix symmetric by averaging with its transpose.
pub fn symmetrize(matrix: &Matrix3<f64>) -> Matrix3<f64> {
    0.5 * (matrix + matrix.transpose())
}

/// Check whether a matrix is positive definite via Cholesky decomposition.
pub fn is_positive_definite(matrix: &Matrix3<f64>) -> bool {
    matrix.cholesky().is_some()
}
