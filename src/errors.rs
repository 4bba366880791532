//! Error types for the estimator and the batch run
//!
//! Two levels mirror the propagation policy: [`FilterError`] is local to one
//! marker's estimator, [`RunError`] covers the router/harness boundary.

use std::fmt;

use crate::types::{CameraId, MarkerId, Timestep};

/// Errors raised by a single estimator's `fuse` call.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// The innovation covariance `S = H Σ Hᵀ + R` was not invertible.
    ///
    /// Fatal for the fuse call: skipping the update silently would corrupt
    /// the covariance recursion, so the caller must abort this marker's
    /// context.
    SingularInnovationCovariance {
        /// Timestep of the offending observation
        timestep: Timestep,
    },

    /// An observation arrived with a timestep earlier than the last one
    /// processed. Only raised under `StalePolicy::Reject`; the default
    /// policy drops stale observations silently.
    StaleObservation {
        /// Timestep of the stale observation
        timestep: Timestep,
        /// Last timestep the estimator has processed
        last_processed: Timestep,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::SingularInnovationCovariance { timestep } => {
                write!(
                    f,
                    "innovation covariance is singular at timestep {}",
                    timestep
                )
            }
            FilterError::StaleObservation {
                timestep,
                last_processed,
            } => {
                write!(
                    f,
                    "stale observation at timestep {} (last processed: {})",
                    timestep, last_processed
                )
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Errors raised at the router/harness boundary.
///
/// Malformed-input variants identify the offending record by its index in
/// the input stream so the producer can be debugged.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// Observation references a camera id with no known camera matrix.
    UnknownCamera {
        /// Index of the record in the input stream
        index: usize,
        /// The unknown camera id
        camera: CameraId,
    },

    /// Observation references a marker id outside the configured range.
    UnknownMarker {
        /// Index of the record in the input stream
        index: usize,
        /// The unknown marker id
        marker: MarkerId,
    },

    /// Observation carries a NaN or infinite measurement component.
    NonFiniteMeasurement {
        /// Index of the record in the input stream
        index: usize,
        /// Marker id of the record
        marker: MarkerId,
        /// Camera id of the record
        camera: CameraId,
    },

    /// One or more marker contexts failed to report within the shutdown
    /// deadline. Run-level failure, no retry.
    ShutdownTimeout {
        /// Markers that never reported
        missing: Vec<MarkerId>,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::UnknownCamera { index, camera } => {
                write!(f, "observation {} references unknown camera {}", index, camera)
            }
            RunError::UnknownMarker { index, marker } => {
                write!(f, "observation {} references unknown marker {}", index, marker)
            }
            RunError::NonFiniteMeasurement {
                index,
                marker,
                camera,
            } => {
                write!(
                    f,
                    "observation {} (marker {}, camera {}) has a non-finite measurement",
                    index, marker, camera
                )
            }
            RunError::ShutdownTimeout { missing } => {
                write!(
                    f,
                    "marker contexts {:?} did not drain within the shutdown deadline",
                    missing
                )
            }
        }
    }
}

impl std::error::Error for RunError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_display() {
        let err = FilterError::SingularInnovationCovariance { timestep: 7 };
        assert!(err.to_string().contains("singular"));
        assert!(err.to_string().contains("7"));

        let err = FilterError::StaleObservation {
            timestep: 3,
            last_processed: 5,
        };
        assert!(err.to_string().contains("3"));
        assert!(err.to_string().contains("5"));
    }

    #[test]
    fn test_run_error_display() {
        let err = RunError::UnknownCamera { index: 12, camera: 4 };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("camera 4"));

        let err = RunError::ShutdownTimeout { missing: vec![1, 3] };
        assert!(err.to_string().contains("[1, 3]"));
    }
}
