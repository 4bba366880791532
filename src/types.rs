//! Observation records and per-marker run reports
//!
//! The observation record is the wire unit of the whole pipeline: one 2D
//! measurement of one marker by one camera at one timestep. Records are
//! immutable once produced; ordering within one marker's stream is
//! significant (the estimator's timestep gate is order-dependent), ordering
//! across markers is not.

use nalgebra::{Matrix3, Vector2, Vector3};
use serde::Serialize;

use crate::errors::{FilterError, RunError};

/// Marker identifier (index into the harness's estimator set)
pub type MarkerId = usize;
/// Camera identifier (index into the camera matrix table)
pub type CameraId = usize;
/// Frame timestep (non-negative, increasing over a run)
pub type Timestep = u64;

/// One 2D observation of one marker by one camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    /// Frame timestep of the observation
    pub timestep: Timestep,
    /// Which marker was observed
    pub marker: MarkerId,
    /// Which camera produced the measurement
    pub camera: CameraId,
    /// Unnormalized 2D image coordinates
    pub measurement: Vector2<f64>,
}

impl Observation {
    /// Create a new observation record.
    pub fn new(
        timestep: Timestep,
        marker: MarkerId,
        camera: CameraId,
        measurement: Vector2<f64>,
    ) -> Self {
        Self {
            timestep,
            marker,
            camera,
            measurement,
        }
    }
}

/// Final state of one marker's estimator after its queue drained.
#[derive(Debug, Clone)]
pub struct MarkerReport {
    /// Marker this report belongs to
    pub marker: MarkerId,
    /// Observations consumed by the estimator (stale no-ops included)
    pub processed: u64,
    /// Observations silently dropped by the stale-timestep gate
    pub stale_dropped: u64,
    /// Final 3D position estimate
    pub state: Vector3<f64>,
    /// Final covariance
    pub covariance: Matrix3<f64>,
    /// Set if the estimator aborted on a numeric failure; observations still
    /// queued at that point were discarded with the context
    pub failure: Option<FilterError>,
}

impl MarkerReport {
    /// True if the estimator drained its queue without a numeric failure.
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Aggregate result of a batch run over all selected markers.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Per-marker reports, sorted by marker id
    pub markers: Vec<MarkerReport>,
    /// Malformed observations rejected at the router boundary
    pub rejected: Vec<RunError>,
}

impl BatchReport {
    /// Look up the report for a specific marker.
    pub fn marker(&self, id: MarkerId) -> Option<&MarkerReport> {
        self.markers.iter().find(|r| r.marker == id)
    }

    /// True if every marker context drained without failure.
    pub fn all_succeeded(&self) -> bool {
        self.markers.iter().all(|r| r.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lookup() {
        let report = BatchReport {
            markers: vec![
                MarkerReport {
                    marker: 0,
                    processed: 4,
                    stale_dropped: 0,
                    state: Vector3::zeros(),
                    covariance: Matrix3::identity(),
                    failure: None,
                },
                MarkerReport {
                    marker: 2,
                    processed: 1,
                    stale_dropped: 1,
                    state: Vector3::zeros(),
                    covariance: Matrix3::identity(),
                    failure: Some(FilterError::SingularInnovationCovariance { timestep: 1 }),
                },
            ],
            rejected: Vec::new(),
        };

        assert!(report.marker(0).unwrap().succeeded());
        assert!(!report.marker(2).unwrap().succeeded());
        assert!(report.marker(1).is_none());
        assert!(!report.all_succeeded());
    }
}
