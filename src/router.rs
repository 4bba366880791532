//! Measurement routing and dispatch scheduling
//!
//! The router turns the flattened multi-camera, multi-marker observation
//! stream into per-marker job streams. Validation happens here, before any
//! record reaches an estimator: a malformed record is rejected with an error
//! identifying it, logged, and does not disturb valid work for other
//! markers.
//!
//! Routing preserves the input stream order within each marker's stream
//! (the estimator's timestep gate is order-dependent). Selection and
//! ordering are explicit configuration types rather than runtime flags.

use std::collections::HashMap;

use crossbeam_channel::Sender;
use serde::Serialize;

use crate::errors::RunError;
use crate::models::CameraModel;
use crate::types::{MarkerId, Observation};
use crate::worker::FuseJob;

/// Which markers receive observations.
///
/// A deployment tracking a single marker can use `Only(vec![0])`; the
/// default routes to every marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MarkerSelection {
    /// Route to every marker the harness constructed (default).
    All,
    /// Route only to the listed markers.
    Only(Vec<MarkerId>),
}

impl MarkerSelection {
    /// Whether a marker receives observations under this selection.
    pub fn includes(&self, marker: MarkerId) -> bool {
        match self {
            MarkerSelection::All => true,
            MarkerSelection::Only(markers) => markers.contains(&marker),
        }
    }

    /// The sorted, de-duplicated set of selected markers among
    /// `0..num_markers`.
    pub fn selected(&self, num_markers: usize) -> Vec<MarkerId> {
        match self {
            MarkerSelection::All => (0..num_markers).collect(),
            MarkerSelection::Only(markers) => {
                let mut selected: Vec<MarkerId> = markers
                    .iter()
                    .copied()
                    .filter(|&m| {
                        let known = m < num_markers;
                        if !known {
                            log::warn!("selection names marker {} beyond configured count {}", m, num_markers);
                        }
                        known
                    })
                    .collect();
                selected.sort_unstable();
                selected.dedup();
                selected
            }
        }
    }
}

impl Default for MarkerSelection {
    fn default() -> Self {
        MarkerSelection::All
    }
}

/// Order in which the stream is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum DispatchOrder {
    /// Dispatch in input stream order (default). Out-of-order records reach
    /// the estimators as delivered and fall under their stale policy.
    #[default]
    Arrival,
    /// Stable-sort the stream by timestep before dispatch, so each marker
    /// sees a monotone timestep sequence. This is the buffer-and-reorder
    /// stale-handling strategy, applied where reordering is still possible.
    TimestepSorted,
}

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RouterConfig {
    /// Marker subset receiving observations
    pub selection: MarkerSelection,
    /// Dispatch ordering
    pub order: DispatchOrder,
}

/// Routes validated observations to per-marker job channels.
///
/// Crate-internal: the harness owns the channels and drives routing.
pub(crate) struct Router {
    cameras: Vec<CameraModel>,
    num_markers: usize,
    config: RouterConfig,
}

impl Router {
    /// Create a router over a camera table and a configured marker count.
    pub(crate) fn new(cameras: Vec<CameraModel>, num_markers: usize, config: RouterConfig) -> Self {
        Self {
            cameras,
            num_markers,
            config,
        }
    }

    /// Validate one record against the camera table and marker range.
    fn check(&self, index: usize, obs: &Observation) -> Result<CameraModel, RunError> {
        if obs.marker >= self.num_markers {
            return Err(RunError::UnknownMarker {
                index,
                marker: obs.marker,
            });
        }
        let camera = self
            .cameras
            .get(obs.camera)
            .copied()
            .ok_or(RunError::UnknownCamera {
                index,
                camera: obs.camera,
            })?;
        if !obs.measurement.x.is_finite() || !obs.measurement.y.is_finite() {
            return Err(RunError::NonFiniteMeasurement {
                index,
                marker: obs.marker,
                camera: obs.camera,
            });
        }
        Ok(camera)
    }

    /// Dispatch the full stream to the per-marker channels.
    ///
    /// Returns the malformed records rejected at the boundary. A send to a
    /// closed channel means that marker's context already terminated on a
    /// failure; the observation is dropped and the failure is carried in
    /// the marker's report.
    pub(crate) fn route(
        &self,
        observations: &[Observation],
        senders: &HashMap<MarkerId, Sender<FuseJob>>,
    ) -> Vec<RunError> {
        let mut order: Vec<usize> = (0..observations.len()).collect();
        if self.config.order == DispatchOrder::TimestepSorted {
            // Stable: ties keep arrival order, so per-marker same-timestep
            // sequences are preserved
            order.sort_by_key(|&i| observations[i].timestep);
        }

        let mut rejected = Vec::new();
        for index in order {
            let obs = &observations[index];
            let camera = match self.check(index, obs) {
                Ok(camera) => camera,
                Err(err) => {
                    log::warn!("rejected observation: {}", err);
                    rejected.push(err);
                    continue;
                }
            };

            if !self.config.selection.includes(obs.marker) {
                continue;
            }

            if let Some(sender) = senders.get(&obs.marker) {
                let job = FuseJob {
                    measurement: obs.measurement,
                    camera,
                    timestep: obs.timestep,
                };
                if sender.send(job).is_err() {
                    log::debug!(
                        "marker {} context closed; dropping observation {}",
                        obs.marker,
                        index
                    );
                }
            }
        }
        rejected
    }
}
