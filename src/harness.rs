//! Batch harness driving a full run over a pre-generated dataset
//!
//! Constructs one estimator context per selected marker, feeds the whole
//! observation stream through the router, issues the stop signal, waits for
//! every context to drain, and aggregates the per-marker reports. Used for
//! offline validation against synthetic ground truth.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use serde::Serialize;

use crate::ekf::EkfConfig;
use crate::errors::RunError;
use crate::models::CameraModel;
use crate::router::{Router, RouterConfig};
use crate::types::{BatchReport, Observation};
use crate::worker::spawn_marker_context;

/// Batch run configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarnessConfig {
    /// Number of marker estimators to construct
    pub num_markers: usize,
    /// Configuration shared by every estimator instance
    pub ekf: EkfConfig,
    /// Routing configuration (marker selection, dispatch order)
    pub router: RouterConfig,
    /// How long to wait for all contexts to drain after the stop signal
    pub shutdown_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_markers: 10,
            ekf: EkfConfig::default(),
            router: RouterConfig::default(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Drives a complete offline run: spawn, route, stop, drain, report.
pub struct BatchHarness {
    config: HarnessConfig,
}

impl BatchHarness {
    /// Create a harness from its configuration.
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Run the full observation stream through per-marker estimators.
    ///
    /// The stop signal is issued once the whole stream is routed; each
    /// context then drains its queue to completion. Returns per-marker
    /// final states and processed counts, plus any records rejected at the
    /// router boundary.
    ///
    /// # Errors
    /// [`RunError::ShutdownTimeout`] if any context fails to report within
    /// the configured deadline; the run aborts with no retry.
    pub fn run(
        &self,
        cameras: &[CameraModel],
        observations: &[Observation],
    ) -> Result<BatchReport, RunError> {
        let selected = self
            .config
            .router
            .selection
            .selected(self.config.num_markers);

        let (report_tx, report_rx) = unbounded();
        let mut senders = HashMap::with_capacity(selected.len());
        let mut handles = Vec::with_capacity(selected.len());

        for &marker in &selected {
            let (job_tx, job_rx) = unbounded();
            handles.push(spawn_marker_context(
                marker,
                self.config.ekf.clone(),
                job_rx,
                report_tx.clone(),
            ));
            senders.insert(marker, job_tx);
        }
        drop(report_tx);

        let router = Router::new(
            cameras.to_vec(),
            self.config.num_markers,
            self.config.router.clone(),
        );
        let rejected = router.route(observations, &senders);

        // Stop signal: dropping the senders lets each context drain its
        // remaining queue and terminate
        drop(senders);

        let deadline = Instant::now() + self.config.shutdown_timeout;
        let mut markers = Vec::with_capacity(selected.len());
        for _ in 0..selected.len() {
            match report_rx.recv_deadline(deadline) {
                Ok(report) => markers.push(report),
                Err(_) => {
                    let mut missing: Vec<_> = selected
                        .iter()
                        .copied()
                        .filter(|&m| !markers.iter().any(|r| r.marker == m))
                        .collect();
                    missing.sort_unstable();
                    log::error!("shutdown deadline exceeded; markers {:?} never reported", missing);
                    return Err(RunError::ShutdownTimeout { missing });
                }
            }
        }

        for handle in handles {
            // Contexts have already reported; a join failure here means the
            // thread panicked after sending and there is nothing to salvage
            if handle.join().is_err() {
                log::error!("a marker context panicked after reporting");
            }
        }

        markers.sort_unstable_by_key(|report| report.marker);
        log::info!(
            "batch run complete: {} marker contexts drained, {} observations rejected",
            markers.len(),
            rejected.len()
        );

        Ok(BatchReport { markers, rejected })
    }
}
