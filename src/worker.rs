//! Per-marker execution contexts
//!
//! One OS thread per marker, with sole ownership of that marker's estimator.
//! The thread drains its private unbounded channel; the stop signal is the
//! producer dropping the sender, after which the remaining queued jobs are
//! still processed (drain-to-completion, not abrupt cancellation). A numeric
//! estimator failure terminates only this context.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::ekf::{Ekf, EkfConfig};
use crate::models::CameraModel;
use crate::types::{MarkerId, MarkerReport, Timestep};

/// One routed observation, ready for a specific marker's estimator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FuseJob {
    pub measurement: nalgebra::Vector2<f64>,
    pub camera: CameraModel,
    pub timestep: Timestep,
}

/// Spawn the execution context for one marker.
///
/// The context consumes jobs until the channel disconnects and is empty,
/// then sends its final [`MarkerReport`] and terminates. On a fuse error the
/// context logs, stops consuming, and reports the failure; observations
/// still queued are discarded with it.
pub(crate) fn spawn_marker_context(
    marker: MarkerId,
    config: EkfConfig,
    jobs: Receiver<FuseJob>,
    reports: Sender<MarkerReport>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut ekf = Ekf::new(config);
        let mut processed = 0u64;
        let mut failure = None;

        for job in jobs.iter() {
            match ekf.fuse(&job.measurement, &job.camera, job.timestep) {
                Ok(()) => processed += 1,
                Err(err) => {
                    log::error!(
                        "marker {}: estimator failed at timestep {}: {}; terminating context",
                        marker,
                        job.timestep,
                        err
                    );
                    failure = Some(err);
                    break;
                }
            }
        }

        log::debug!(
            "marker {}: context drained ({} processed, {} stale)",
            marker,
            processed,
            ekf.stale_dropped()
        );

        let report = MarkerReport {
            marker,
            processed,
            stale_dropped: ekf.stale_dropped(),
            state: *ekf.state(),
            covariance: *ekf.covariance(),
            failure,
        };
        if reports.send(report).is_err() {
            log::debug!("marker {}: report receiver already dropped", marker);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use nalgebra::{Matrix3, Vector2, Vector3};

    #[test]
    fn test_context_drains_after_stop() {
        let camera = CameraModel::from_parts(Matrix3::identity(), Vector3::zeros());
        let (job_tx, job_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();

        // Enqueue everything before the context even starts: it must still
        // process all of it after the sender is gone
        for t in 1..=4u64 {
            job_tx
                .send(FuseJob {
                    measurement: Vector2::new(t as f64, t as f64),
                    camera,
                    timestep: t,
                })
                .unwrap();
        }
        drop(job_tx);

        let handle = spawn_marker_context(3, EkfConfig::default(), job_rx, report_tx);
        let report = report_rx.recv().unwrap();
        handle.join().unwrap();

        assert_eq!(report.marker, 3);
        assert_eq!(report.processed, 4);
        assert!(report.succeeded());
    }
}
