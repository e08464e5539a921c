//! # Detection Service
//!
//! Worker pool in front of both pipelines.
//!
//! ```text
//!  submit_action(a) ──┐
//!                     ├── route(player_id) ──► mailbox[k] ──► worker k
//!  submit_statistics ─┘                         (FIFO)          │
//!                                                              ▼
//!                                         RealtimeCheatDetector / StatisticalAnalysisEngine
//!                                                              │
//!  oneshot::Receiver ◄──────────────────────────────────────────┘
//! ```
//!
//! Every job for one player lands in the same bounded mailbox, so one
//! player's actions are evaluated in submission order while different
//! players run in parallel. A full mailbox blocks the submitter.
//!
//! The returned receivers may be dropped: the job still runs and its
//! result is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::oneshot;
use vigil_shared::{Clock, PlayerAction, PlayerId, PlayerStatistics, SystemClock};

use crate::config::DetectionConfig;
use crate::error::{SecurityError, SecurityResult};
use crate::realtime::{Oracles, RealtimeCheatDetector, RealtimeStatistics};
use crate::registry::route;
use crate::statistical::{PopulationStatistics, StatisticalAnalysisEngine, StatisticalEngineStatistics};
use crate::verdict::{RealtimeDetectionResult, StatisticalAnalysisResult};

/// A unit of work for one worker.
enum Job {
    Action {
        action: PlayerAction,
        reply: oneshot::Sender<RealtimeDetectionResult>,
    },
    Statistics {
        player_id: PlayerId,
        stats: PlayerStatistics,
        reply: oneshot::Sender<StatisticalAnalysisResult>,
    },
}

/// Players evicted by one maintenance pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Idle players dropped from the real-time registry.
    pub realtime_evicted: usize,
    /// Idle players dropped from the statistical registry.
    pub statistical_evicted: usize,
}

/// Counters of both pipelines.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ServiceStatistics {
    /// Real-time pipeline counters.
    pub realtime: RealtimeStatistics,
    /// Statistical pipeline counters.
    pub statistical: StatisticalEngineStatistics,
    /// Worker threads running.
    pub workers: usize,
}

/// Threaded front end for both detection pipelines.
pub struct DetectionService {
    config: DetectionConfig,
    realtime: Arc<RealtimeCheatDetector>,
    statistical: Arc<StatisticalAnalysisEngine>,
    mailboxes: RwLock<Vec<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
}

impl DetectionService {
    /// Validates `config` and starts the workers on the wall clock.
    pub fn new(config: DetectionConfig) -> SecurityResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock), Oracles::default())
    }

    /// Validates `config` and starts the workers with an explicit clock and
    /// oracles.
    pub fn with_clock(config: DetectionConfig, clock: Arc<dyn Clock>, oracles: Oracles) -> SecurityResult<Self> {
        config.validate()?;
        let population = Arc::new(PopulationStatistics::new(config.statistical.outlier.population_alpha));
        let realtime = Arc::new(RealtimeCheatDetector::with_components(
            &config,
            Arc::clone(&clock),
            oracles,
        ));
        let statistical = Arc::new(StatisticalAnalysisEngine::with_components(&config, clock, population));
        Self::start(config, realtime, statistical)
    }

    fn start(
        config: DetectionConfig,
        realtime: Arc<RealtimeCheatDetector>,
        statistical: Arc<StatisticalAnalysisEngine>,
    ) -> SecurityResult<Self> {
        let count = config.service.worker_count;
        let mut mailboxes = Vec::with_capacity(count);
        let mut workers = Vec::with_capacity(count);

        for index in 0..count {
            let (sender, receiver) = bounded(config.service.queue_capacity);
            let worker_realtime = Arc::clone(&realtime);
            let worker_statistical = Arc::clone(&statistical);
            let handle = thread::Builder::new()
                .name(format!("vigil-worker-{index}"))
                .spawn(move || Self::worker_loop(index, &receiver, &worker_realtime, &worker_statistical))
                .map_err(|e| SecurityError::Internal(format!("failed to spawn worker {index}: {e}")))?;
            mailboxes.push(sender);
            workers.push(handle);
        }

        tracing::info!(workers = count, "detection service started");
        Ok(Self {
            config,
            realtime,
            statistical,
            mailboxes: RwLock::new(mailboxes),
            workers: Mutex::new(workers),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Worker thread main loop. Runs until its mailbox is closed.
    fn worker_loop(
        index: usize,
        receiver: &Receiver<Job>,
        realtime: &RealtimeCheatDetector,
        statistical: &StatisticalAnalysisEngine,
    ) {
        for job in receiver.iter() {
            match job {
                Job::Action { action, reply } => {
                    let _ = reply.send(realtime.process_player_action(&action));
                }
                Job::Statistics { player_id, stats, reply } => {
                    let _ = reply.send(statistical.analyze_player_statistics(player_id, &stats));
                }
            }
        }
        tracing::debug!(worker = index, "worker stopped");
    }

    fn dispatch(&self, player_id: PlayerId, job: Job) -> SecurityResult<()> {
        if self.is_shutdown() {
            return Err(SecurityError::ServiceShutdown);
        }
        let mailboxes = self.mailboxes.read();
        if mailboxes.is_empty() {
            return Err(SecurityError::ServiceShutdown);
        }
        let index = route(player_id, mailboxes.len());
        mailboxes[index]
            .send(job)
            .map_err(|_| SecurityError::WorkerUnavailable(index))
    }

    /// Queues an action. The receiver resolves to its verdict.
    pub fn submit_action(&self, action: PlayerAction) -> SecurityResult<oneshot::Receiver<RealtimeDetectionResult>> {
        let (reply, receiver) = oneshot::channel();
        self.dispatch(action.player_id, Job::Action { action, reply })?;
        Ok(receiver)
    }

    /// Queues a statistics snapshot. The receiver resolves to its verdict.
    pub fn submit_statistics(
        &self,
        player_id: PlayerId,
        stats: PlayerStatistics,
    ) -> SecurityResult<oneshot::Receiver<StatisticalAnalysisResult>> {
        let (reply, receiver) = oneshot::channel();
        self.dispatch(player_id, Job::Statistics { player_id, stats, reply })?;
        Ok(receiver)
    }

    /// Submits every action, then waits for all verdicts.
    ///
    /// Results come back in input order. Blocks the calling thread, so it
    /// must not be called from inside an async runtime.
    pub fn process_batch(
        &self,
        actions: impl IntoIterator<Item = PlayerAction>,
    ) -> SecurityResult<Vec<RealtimeDetectionResult>> {
        let pending = actions
            .into_iter()
            .map(|action| self.submit_action(action))
            .collect::<SecurityResult<Vec<_>>>()?;
        pending.into_iter().map(join).collect()
    }

    /// Submits every snapshot, then waits for all verdicts.
    ///
    /// Same blocking rules as [`process_batch`](Self::process_batch).
    pub fn analyze_batch(
        &self,
        snapshots: impl IntoIterator<Item = (PlayerId, PlayerStatistics)>,
    ) -> SecurityResult<Vec<StatisticalAnalysisResult>> {
        let pending = snapshots
            .into_iter()
            .map(|(player_id, stats)| self.submit_statistics(player_id, stats))
            .collect::<SecurityResult<Vec<_>>>()?;
        pending.into_iter().map(join).collect()
    }

    /// Evicts idle players from both pipelines.
    pub fn perform_maintenance(&self) -> MaintenanceReport {
        let report = MaintenanceReport {
            realtime_evicted: self.realtime.cleanup(),
            statistical_evicted: self.statistical.cleanup(),
        };
        if report.realtime_evicted + report.statistical_evicted > 0 {
            tracing::info!(
                realtime = report.realtime_evicted,
                statistical = report.statistical_evicted,
                "evicted idle players"
            );
        }
        report
    }

    /// Counters of both pipelines.
    #[must_use]
    pub fn statistics(&self) -> ServiceStatistics {
        ServiceStatistics {
            realtime: self.realtime.get_statistics(),
            statistical: self.statistical.get_statistics(),
            workers: self.workers.lock().len(),
        }
    }

    /// Zeroes the counters of both pipelines.
    pub fn reset_statistics(&self) {
        self.realtime.reset_statistics();
        self.statistical.reset_statistics();
    }

    /// Closes the mailboxes, waits for queued jobs to finish and shuts both
    /// pipelines down. Later submissions fail with
    /// [`SecurityError::ServiceShutdown`].
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.mailboxes.write().clear();
        let workers = std::mem::take(&mut *self.workers.lock());
        for (index, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                tracing::error!(worker = index, "worker panicked");
            }
        }
        self.realtime.shutdown();
        self.statistical.shutdown();
        tracing::info!("detection service shut down");
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// The real-time pipeline.
    #[must_use]
    pub fn realtime(&self) -> &RealtimeCheatDetector {
        &self.realtime
    }

    /// The statistical pipeline.
    #[must_use]
    pub fn statistical(&self) -> &StatisticalAnalysisEngine {
        &self.statistical
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}

impl Drop for DetectionService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join<T>(receiver: oneshot::Receiver<T>) -> SecurityResult<T> {
    receiver
        .blocking_recv()
        .map_err(|_| SecurityError::Internal("worker dropped a job without answering".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::ViolationType;
    use vigil_shared::constants::DEFAULT_PROFILE_TTL_MS;
    use vigil_shared::{ActionType, ManualClock, Vec3, ViewAngle};

    fn service(clock: &ManualClock, workers: usize) -> DetectionService {
        let mut config = DetectionConfig::default();
        config.service.worker_count = workers;
        config.service.queue_capacity = 8;
        DetectionService::with_clock(config, Arc::new(clock.clone()), Oracles::default())
            .unwrap_or_else(|e| panic!("service failed to start: {e}"))
    }

    fn aim(player: PlayerId, ts: u64, yaw: f64) -> PlayerAction {
        PlayerAction::new(player, ActionType::Aim, ts, Vec3::default(), ViewAngle::new(yaw, 0.0))
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DetectionConfig::default();
        config.service.worker_count = 0;
        assert!(matches!(
            DetectionService::new(config),
            Err(SecurityError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_batch_keeps_player_order() {
        let clock = ManualClock::new(0);
        let service = service(&clock, 4);
        let shot = PlayerAction::new(1, ActionType::Shoot, 1_050, Vec3::default(), ViewAngle::new(90.0, 0.0))
            .with_hit(true, true);
        let actions = vec![aim(1, 1_000, 0.0), aim(2, 1_000, 0.0), aim(1, 1_010, 90.0), shot];
        let results = service
            .process_batch(actions)
            .unwrap_or_else(|e| panic!("batch failed: {e}"));

        assert_eq!(results.len(), 4);
        assert_eq!(results[1].player_id, 2);
        assert!(results[3]
            .detections
            .iter()
            .any(|d| d.violation_type == ViolationType::Aimbot));
        assert_eq!(service.statistics().realtime.actions_processed, 4);
    }

    #[test]
    fn test_statistics_batch_and_maintenance() {
        let clock = ManualClock::new(0);
        let service = service(&clock, 2);
        let stats = PlayerStatistics {
            average_accuracy: 0.97,
            ..PlayerStatistics::new(5, 0)
        };
        let results = service
            .analyze_batch([(5, stats)])
            .unwrap_or_else(|e| panic!("batch failed: {e}"));
        assert!(!results[0].is_clean());
        assert_eq!(service.statistical().active_profiles(), 1);

        clock.advance(DEFAULT_PROFILE_TTL_MS + 1);
        let report = service.perform_maintenance();
        assert_eq!(report.statistical_evicted, 1);
        assert_eq!(report.realtime_evicted, 0);
    }

    #[test]
    fn test_dropped_receiver_still_runs_job() {
        let clock = ManualClock::new(0);
        let service = service(&clock, 1);
        drop(service.submit_action(aim(3, 0, 0.0)));
        let results = service
            .process_batch([aim(3, 10, 1.0)])
            .unwrap_or_else(|e| panic!("batch failed: {e}"));
        assert_eq!(results.len(), 1);
        assert_eq!(service.statistics().realtime.actions_processed, 2);
    }

    #[test]
    fn test_shutdown_refuses_work() {
        let clock = ManualClock::new(0);
        let service = service(&clock, 2);
        service.shutdown();
        service.shutdown();
        assert!(service.is_shutdown());
        assert_eq!(
            service.submit_action(aim(1, 0, 0.0)).err(),
            Some(SecurityError::ServiceShutdown)
        );
        assert_eq!(service.statistics().workers, 0);
        assert!(service.realtime().is_shutdown());
    }
}
