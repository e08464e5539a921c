//! # Realtime Cheat Detector
//!
//! The per-action orchestrator. Owns the sharded player registry and the
//! five detectors, and turns one [`PlayerAction`] into one
//! [`RealtimeDetectionResult`].
//!
//! ## Failure isolation
//!
//! Each detector call is guarded. A panic becomes a single low-confidence
//! `SYSTEM_ERROR` detection on the result, and the other detectors still
//! run. Nothing raised inside evaluation reaches the caller.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use vigil_shared::{Clock, PlayerAction, PlayerId, SystemClock};

use super::aimbot::{AimbotDetector, AimbotProfile};
use super::esp::{EspDetector, EspProfile};
use super::no_recoil::{NoRecoilDetector, RecoilProfile};
use super::oracle::Oracles;
use super::profile::PlayerRealtimeProfile;
use super::speed_hack::{SpeedHackDetector, SpeedProfile};
use super::trigger_bot::{TriggerBotDetector, TriggerProfile};
use super::RealtimeDetector;
use crate::config::{DetectionConfig, RealtimeConfig, RealtimeProfileConfig};
use crate::evidence::{CheatDetection, ViolationType};
use crate::guard::guarded;
use crate::registry::{PlayerRegistry, Tracked, TrackedState};
use crate::verdict::RealtimeDetectionResult;

/// Source name on system errors raised by the orchestrator itself.
pub const REALTIME_ORCHESTRATOR: &str = "RealtimeCheatDetector";

/// Everything the real-time pipeline knows about one player.
///
/// Lives inside one registry shard; only touched under that shard's lock.
#[derive(Clone, Debug)]
pub struct PlayerState {
    /// Shared behavior profile.
    pub profile: PlayerRealtimeProfile,
    /// Aimbot history.
    pub aimbot: Tracked<AimbotProfile>,
    /// Movement history.
    pub speed_hack: Tracked<SpeedProfile>,
    /// Reaction-time history.
    pub trigger_bot: Tracked<TriggerProfile>,
    /// Recoil history.
    pub no_recoil: Tracked<RecoilProfile>,
    /// Line-of-sight history.
    pub esp: Tracked<EspProfile>,
}

impl TrackedState for PlayerState {
    fn last_activity_ms(&self) -> u64 {
        self.profile.last_activity_ms()
    }
}

/// The five detectors.
struct Detectors {
    aimbot: AimbotDetector,
    speed_hack: SpeedHackDetector,
    trigger_bot: TriggerBotDetector,
    no_recoil: NoRecoilDetector,
    esp: EspDetector,
}

impl Detectors {
    fn new(config: &RealtimeConfig, oracles: &Oracles) -> Self {
        Self {
            aimbot: AimbotDetector::new(config.aimbot.clone()),
            speed_hack: SpeedHackDetector::new(config.speed_hack.clone()),
            trigger_bot: TriggerBotDetector::new(
                config.trigger_bot.clone(),
                Arc::clone(&oracles.reaction),
            ),
            no_recoil: NoRecoilDetector::new(config.no_recoil.clone(), Arc::clone(&oracles.recoil)),
            esp: EspDetector::new(config.esp.clone(), Arc::clone(&oracles.visibility)),
        }
    }

    fn new_state(&self, player_id: PlayerId, profile: &RealtimeProfileConfig, now_ms: u64) -> PlayerState {
        PlayerState {
            profile: PlayerRealtimeProfile::new(player_id, profile, now_ms),
            aimbot: Tracked::new(self.aimbot.new_profile(), now_ms),
            speed_hack: Tracked::new(self.speed_hack.new_profile(), now_ms),
            trigger_bot: Tracked::new(self.trigger_bot.new_profile(), now_ms),
            no_recoil: Tracked::new(self.no_recoil.new_profile(), now_ms),
            esp: Tracked::new(self.esp.new_profile(), now_ms),
        }
    }

    /// Resets private histories idle beyond the TTL. Returns how many.
    fn expire(&self, state: &mut PlayerState, now_ms: u64, ttl_ms: u64) -> usize {
        [
            state.aimbot.expire(now_ms, ttl_ms, || self.aimbot.new_profile()),
            state.speed_hack.expire(now_ms, ttl_ms, || self.speed_hack.new_profile()),
            state.trigger_bot.expire(now_ms, ttl_ms, || self.trigger_bot.new_profile()),
            state.no_recoil.expire(now_ms, ttl_ms, || self.no_recoil.new_profile()),
            state.esp.expire(now_ms, ttl_ms, || self.esp.new_profile()),
        ]
        .into_iter()
        .filter(|reset| *reset)
        .count()
    }
}

/// Runs one detector against its private history, isolating panics.
fn run_detector<D: RealtimeDetector>(
    detector: &D,
    action: &PlayerAction,
    profile: &PlayerRealtimeProfile,
    private: &mut Tracked<D::Profile>,
    now_ms: u64,
) -> Result<Vec<CheatDetection>, String> {
    if !detector.is_enabled() {
        return Ok(Vec::new());
    }
    private.touch(now_ms);
    guarded(|| detector.detect(action, profile, &mut private.inner))
}

/// Running totals.
#[derive(Default)]
struct Counters {
    actions_processed: AtomicU64,
    detections_emitted: AtomicU64,
    system_errors: AtomicU64,
    rejected_actions: AtomicU64,
    histogram: Mutex<BTreeMap<ViolationType, u64>>,
}

/// Snapshot of the real-time engine counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RealtimeStatistics {
    /// Actions evaluated.
    pub actions_processed: u64,
    /// Detections returned to callers.
    pub detections_emitted: u64,
    /// Caught internal failures.
    pub system_errors: u64,
    /// Actions refused because the player could not be admitted.
    pub rejected_actions: u64,
    /// Players currently tracked.
    pub active_profiles: usize,
    /// Idle players evicted.
    pub evictions: u64,
    /// Detections per violation type.
    pub violation_histogram: BTreeMap<ViolationType, u64>,
}

/// Per-action orchestrator.
pub struct RealtimeCheatDetector {
    config: RealtimeConfig,
    registry: PlayerRegistry<PlayerState>,
    detectors: Detectors,
    clock: Arc<dyn Clock>,
    counters: Counters,
    shutdown: AtomicBool,
}

impl RealtimeCheatDetector {
    /// Creates a detector on the wall clock with metadata-backed oracles.
    #[must_use]
    pub fn new(config: &DetectionConfig) -> Self {
        Self::with_components(config, Arc::new(SystemClock), Oracles::default())
    }

    /// Creates a detector with an explicit clock and oracle set.
    #[must_use]
    pub fn with_components(config: &DetectionConfig, clock: Arc<dyn Clock>, oracles: Oracles) -> Self {
        Self {
            config: config.realtime.clone(),
            registry: PlayerRegistry::new(config.registry.clone()),
            detectors: Detectors::new(&config.realtime, &oracles),
            clock,
            counters: Counters::default(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Evaluates one action.
    ///
    /// Never fails: internal errors come back as a `SYSTEM_ERROR` detection,
    /// and an unadmitted player comes back with `rejected` set.
    pub fn process_player_action(&self, action: &PlayerAction) -> RealtimeDetectionResult {
        let started = Instant::now();
        let player_id = action.player_id;
        let ts = action.timestamp_ms;
        let mut result = RealtimeDetectionResult::empty(player_id, ts);
        if !self.config.enabled || self.is_shutdown() {
            return result;
        }
        self.counters.actions_processed.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now_ms();
        let evaluated = guarded(|| {
            self.registry.with_player(
                player_id,
                now,
                || {
                    tracing::debug!("tracking new player {}", player_id);
                    self.detectors.new_state(player_id, &self.config.profile, now)
                },
                |state| self.evaluate(state, action, now),
            )
        });

        match evaluated {
            Ok(Some((detections, score))) => {
                result.detections = detections;
                result.suspicious_score = score;
            }
            Ok(None) => {
                self.counters.rejected_actions.fetch_add(1, Ordering::Relaxed);
                result.rejected = true;
            }
            Err(message) => {
                tracing::error!(player_id, "realtime evaluation failed: {}", message);
                self.counters.system_errors.fetch_add(1, Ordering::Relaxed);
                result.detections.push(CheatDetection::system_error(
                    REALTIME_ORCHESTRATOR,
                    format!("Evaluation failed: {message}"),
                    ts,
                ));
            }
        }

        self.record(&result);
        result.processing_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        if result.action_required() {
            tracing::warn!(
                player_id,
                score = result.suspicious_score,
                action = result.recommended_action().as_str(),
                "realtime verdict requires action"
            );
        }
        result
    }

    fn evaluate(
        &self,
        state: &mut PlayerState,
        action: &PlayerAction,
        now_ms: u64,
    ) -> (Vec<CheatDetection>, f64) {
        let ttl = self.registry.ttl_ms();
        let reset = self.detectors.expire(state, now_ms, ttl);
        if reset > 0 {
            tracing::debug!(player_id = action.player_id, reset, "reset idle detector histories");
        }
        state.profile.touch(now_ms);

        let mut failures: Vec<(&'static str, String)> = Vec::new();
        if let Err(message) = guarded(|| state.profile.add_action(action, &self.config.profile)) {
            failures.push(("PlayerRealtimeProfile", message));
        }

        let d = &self.detectors;
        let outcomes = [
            (
                d.aimbot.name(),
                run_detector(&d.aimbot, action, &state.profile, &mut state.aimbot, now_ms),
            ),
            (
                d.speed_hack.name(),
                run_detector(&d.speed_hack, action, &state.profile, &mut state.speed_hack, now_ms),
            ),
            (
                d.trigger_bot.name(),
                run_detector(&d.trigger_bot, action, &state.profile, &mut state.trigger_bot, now_ms),
            ),
            (
                d.no_recoil.name(),
                run_detector(&d.no_recoil, action, &state.profile, &mut state.no_recoil, now_ms),
            ),
            (
                d.esp.name(),
                run_detector(&d.esp, action, &state.profile, &mut state.esp, now_ms),
            ),
        ];

        let mut detections = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(found) => detections.extend(found),
                Err(message) => failures.push((name, message)),
            }
        }

        let detections = self.finalize(detections, &failures, action);
        for detection in &detections {
            if detection.violation_type != ViolationType::SystemError {
                tracing::debug!(
                    player_id = action.player_id,
                    detector = %detection.detector_name,
                    confidence = detection.confidence,
                    "{}: {}",
                    detection.violation_type,
                    detection.description
                );
                state.profile.add_detection(detection.clone(), &self.config.profile);
            }
        }
        (detections, state.profile.suspicious_score())
    }

    /// Filters, orders and caps the detections, then appends at most one
    /// system error for the failures.
    fn finalize(
        &self,
        mut detections: Vec<CheatDetection>,
        failures: &[(&'static str, String)],
        action: &PlayerAction,
    ) -> Vec<CheatDetection> {
        let min = self.config.min_confidence;
        detections.retain(|d| d.confidence >= min);
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detections.truncate(self.config.max_detections);

        if let Some((source, message)) = failures.first() {
            for (failed, reason) in failures {
                tracing::error!(player_id = action.player_id, source = failed, "detector failed: {}", reason);
            }
            self.counters
                .system_errors
                .fetch_add(failures.len() as u64, Ordering::Relaxed);
            detections.push(CheatDetection::system_error(
                source,
                format!("{source} failed: {message}"),
                action.timestamp_ms,
            ));
        }
        detections
    }

    fn record(&self, result: &RealtimeDetectionResult) {
        if result.detections.is_empty() {
            return;
        }
        self.counters
            .detections_emitted
            .fetch_add(result.detections.len() as u64, Ordering::Relaxed);
        let mut histogram = self.counters.histogram.lock();
        for detection in &result.detections {
            *histogram.entry(detection.violation_type).or_insert(0) += 1;
        }
    }

    /// Evicts idle players and resets idle detector histories.
    /// Returns the number of players evicted.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let evicted = self.registry.evict_idle(now);
        let ttl = self.registry.ttl_ms();
        let mut reset = 0;
        self.registry
            .for_each_mut(|state| reset += self.detectors.expire(state, now, ttl));
        tracing::debug!(evicted, reset, "realtime maintenance complete");
        evicted
    }

    /// Snapshot of the engine counters.
    #[must_use]
    pub fn get_statistics(&self) -> RealtimeStatistics {
        RealtimeStatistics {
            actions_processed: self.counters.actions_processed.load(Ordering::Relaxed),
            detections_emitted: self.counters.detections_emitted.load(Ordering::Relaxed),
            system_errors: self.counters.system_errors.load(Ordering::Relaxed),
            rejected_actions: self.counters.rejected_actions.load(Ordering::Relaxed),
            active_profiles: self.registry.len(),
            evictions: self.registry.evictions(),
            violation_histogram: self.counters.histogram.lock().clone(),
        }
    }

    /// Zeroes the counters. Player state is untouched.
    pub fn reset_statistics(&self) {
        self.counters.actions_processed.store(0, Ordering::Relaxed);
        self.counters.detections_emitted.store(0, Ordering::Relaxed);
        self.counters.system_errors.store(0, Ordering::Relaxed);
        self.counters.rejected_actions.store(0, Ordering::Relaxed);
        self.counters.histogram.lock().clear();
        self.registry.reset_counters();
    }

    /// Stops accepting actions and drops all player state.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        let players = self.registry.len();
        self.registry.clear();
        tracing::info!(players, "realtime detector shut down");
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Copy of a player's shared profile.
    #[must_use]
    pub fn profile_snapshot(&self, player_id: PlayerId) -> Option<PlayerRealtimeProfile> {
        self.registry.with_existing(player_id, |state| state.profile.clone())
    }

    /// A player's current suspicious score.
    #[must_use]
    pub fn suspicious_score(&self, player_id: PlayerId) -> Option<f64> {
        self.registry
            .with_existing(player_id, |state| state.profile.suspicious_score())
    }

    /// Players currently tracked.
    #[must_use]
    pub fn active_profiles(&self) -> usize {
        self.registry.len()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionPolicy;
    use crate::realtime::oracle::VisibilityOracle;
    use vigil_shared::constants::{DEFAULT_PROFILE_TTL_MS, META_LINE_OF_SIGHT};
    use vigil_shared::{ActionType, ManualClock, Vec3, ViewAngle};

    fn detector(clock: &ManualClock) -> RealtimeCheatDetector {
        RealtimeCheatDetector::with_components(
            &DetectionConfig::default(),
            Arc::new(clock.clone()),
            Oracles::default(),
        )
    }

    fn aim(player: PlayerId, ts: u64, yaw: f64) -> PlayerAction {
        PlayerAction::new(player, ActionType::Aim, ts, Vec3::default(), ViewAngle::new(yaw, 0.0))
    }

    #[test]
    fn test_snap_and_shot_produces_sorted_result() {
        let clock = ManualClock::new(0);
        let engine = detector(&clock);
        engine.process_player_action(&aim(1, 1_000, 0.0));
        engine.process_player_action(&aim(1, 1_010, 90.0));
        let shot = PlayerAction::new(1, ActionType::Shoot, 1_050, Vec3::default(), ViewAngle::new(90.0, 0.0))
            .with_hit(true, true);
        let result = engine.process_player_action(&shot);

        assert!(!result.is_clean());
        assert_eq!(result.detections[0].violation_type, ViolationType::Aimbot);
        assert!(result
            .detections
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        let stats = engine.get_statistics();
        assert_eq!(stats.actions_processed, 3);
        assert!(stats.violation_histogram[&ViolationType::Aimbot] >= 1);
    }

    #[test]
    fn test_result_score_counts_its_own_detections() {
        let clock = ManualClock::new(0);
        let engine = detector(&clock);
        let walk = |ts: u64, x: f64| {
            PlayerAction::new(2, ActionType::Move, ts, Vec3::new(x, 0.0, 0.0), ViewAngle::default())
        };
        let first = engine.process_player_action(&walk(1_000, 0.0));
        assert!(first.is_clean());
        assert!(first.suspicious_score.abs() < 1e-12);

        let result = engine.process_player_action(&walk(1_040, 100.0));
        assert!(!result.is_clean());
        assert!(result.suspicious_score > 0.0);
        let stored = engine
            .suspicious_score(2)
            .unwrap_or_else(|| panic!("player 2 has no profile"));
        assert!((result.suspicious_score - stored).abs() < 1e-12);
    }

    #[test]
    fn test_cleanup_evicts_after_ttl() {
        let clock = ManualClock::new(0);
        let engine = detector(&clock);
        engine.process_player_action(&aim(9, 0, 0.0));
        assert_eq!(engine.active_profiles(), 1);

        clock.advance(DEFAULT_PROFILE_TTL_MS + 1);
        assert_eq!(engine.cleanup(), 1);
        assert!(engine.profile_snapshot(9).is_none());
        assert_eq!(engine.get_statistics().evictions, 1);
    }

    struct ExplodingOracle;

    impl VisibilityOracle for ExplodingOracle {
        fn line_of_sight(&self, _action: &PlayerAction) -> Option<bool> {
            panic!("visibility service unavailable")
        }
    }

    #[test]
    fn test_detector_panic_becomes_system_error() {
        let clock = ManualClock::new(0);
        let mut oracles = Oracles::default();
        oracles.visibility = Arc::new(ExplodingOracle);
        let engine = RealtimeCheatDetector::with_components(
            &DetectionConfig::default(),
            Arc::new(clock),
            oracles,
        );
        let shot = PlayerAction::new(3, ActionType::Shoot, 0, Vec3::default(), ViewAngle::default())
            .with_hit(true, false)
            .with_meta(META_LINE_OF_SIGHT, false);
        let result = engine.process_player_action(&shot);

        let errors: Vec<_> = result
            .detections
            .iter()
            .filter(|d| d.violation_type == ViolationType::SystemError)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!((errors[0].confidence - 0.1).abs() < 1e-9);
        assert!(errors[0].description.contains("visibility service unavailable"));
        assert_eq!(engine.get_statistics().system_errors, 1);

        // The player is still served afterwards.
        assert!(engine.profile_snapshot(3).is_some());
    }

    #[test]
    fn test_reject_policy_marks_result() {
        let mut config = DetectionConfig::default();
        config.registry.max_profiles = 1;
        config.registry.admission = AdmissionPolicy::Reject;
        let engine = RealtimeCheatDetector::with_components(
            &config,
            Arc::new(ManualClock::new(0)),
            Oracles::default(),
        );
        assert!(!engine.process_player_action(&aim(1, 0, 0.0)).rejected);
        assert!(engine.process_player_action(&aim(2, 0, 0.0)).rejected);
        assert_eq!(engine.get_statistics().rejected_actions, 1);
    }

    #[test]
    fn test_reset_statistics_keeps_profiles() {
        let engine = detector(&ManualClock::new(0));
        engine.process_player_action(&aim(1, 0, 0.0));
        engine.reset_statistics();
        assert_eq!(engine.get_statistics().actions_processed, 0);
        assert_eq!(engine.active_profiles(), 1);
    }

    #[test]
    fn test_shutdown_stops_processing() {
        let engine = detector(&ManualClock::new(0));
        engine.process_player_action(&aim(1, 0, 0.0));
        engine.shutdown();
        assert_eq!(engine.active_profiles(), 0);
        let result = engine.process_player_action(&aim(1, 10, 0.0));
        assert!(result.is_clean());
        assert_eq!(engine.active_profiles(), 0);
    }
}
