//! # Statistical Analysis Engine
//!
//! The per-snapshot orchestrator. Owns the sharded registry of statistical
//! player state, the five analyzers and the shared population baseline,
//! and turns one [`PlayerStatistics`] into one
//! [`StatisticalAnalysisResult`].
//!
//! ## Order of work
//!
//! 1. record the snapshot on the profile
//! 2. run the analyzers (each guarded)
//! 3. fold their violations into the anomaly level
//! 4. profile-level checks: anomaly level, superhuman performance,
//!    impossible long-run means (tagged with the player's first snapshot
//!    and the metric's trend slope)
//! 5. filter, sort, cap

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use vigil_shared::series::clamp01;
use vigil_shared::{Clock, PlayerId, PlayerStatistics, StatMetric, SystemClock};

use super::accuracy::{AccuracyAnalyzer, AccuracyProfile};
use super::consistency::{ConsistencyAnalyzer, ConsistencyProfile};
use super::headshot::{HeadshotAnalyzer, HeadshotProfile};
use super::outlier::{OutlierAnalyzer, OutlierProfile};
use super::performance::{PerformanceAnalyzer, PerformanceProfile};
use super::population::PopulationStatistics;
use super::profile::PlayerStatisticalProfile;
use super::StatisticalAnalyzer;
use crate::check::{collect_flagged, CheckOutcome};
use crate::config::{DetectionConfig, StatisticalConfig};
use crate::evidence::{StatisticalViolation, StatisticalViolationType};
use crate::guard::guarded;
use crate::registry::{PlayerRegistry, Tracked, TrackedState};
use crate::verdict::StatisticalAnalysisResult;

/// Source name on violations raised by the engine itself.
pub const STATISTICAL_ORCHESTRATOR: &str = "StatisticalAnalysisEngine";

/// Everything the statistical pipeline knows about one player.
#[derive(Clone, Debug)]
pub struct StatisticalPlayerState {
    /// Long-horizon profile.
    pub profile: PlayerStatisticalProfile,
    /// Accuracy EMA and samples.
    pub accuracy: Tracked<AccuracyProfile>,
    /// Headshot EMA, samples and streakiness.
    pub headshot: Tracked<HeadshotProfile>,
    /// KDR and accuracy series.
    pub performance: Tracked<PerformanceProfile>,
    /// Timestamped metric series.
    pub consistency: Tracked<ConsistencyProfile>,
    /// Recent outlier flags.
    pub outlier: Tracked<OutlierProfile>,
}

impl TrackedState for StatisticalPlayerState {
    fn last_activity_ms(&self) -> u64 {
        self.profile.last_activity_ms()
    }
}

/// The five analyzers.
struct Analyzers {
    accuracy: AccuracyAnalyzer,
    headshot: HeadshotAnalyzer,
    performance: PerformanceAnalyzer,
    consistency: ConsistencyAnalyzer,
    outlier: OutlierAnalyzer,
}

impl Analyzers {
    fn new(config: &StatisticalConfig, population: Arc<PopulationStatistics>) -> Self {
        Self {
            accuracy: AccuracyAnalyzer::new(config.accuracy.clone()),
            headshot: HeadshotAnalyzer::new(config.headshot.clone()),
            performance: PerformanceAnalyzer::new(config.performance.clone()),
            consistency: ConsistencyAnalyzer::new(config.consistency.clone()),
            outlier: OutlierAnalyzer::new(config.outlier.clone(), population),
        }
    }

    fn new_state(&self, player_id: PlayerId, config: &StatisticalConfig, now_ms: u64) -> StatisticalPlayerState {
        StatisticalPlayerState {
            profile: PlayerStatisticalProfile::new(player_id, &config.profile, now_ms),
            accuracy: Tracked::new(self.accuracy.new_profile(), now_ms),
            headshot: Tracked::new(self.headshot.new_profile(), now_ms),
            performance: Tracked::new(self.performance.new_profile(), now_ms),
            consistency: Tracked::new(self.consistency.new_profile(), now_ms),
            outlier: Tracked::new(self.outlier.new_profile(), now_ms),
        }
    }

    fn expire(&self, state: &mut StatisticalPlayerState, now_ms: u64, ttl_ms: u64) -> usize {
        [
            state.accuracy.expire(now_ms, ttl_ms, || self.accuracy.new_profile()),
            state.headshot.expire(now_ms, ttl_ms, || self.headshot.new_profile()),
            state.performance.expire(now_ms, ttl_ms, || self.performance.new_profile()),
            state.consistency.expire(now_ms, ttl_ms, || self.consistency.new_profile()),
            state.outlier.expire(now_ms, ttl_ms, || self.outlier.new_profile()),
        ]
        .into_iter()
        .filter(|reset| *reset)
        .count()
    }
}

fn run_analyzer<A: StatisticalAnalyzer>(
    analyzer: &A,
    stats: &PlayerStatistics,
    profile: &PlayerStatisticalProfile,
    private: &mut Tracked<A::Profile>,
    now_ms: u64,
) -> Result<Vec<StatisticalViolation>, String> {
    if !analyzer.is_enabled() {
        return Ok(Vec::new());
    }
    private.touch(now_ms);
    guarded(|| analyzer.analyze(stats, profile, &mut private.inner))
}

#[derive(Default)]
struct Counters {
    snapshots_processed: AtomicU64,
    violations_emitted: AtomicU64,
    system_errors: AtomicU64,
    rejected_snapshots: AtomicU64,
    histogram: Mutex<BTreeMap<StatisticalViolationType, u64>>,
}

/// Snapshot of the statistical engine counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatisticalEngineStatistics {
    /// Snapshots analyzed.
    pub snapshots_processed: u64,
    /// Violations returned to callers.
    pub violations_emitted: u64,
    /// Caught internal failures.
    pub system_errors: u64,
    /// Snapshots refused because the player could not be admitted.
    pub rejected_snapshots: u64,
    /// Players currently tracked.
    pub active_profiles: usize,
    /// Idle players evicted.
    pub evictions: u64,
    /// Violations per type.
    pub violation_histogram: BTreeMap<StatisticalViolationType, u64>,
}

/// What one evaluation hands back to the caller.
struct Evaluation {
    violations: Vec<StatisticalViolation>,
    anomaly_level: f64,
    sample_count: usize,
}

/// Per-snapshot orchestrator.
pub struct StatisticalAnalysisEngine {
    config: StatisticalConfig,
    registry: PlayerRegistry<StatisticalPlayerState>,
    analyzers: Analyzers,
    population: Arc<PopulationStatistics>,
    clock: Arc<dyn Clock>,
    counters: Counters,
    shutdown: AtomicBool,
}

impl StatisticalAnalysisEngine {
    /// Creates an engine on the wall clock with a fresh population baseline.
    #[must_use]
    pub fn new(config: &DetectionConfig) -> Self {
        let population = Arc::new(PopulationStatistics::new(config.statistical.outlier.population_alpha));
        Self::with_components(config, Arc::new(SystemClock), population)
    }

    /// Creates an engine with an explicit clock and population baseline.
    #[must_use]
    pub fn with_components(
        config: &DetectionConfig,
        clock: Arc<dyn Clock>,
        population: Arc<PopulationStatistics>,
    ) -> Self {
        Self {
            config: config.statistical.clone(),
            registry: PlayerRegistry::new(config.registry.clone()),
            analyzers: Analyzers::new(&config.statistical, Arc::clone(&population)),
            population,
            clock,
            counters: Counters::default(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Analyzes one statistics snapshot for a player.
    ///
    /// Never fails: internal errors come back as a `SYSTEM_ERROR`
    /// violation, and an unadmitted player comes back with `rejected` set.
    pub fn analyze_player_statistics(
        &self,
        player_id: PlayerId,
        stats: &PlayerStatistics,
    ) -> StatisticalAnalysisResult {
        let started = Instant::now();
        let ts = stats.timestamp_ms;
        let mut result = StatisticalAnalysisResult::empty(player_id, ts);
        if !self.config.enabled || self.is_shutdown() {
            return result;
        }
        self.counters.snapshots_processed.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now_ms();
        let evaluated = guarded(|| {
            self.registry.with_player(
                player_id,
                now,
                || {
                    tracing::debug!("tracking statistics for new player {}", player_id);
                    self.analyzers.new_state(player_id, &self.config, now)
                },
                |state| self.evaluate(state, player_id, stats, now),
            )
        });

        match evaluated {
            Ok(Some(evaluation)) => {
                result.violations = evaluation.violations;
                result.anomaly_level = evaluation.anomaly_level;
                result.sample_count = evaluation.sample_count;
            }
            Ok(None) => {
                self.counters.rejected_snapshots.fetch_add(1, Ordering::Relaxed);
                result.rejected = true;
            }
            Err(message) => {
                tracing::error!(player_id, "statistical analysis failed: {}", message);
                self.counters.system_errors.fetch_add(1, Ordering::Relaxed);
                result.violations.push(StatisticalViolation::system_error(
                    STATISTICAL_ORCHESTRATOR,
                    format!("Analysis failed: {message}"),
                    ts,
                ));
            }
        }

        self.record(&result);
        result.processing_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        if result.action_required() {
            tracing::warn!(
                player_id,
                anomaly = result.anomaly_level,
                action = result.recommended_action().as_str(),
                "statistical verdict requires action"
            );
        }
        result
    }

    fn evaluate(
        &self,
        state: &mut StatisticalPlayerState,
        player_id: PlayerId,
        stats: &PlayerStatistics,
        now_ms: u64,
    ) -> Evaluation {
        let reset = self.analyzers.expire(state, now_ms, self.registry.ttl_ms());
        if reset > 0 {
            tracing::debug!(player_id, reset, "reset idle analyzer histories");
        }
        state.profile.touch(now_ms);

        let mut failures: Vec<(&'static str, String)> = Vec::new();
        if let Err(message) = guarded(|| state.profile.add_statistics(stats)) {
            failures.push(("PlayerStatisticalProfile", message));
        }

        let a = &self.analyzers;
        let outcomes = [
            (
                a.accuracy.name(),
                run_analyzer(&a.accuracy, stats, &state.profile, &mut state.accuracy, now_ms),
            ),
            (
                a.headshot.name(),
                run_analyzer(&a.headshot, stats, &state.profile, &mut state.headshot, now_ms),
            ),
            (
                a.performance.name(),
                run_analyzer(&a.performance, stats, &state.profile, &mut state.performance, now_ms),
            ),
            (
                a.consistency.name(),
                run_analyzer(&a.consistency, stats, &state.profile, &mut state.consistency, now_ms),
            ),
            (
                a.outlier.name(),
                run_analyzer(&a.outlier, stats, &state.profile, &mut state.outlier, now_ms),
            ),
        ];

        let mut violations = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(found) => violations.extend(found),
                Err(message) => failures.push((name, message)),
            }
        }

        state.profile.update_anomaly(&violations, &self.config.profile);
        violations.extend(self.profile_checks(stats, &state.profile));

        let violations = self.finalize(violations, &failures, player_id, stats.timestamp_ms);
        let raised = violations
            .iter()
            .filter(|v| v.violation_type != StatisticalViolationType::SystemError)
            .inspect(|v| {
                tracing::debug!(
                    player_id,
                    analyzer = %v.analyzer_name,
                    confidence = v.confidence,
                    "{}: {}",
                    v.violation_type,
                    v.description
                );
            })
            .count();
        state.profile.record_violations(raised);

        Evaluation {
            violations,
            anomaly_level: state.profile.anomaly_level(),
            sample_count: state.profile.sample_count(),
        }
    }

    /// Checks on the accumulated profile rather than one snapshot.
    fn profile_checks(
        &self,
        stats: &PlayerStatistics,
        profile: &PlayerStatisticalProfile,
    ) -> Vec<StatisticalViolation> {
        let ts = stats.timestamp_ms;
        let mut outcomes = vec![
            self.check_anomaly_level(ts, profile),
            self.check_superhuman(stats),
        ];
        outcomes.extend(self.check_long_run_means(ts, profile));
        collect_flagged(outcomes)
    }

    fn check_anomaly_level(&self, ts: u64, profile: &PlayerStatisticalProfile) -> CheckOutcome<StatisticalViolation> {
        let level = profile.anomaly_level();
        let threshold = self.config.anomaly_threshold;
        CheckOutcome::flag_if(level > threshold, || {
            StatisticalViolation::new(
                StatisticalViolationType::AnomalyLevel,
                STATISTICAL_ORCHESTRATOR,
                level,
                format!("Sustained anomaly level {level:.2}"),
                ts,
            )
            .with_values(level, threshold)
        })
    }

    fn check_superhuman(&self, stats: &PlayerStatistics) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config.superhuman;
        if stats.statistical_significance < cfg.min_significance {
            return CheckOutcome::NoSignal;
        }
        let indicators = [
            stats.average_accuracy > cfg.accuracy,
            stats.headshot_percentage > cfg.headshot,
            stats.kill_death_ratio > cfg.kill_death_ratio,
            stats.win_rate > cfg.win_rate,
        ];
        let count = indicators.iter().filter(|&&hit| hit).count();
        CheckOutcome::flag_if(count >= cfg.min_indicators, || {
            StatisticalViolation::new(
                StatisticalViolationType::SuperhumanPerformance,
                STATISTICAL_ORCHESTRATOR,
                count as f64 / indicators.len() as f64,
                format!("{count} of 4 superhuman indicators at once"),
                stats.timestamp_ms,
            )
            .with_meta("accuracy", stats.average_accuracy)
            .with_meta("headshot_rate", stats.headshot_percentage)
            .with_meta("kdr", stats.kill_death_ratio)
            .with_meta("win_rate", stats.win_rate)
        })
    }

    fn check_long_run_means(
        &self,
        ts: u64,
        profile: &PlayerStatisticalProfile,
    ) -> [CheckOutcome<StatisticalViolation>; 2] {
        let cfg = &self.config.profile;
        let judge = |metric: StatMetric, threshold: f64, kind: StatisticalViolationType| {
            if profile.significant().len() < cfg.profile_check_min_samples {
                return CheckOutcome::NoSignal;
            }
            let Some(mean) = profile.significant_mean(metric) else {
                return CheckOutcome::NoSignal;
            };
            CheckOutcome::flag_if(mean > threshold, || {
                let excess = clamp01((mean - threshold) / (1.0 - threshold).max(f64::EPSILON));
                let mut violation = StatisticalViolation::new(
                    kind,
                    STATISTICAL_ORCHESTRATOR,
                    0.8 + 0.2 * excess,
                    format!(
                        "Mean {metric} {mean:.3} over {} significant snapshots",
                        profile.significant().len()
                    ),
                    ts,
                )
                .with_values(mean, threshold);
                if let Some(first) = profile.baseline() {
                    violation = violation.with_meta("first_snapshot", first.metric(metric));
                }
                if let Some(slope) = profile.trends().slope(metric) {
                    violation = violation.with_meta("trend_slope", slope);
                }
                violation
            })
        };
        [
            judge(
                StatMetric::Accuracy,
                cfg.profile_impossible_accuracy,
                StatisticalViolationType::ImpossibleAccuracy,
            ),
            judge(
                StatMetric::HeadshotRate,
                cfg.profile_impossible_headshot,
                StatisticalViolationType::ImpossibleHeadshotRate,
            ),
        ]
    }

    /// Filters, orders and caps the violations, then appends at most one
    /// system error for the failures.
    fn finalize(
        &self,
        mut violations: Vec<StatisticalViolation>,
        failures: &[(&'static str, String)],
        player_id: PlayerId,
        ts: u64,
    ) -> Vec<StatisticalViolation> {
        let min = self.config.min_confidence;
        violations.retain(|v| v.confidence >= min);
        violations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        violations.truncate(self.config.max_violations);

        if let Some((source, message)) = failures.first() {
            for (failed, reason) in failures {
                tracing::error!(player_id, source = failed, "analyzer failed: {}", reason);
            }
            self.counters
                .system_errors
                .fetch_add(failures.len() as u64, Ordering::Relaxed);
            violations.push(StatisticalViolation::system_error(
                source,
                format!("{source} failed: {message}"),
                ts,
            ));
        }
        violations
    }

    fn record(&self, result: &StatisticalAnalysisResult) {
        if result.violations.is_empty() {
            return;
        }
        self.counters
            .violations_emitted
            .fetch_add(result.violations.len() as u64, Ordering::Relaxed);
        let mut histogram = self.counters.histogram.lock();
        for violation in &result.violations {
            *histogram.entry(violation.violation_type).or_insert(0) += 1;
        }
    }

    /// Evicts idle players and resets idle analyzer histories.
    /// Returns the number of players evicted.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let evicted = self.registry.evict_idle(now);
        let ttl = self.registry.ttl_ms();
        let mut reset = 0;
        self.registry
            .for_each_mut(|state| reset += self.analyzers.expire(state, now, ttl));
        tracing::debug!(evicted, reset, "statistical maintenance complete");
        evicted
    }

    /// Snapshot of the engine counters.
    #[must_use]
    pub fn get_statistics(&self) -> StatisticalEngineStatistics {
        StatisticalEngineStatistics {
            snapshots_processed: self.counters.snapshots_processed.load(Ordering::Relaxed),
            violations_emitted: self.counters.violations_emitted.load(Ordering::Relaxed),
            system_errors: self.counters.system_errors.load(Ordering::Relaxed),
            rejected_snapshots: self.counters.rejected_snapshots.load(Ordering::Relaxed),
            active_profiles: self.registry.len(),
            evictions: self.registry.evictions(),
            violation_histogram: self.counters.histogram.lock().clone(),
        }
    }

    /// Zeroes the counters. Player state and the population are untouched.
    pub fn reset_statistics(&self) {
        self.counters.snapshots_processed.store(0, Ordering::Relaxed);
        self.counters.violations_emitted.store(0, Ordering::Relaxed);
        self.counters.system_errors.store(0, Ordering::Relaxed);
        self.counters.rejected_snapshots.store(0, Ordering::Relaxed);
        self.counters.histogram.lock().clear();
        self.registry.reset_counters();
    }

    /// Stops accepting snapshots and drops all player state.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        let players = self.registry.len();
        self.registry.clear();
        tracing::info!(players, "statistical engine shut down");
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Copy of a player's statistical profile.
    #[must_use]
    pub fn profile_snapshot(&self, player_id: PlayerId) -> Option<PlayerStatisticalProfile> {
        self.registry.with_existing(player_id, |state| state.profile.clone())
    }

    /// A player's current anomaly level.
    #[must_use]
    pub fn anomaly_level(&self, player_id: PlayerId) -> Option<f64> {
        self.registry
            .with_existing(player_id, |state| state.profile.anomaly_level())
    }

    /// The shared population baseline.
    #[must_use]
    pub fn population(&self) -> &Arc<PopulationStatistics> {
        &self.population
    }

    /// Players currently tracked.
    #[must_use]
    pub fn active_profiles(&self) -> usize {
        self.registry.len()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &StatisticalConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_shared::constants::DEFAULT_PROFILE_TTL_MS;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use vigil_shared::{ManualClock, MetaValue};

    fn engine(clock: &ManualClock) -> StatisticalAnalysisEngine {
        StatisticalAnalysisEngine::with_components(
            &DetectionConfig::default(),
            Arc::new(clock.clone()),
            Arc::new(PopulationStatistics::default()),
        )
    }

    fn typical(player: PlayerId, ts: u64) -> PlayerStatistics {
        PlayerStatistics {
            average_accuracy: 0.26,
            headshot_percentage: 0.14,
            kill_death_ratio: 1.05,
            damage_per_shot: 24.0,
            shots_per_second: 4.0,
            average_reaction_time_ms: 245.0,
            kills_per_minute: 0.8,
            win_rate: 0.5,
            statistical_significance: 0.8,
            ..PlayerStatistics::new(player, ts)
        }
    }

    fn cheater(player: PlayerId, ts: u64) -> PlayerStatistics {
        PlayerStatistics {
            average_accuracy: 0.97,
            headshot_percentage: 0.85,
            kill_death_ratio: 18.0,
            win_rate: 0.95,
            ..typical(player, ts)
        }
    }

    fn has(result: &StatisticalAnalysisResult, kind: StatisticalViolationType) -> bool {
        result.violations.iter().any(|v| v.violation_type == kind)
    }

    #[test]
    fn test_impossible_accuracy_scenario() {
        let engine = engine(&ManualClock::new(0));
        let stats = PlayerStatistics {
            average_accuracy: 0.97,
            ..PlayerStatistics::new(4, 0)
        };
        let result = engine.analyze_player_statistics(4, &stats);
        let found = result
            .violations
            .iter()
            .find(|v| v.violation_type == StatisticalViolationType::ImpossibleAccuracy);
        assert!(found.is_some_and(|v| (v.severity - 0.4).abs() < 1e-6));
        assert_eq!(result.sample_count, 1);
    }

    #[test]
    fn test_cheater_is_superhuman_and_sorted() {
        let engine = engine(&ManualClock::new(0));
        let result = engine.analyze_player_statistics(1, &cheater(1, 0));
        assert!(has(&result, StatisticalViolationType::SuperhumanPerformance));
        assert!(result
            .violations
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert!(result.violations.iter().all(|v| v.confidence >= 0.2));
        assert!(result.violations.len() <= 20);
        assert!(result.action_required());
    }

    #[test]
    fn test_repeated_cheating_raises_profile_flags() {
        let engine = engine(&ManualClock::new(0));
        let mut last = StatisticalAnalysisResult::empty(1, 0);
        for i in 0..6 {
            last = engine.analyze_player_statistics(1, &cheater(1, i * 60_000));
        }
        assert!(last.anomaly_level > 0.7);
        assert!(has(&last, StatisticalViolationType::AnomalyLevel));
        assert!(last
            .violations
            .iter()
            .any(|v| v.violation_type == StatisticalViolationType::ImpossibleAccuracy
                && v.analyzer_name == STATISTICAL_ORCHESTRATOR));
    }

    #[test]
    fn test_long_run_mean_carries_trend() {
        let engine = engine(&ManualClock::new(0));
        let mut last = StatisticalAnalysisResult::empty(1, 0);
        for i in 0..6u64 {
            let stats = PlayerStatistics {
                average_accuracy: 0.91 + 0.01 * i as f64,
                ..cheater(1, i * 60_000)
            };
            last = engine.analyze_player_statistics(1, &stats);
        }
        let long_run = last
            .violations
            .iter()
            .find(|v| {
                v.violation_type == StatisticalViolationType::ImpossibleAccuracy
                    && v.analyzer_name == STATISTICAL_ORCHESTRATOR
            })
            .unwrap_or_else(|| panic!("no long-run accuracy violation: {:?}", last.violations));
        let number = |key: &str| match long_run.metadata.get(key) {
            Some(MetaValue::Number(value)) => *value,
            other => panic!("{key}: {other:?}"),
        };
        assert!((number("first_snapshot") - 0.91).abs() < 1e-9);
        assert!((number("trend_slope") - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_typical_player_stays_quiet() {
        let engine = engine(&ManualClock::new(0));
        let mut rng = StdRng::seed_from_u64(11);
        for i in 0..10 {
            let stats = PlayerStatistics {
                average_accuracy: rng.gen_range(0.18..0.34),
                headshot_percentage: rng.gen_range(0.08..0.22),
                kill_death_ratio: rng.gen_range(0.8..1.4),
                damage_per_shot: rng.gen_range(20.0..28.0),
                average_reaction_time_ms: rng.gen_range(210.0..290.0),
                kills_per_minute: rng.gen_range(0.6..1.0),
                win_rate: rng.gen_range(0.4..0.6),
                ..typical(2, i * 60_000)
            };
            let result = engine.analyze_player_statistics(2, &stats);
            assert!(!result.action_required(), "snapshot {i}: {:?}", result.violations);
        }
        assert!(engine.anomaly_level(2).is_some_and(|level| level < 0.3));
    }

    #[test]
    fn test_anomaly_decays_when_quiet() {
        let engine = engine(&ManualClock::new(0));
        engine.analyze_player_statistics(3, &cheater(3, 0));
        let peak = engine.anomaly_level(3).unwrap_or_default();
        let quiet = PlayerStatistics::new(3, 1);
        engine.analyze_player_statistics(3, &quiet);
        let after = engine.anomaly_level(3).unwrap_or_default();
        assert!(after <= peak);
    }

    #[test]
    fn test_cleanup_and_shutdown() {
        let clock = ManualClock::new(0);
        let engine = engine(&clock);
        engine.analyze_player_statistics(5, &typical(5, 0));
        clock.advance(DEFAULT_PROFILE_TTL_MS + 1);
        assert_eq!(engine.cleanup(), 1);
        assert_eq!(engine.active_profiles(), 0);

        engine.analyze_player_statistics(5, &typical(5, 1));
        engine.shutdown();
        engine.shutdown();
        assert!(engine.is_shutdown());
        assert!(engine.analyze_player_statistics(5, &typical(5, 2)).is_clean());
        assert_eq!(engine.active_profiles(), 0);
    }

    #[test]
    fn test_statistics_histogram() {
        let engine = engine(&ManualClock::new(0));
        engine.analyze_player_statistics(1, &cheater(1, 0));
        let stats = engine.get_statistics();
        assert_eq!(stats.snapshots_processed, 1);
        assert!(stats.violations_emitted > 0);
        assert_eq!(
            stats.violation_histogram.get(&StatisticalViolationType::SuperhumanPerformance),
            Some(&1)
        );
        engine.reset_statistics();
        assert_eq!(engine.get_statistics().violations_emitted, 0);
        assert_eq!(engine.active_profiles(), 1);
    }
}
