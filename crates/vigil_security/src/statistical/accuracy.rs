//! # Accuracy Analysis
//!
//! Watches `average_accuracy` per snapshot: absolute level, steadiness,
//! sudden jumps, and high accuracy paired with high damage per shot.

use vigil_shared::series::clamp01;
use vigil_shared::PlayerStatistics;

use super::profile::PlayerStatisticalProfile;
use super::rate::{RateCheck, RateHistory};
use super::StatisticalAnalyzer;
use crate::check::{collect_flagged, CheckOutcome};
use crate::config::AccuracyConfig;
use crate::evidence::{StatisticalViolation, StatisticalViolationType};

/// Analyzer name carried on its violations.
pub const ACCURACY_ANALYZER: &str = "AccuracyAnalyzer";

/// Private accuracy history for one player.
#[derive(Clone, Debug)]
pub struct AccuracyProfile {
    history: RateHistory,
}

impl AccuracyProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &AccuracyConfig) -> Self {
        Self {
            history: RateHistory::new(config.alpha, config.history_size),
        }
    }

    /// EMA and recent samples.
    #[must_use]
    pub fn history(&self) -> &RateHistory {
        &self.history
    }
}

/// Accuracy analyzer.
#[derive(Clone, Debug, Default)]
pub struct AccuracyAnalyzer {
    config: AccuracyConfig,
}

impl AccuracyAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(config: AccuracyConfig) -> Self {
        Self { config }
    }

    fn check_damage(&self, stats: &PlayerStatistics) -> CheckOutcome<StatisticalViolation> {
        let accuracy = stats.average_accuracy;
        let damage = stats.damage_per_shot;
        if !damage.is_finite() {
            return CheckOutcome::NoSignal;
        }
        let cfg = &self.config;
        CheckOutcome::flag_if(accuracy > cfg.damage_accuracy && damage > cfg.damage_per_shot, || {
            let excess = clamp01((damage - cfg.damage_per_shot) / cfg.damage_per_shot);
            StatisticalViolation::new(
                StatisticalViolationType::AccuracyDamageCorrelation,
                ACCURACY_ANALYZER,
                0.6 + 0.4 * excess,
                format!("Accuracy {accuracy:.3} with {damage:.1} damage per shot"),
                stats.timestamp_ms,
            )
            .with_values(damage, cfg.damage_per_shot)
            .with_meta("accuracy", accuracy)
        })
    }
}

impl StatisticalAnalyzer for AccuracyAnalyzer {
    type Profile = AccuracyProfile;

    fn name(&self) -> &'static str {
        ACCURACY_ANALYZER
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> AccuracyProfile {
        AccuracyProfile::new(&self.config)
    }

    fn analyze(
        &self,
        stats: &PlayerStatistics,
        _profile: &PlayerStatisticalProfile,
        state: &mut AccuracyProfile,
    ) -> Vec<StatisticalViolation> {
        let accuracy = stats.average_accuracy;
        if !accuracy.is_finite() {
            return Vec::new();
        }
        let cfg = &self.config;
        let check = RateCheck {
            analyzer: ACCURACY_ANALYZER,
            label: "accuracy",
            timestamp_ms: stats.timestamp_ms,
        };

        state.history.push(accuracy);
        let outcomes = [
            check.absolute(
                accuracy,
                cfg.impossible,
                cfg.suspicious,
                (
                    StatisticalViolationType::ImpossibleAccuracy,
                    StatisticalViolationType::SuspiciousAccuracy,
                ),
            ),
            check.low_variance(
                &state.history,
                cfg.min_variance_samples,
                cfg.variance_min_mean,
                cfg.low_variance,
                StatisticalViolationType::LowAccuracyVariance,
            ),
            check.spike(
                accuracy,
                &state.history,
                cfg.spike_delta,
                cfg.competence_floor,
                StatisticalViolationType::AccuracySpike,
            ),
            self.check_damage(stats),
        ];
        state.history.commit(accuracy);
        collect_flagged(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatProfileConfig;

    fn snapshot(accuracy: f64) -> PlayerStatistics {
        PlayerStatistics {
            average_accuracy: accuracy,
            damage_per_shot: 20.0,
            ..PlayerStatistics::new(1, 0)
        }
    }

    fn run(analyzer: &AccuracyAnalyzer, state: &mut AccuracyProfile, stats: &PlayerStatistics) -> Vec<StatisticalViolation> {
        let profile = PlayerStatisticalProfile::new(1, &StatProfileConfig::default(), 0);
        analyzer.analyze(stats, &profile, state)
    }

    fn kinds(found: &[StatisticalViolation]) -> Vec<StatisticalViolationType> {
        found.iter().map(|v| v.violation_type).collect()
    }

    #[test]
    fn test_impossible_accuracy_severity() {
        let analyzer = AccuracyAnalyzer::default();
        let mut state = analyzer.new_profile();
        let found = run(&analyzer, &mut state, &snapshot(0.97));
        assert_eq!(kinds(&found), vec![StatisticalViolationType::ImpossibleAccuracy]);
        assert!((found[0].severity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_normal_accuracy_is_clear() {
        let analyzer = AccuracyAnalyzer::default();
        let mut state = analyzer.new_profile();
        for i in 0..30 {
            let acc = 0.22 + 0.06 * ((i % 5) as f64 / 4.0);
            assert!(run(&analyzer, &mut state, &snapshot(acc)).is_empty());
        }
        assert!(state.history().average().is_some());
    }

    #[test]
    fn test_steady_high_accuracy_is_flagged() {
        let analyzer = AccuracyAnalyzer::default();
        let mut state = analyzer.new_profile();
        let mut last = Vec::new();
        for _ in 0..10 {
            last = run(&analyzer, &mut state, &snapshot(0.6));
        }
        assert_eq!(kinds(&last), vec![StatisticalViolationType::LowAccuracyVariance]);
    }

    #[test]
    fn test_spike_above_competence_floor() {
        let analyzer = AccuracyAnalyzer::default();
        let mut state = analyzer.new_profile();
        run(&analyzer, &mut state, &snapshot(0.3));
        let found = run(&analyzer, &mut state, &snapshot(0.7));
        assert!(kinds(&found).contains(&StatisticalViolationType::AccuracySpike));
    }

    #[test]
    fn test_damage_correlation() {
        let analyzer = AccuracyAnalyzer::default();
        let mut state = analyzer.new_profile();
        let stats = PlayerStatistics {
            damage_per_shot: 75.0,
            ..snapshot(0.85)
        };
        let found = run(&analyzer, &mut state, &stats);
        assert!(kinds(&found).contains(&StatisticalViolationType::AccuracyDamageCorrelation));
        assert!(kinds(&found).contains(&StatisticalViolationType::SuspiciousAccuracy));
    }

    #[test]
    fn test_non_finite_accuracy_is_skipped() {
        let analyzer = AccuracyAnalyzer::default();
        let mut state = analyzer.new_profile();
        assert!(run(&analyzer, &mut state, &snapshot(f64::NAN)).is_empty());
        assert!(state.history().samples().is_empty());
    }
}
