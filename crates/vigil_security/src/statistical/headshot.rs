//! # Headshot Analysis
//!
//! Watches `headshot_percentage`: the same level, steadiness and jump
//! checks as accuracy, plus two headshot-specific patterns.
//!
//! ## Streakiness
//!
//! ```text
//! ratio = sample / running average
//! ratio > 1.5 or ratio < 0.5   →  s += 0.15 · (1 − s)
//! otherwise                    →  s *= 0.95
//! ```
//!
//! A human's headshot rate wanders; toggled assistance swings it between
//! extremes. Streakiness stays in [0, 1] and fires above 0.6.

use vigil_shared::series::clamp01;
use vigil_shared::PlayerStatistics;

use super::profile::PlayerStatisticalProfile;
use super::rate::{RateCheck, RateHistory};
use super::StatisticalAnalyzer;
use crate::check::{collect_flagged, CheckOutcome};
use crate::config::HeadshotConfig;
use crate::evidence::{StatisticalViolation, StatisticalViolationType};

/// Analyzer name carried on its violations.
pub const HEADSHOT_ANALYZER: &str = "HeadshotAnalyzer";

/// Smallest running average a ratio is taken against.
const MIN_RATIO_BASE: f64 = 0.01;

/// Private headshot history for one player.
#[derive(Clone, Debug)]
pub struct HeadshotProfile {
    history: RateHistory,
    streakiness: f64,
}

impl HeadshotProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &HeadshotConfig) -> Self {
        Self {
            history: RateHistory::new(config.alpha, config.history_size),
            streakiness: 0.0,
        }
    }

    /// EMA and recent samples.
    #[must_use]
    pub fn history(&self) -> &RateHistory {
        &self.history
    }

    /// Current streakiness in [0, 1].
    #[must_use]
    pub const fn streakiness(&self) -> f64 {
        self.streakiness
    }
}

/// Headshot analyzer.
#[derive(Clone, Debug, Default)]
pub struct HeadshotAnalyzer {
    config: HeadshotConfig,
}

impl HeadshotAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(config: HeadshotConfig) -> Self {
        Self { config }
    }

    fn check_streakiness(
        &self,
        rate: f64,
        ts: u64,
        state: &mut HeadshotProfile,
    ) -> CheckOutcome<StatisticalViolation> {
        let Some(average) = state.history.average() else {
            return CheckOutcome::NoSignal;
        };
        let cfg = &self.config;
        let ratio = rate / average.max(MIN_RATIO_BASE);
        if ratio > cfg.streak_high_ratio || ratio < cfg.streak_low_ratio {
            state.streakiness += cfg.streak_increment * (1.0 - state.streakiness);
        } else {
            state.streakiness *= cfg.streak_decay;
        }
        let streakiness = state.streakiness;
        CheckOutcome::flag_if(streakiness > cfg.streak_threshold, || {
            StatisticalViolation::new(
                StatisticalViolationType::HeadshotStreakiness,
                HEADSHOT_ANALYZER,
                streakiness,
                format!("Bursty headshot rate (streakiness {streakiness:.2})"),
                ts,
            )
            .with_values(streakiness, cfg.streak_threshold)
            .with_meta("ratio", ratio)
        })
    }

    fn check_long_range(&self, stats: &PlayerStatistics) -> CheckOutcome<StatisticalViolation> {
        let rate = stats.headshot_percentage;
        let distance = stats.average_kill_distance;
        if !distance.is_finite() || distance <= 0.0 {
            return CheckOutcome::NoSignal;
        }
        let cfg = &self.config;
        CheckOutcome::flag_if(rate > cfg.long_range_rate && distance > cfg.long_range_distance, || {
            let rate_part = clamp01((rate - cfg.long_range_rate) / (1.0 - cfg.long_range_rate));
            let range_part = clamp01((distance - cfg.long_range_distance) / cfg.long_range_distance);
            StatisticalViolation::new(
                StatisticalViolationType::LongRangeHeadshots,
                HEADSHOT_ANALYZER,
                0.4 + 0.3 * rate_part + 0.3 * range_part,
                format!("Headshot rate {rate:.3} at {distance:.0} u average kill distance"),
                stats.timestamp_ms,
            )
            .with_values(rate, cfg.long_range_rate)
            .with_meta("kill_distance", distance)
        })
    }
}

impl StatisticalAnalyzer for HeadshotAnalyzer {
    type Profile = HeadshotProfile;

    fn name(&self) -> &'static str {
        HEADSHOT_ANALYZER
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> HeadshotProfile {
        HeadshotProfile::new(&self.config)
    }

    fn analyze(
        &self,
        stats: &PlayerStatistics,
        _profile: &PlayerStatisticalProfile,
        state: &mut HeadshotProfile,
    ) -> Vec<StatisticalViolation> {
        let rate = stats.headshot_percentage;
        if !rate.is_finite() {
            return Vec::new();
        }
        let cfg = &self.config;
        let check = RateCheck {
            analyzer: HEADSHOT_ANALYZER,
            label: "headshot rate",
            timestamp_ms: stats.timestamp_ms,
        };

        state.history.push(rate);
        let outcomes = [
            check.absolute(
                rate,
                cfg.impossible,
                cfg.suspicious,
                (
                    StatisticalViolationType::ImpossibleHeadshotRate,
                    StatisticalViolationType::SuspiciousHeadshotRate,
                ),
            ),
            check.low_variance(
                &state.history,
                cfg.min_variance_samples,
                cfg.variance_min_mean,
                cfg.low_variance,
                StatisticalViolationType::LowHeadshotVariance,
            ),
            check.spike(
                rate,
                &state.history,
                cfg.spike_delta,
                cfg.spike_floor,
                StatisticalViolationType::HeadshotSpike,
            ),
            self.check_streakiness(rate, stats.timestamp_ms, state),
            self.check_long_range(stats),
        ];
        state.history.commit(rate);
        collect_flagged(outcomes)
    }
}
