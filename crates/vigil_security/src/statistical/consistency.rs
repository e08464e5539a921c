//! # Consistency Analysis
//!
//! Humans are noisy. This analyzer looks for the opposite: metrics that
//! barely move, repeat on a schedule, or stay packed into a narrow band.
//!
//! Every check works on the samples of the last `window_ms` (by snapshot
//! timestamp) and needs at least `min_samples` of them.
//!
//! ```text
//! contribution(metric) = max(0, 1 − variance / threshold)
//! composite            = mean contribution over judged metrics
//! periodicity          = max autocorrelation(accuracy, lag) for lag in 2..=10
//! entropy              = H(20-bucket accuracy histogram) / log2(20)
//! ```

use std::collections::BTreeMap;

use vigil_shared::series::{autocorrelation, normalized_entropy, variance};
use vigil_shared::{BoundedWindow, PlayerStatistics, StatMetric};

use super::profile::PlayerStatisticalProfile;
use super::StatisticalAnalyzer;
use crate::check::{collect_flagged, CheckOutcome};
use crate::config::ConsistencyConfig;
use crate::evidence::{StatisticalViolation, StatisticalViolationType};

/// Analyzer name carried on its violations.
pub const CONSISTENCY_ANALYZER: &str = "ConsistencyAnalyzer";

/// Metrics whose variance is judged.
pub const CONSISTENCY_METRICS: [StatMetric; 5] = [
    StatMetric::Accuracy,
    StatMetric::ReactionTime,
    StatMetric::KillDeathRatio,
    StatMetric::HeadshotRate,
    StatMetric::AimPrecision,
];

/// Metrics counted by the multi-metric check.
const CORE_METRICS: [StatMetric; 4] = [
    StatMetric::Accuracy,
    StatMetric::ReactionTime,
    StatMetric::KillDeathRatio,
    StatMetric::HeadshotRate,
];

/// Private per-metric series for one player.
#[derive(Clone, Debug)]
pub struct ConsistencyProfile {
    series: BTreeMap<StatMetric, BoundedWindow<(u64, f64)>>,
    latest_ms: u64,
}

impl ConsistencyProfile {
    /// Creates empty series.
    #[must_use]
    pub fn new(config: &ConsistencyConfig) -> Self {
        let series = CONSISTENCY_METRICS
            .iter()
            .map(|&metric| (metric, BoundedWindow::new(config.history_size)))
            .collect();
        Self { series, latest_ms: 0 }
    }

    fn record(&mut self, stats: &PlayerStatistics) {
        self.latest_ms = self.latest_ms.max(stats.timestamp_ms);
        for (&metric, window) in &mut self.series {
            let value = stats.metric(metric);
            if value.is_finite() {
                window.push((stats.timestamp_ms, value));
            }
        }
    }

    /// Values of `metric` no older than `window_ms` before the newest
    /// snapshot, oldest first.
    #[must_use]
    pub fn window(&self, metric: StatMetric, window_ms: u64) -> Vec<f64> {
        let start = self.latest_ms.saturating_sub(window_ms);
        self.series
            .get(&metric)
            .map(|w| {
                w.iter()
                    .filter(|(ts, _)| *ts >= start)
                    .map(|&(_, value)| value)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Consistency analyzer.
#[derive(Clone, Debug, Default)]
pub struct ConsistencyAnalyzer {
    config: ConsistencyConfig,
}

impl ConsistencyAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(config: ConsistencyConfig) -> Self {
        Self { config }
    }

    fn threshold(&self, metric: StatMetric) -> f64 {
        let cfg = &self.config;
        match metric {
            StatMetric::Accuracy => cfg.accuracy_variance,
            StatMetric::ReactionTime => cfg.reaction_variance,
            StatMetric::KillDeathRatio => cfg.kdr_variance,
            StatMetric::HeadshotRate => cfg.headshot_variance,
            _ => cfg.aim_precision_variance,
        }
    }

    /// Variance per metric, for metrics with enough in-window samples.
    fn variances(&self, state: &ConsistencyProfile) -> BTreeMap<StatMetric, f64> {
        CONSISTENCY_METRICS
            .iter()
            .filter_map(|&metric| {
                let values = state.window(metric, self.config.window_ms);
                if values.len() < self.config.min_samples {
                    return None;
                }
                variance(&values).map(|v| (metric, v))
            })
            .collect()
    }

    fn check_composite(&self, ts: u64, variances: &BTreeMap<StatMetric, f64>) -> CheckOutcome<StatisticalViolation> {
        if variances.is_empty() {
            return CheckOutcome::NoSignal;
        }
        let total: f64 = variances
            .iter()
            .map(|(&metric, &var)| (1.0 - var / self.threshold(metric)).max(0.0))
            .sum();
        let composite = total / variances.len() as f64;
        let threshold = self.config.composite_threshold;
        CheckOutcome::flag_if(composite > threshold, || {
            let mut violation = StatisticalViolation::new(
                StatisticalViolationType::SuspiciousConsistency,
                CONSISTENCY_ANALYZER,
                composite,
                format!("Composite consistency {composite:.2} across {} metrics", variances.len()),
                ts,
            )
            .with_values(composite, threshold);
            for (metric, var) in variances {
                violation = violation.with_meta(&format!("{metric}_variance"), *var);
            }
            violation
        })
    }

    fn check_periodicity(&self, ts: u64, accuracy: &[f64]) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        if accuracy.len() < cfg.min_samples {
            return CheckOutcome::NoSignal;
        }
        let best = (cfg.min_lag..=cfg.max_lag)
            .filter_map(|lag| autocorrelation(accuracy, lag).map(|r| (lag, r)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((lag, r)) = best else {
            return CheckOutcome::NoSignal;
        };
        CheckOutcome::flag_if(r > cfg.autocorrelation_threshold, || {
            StatisticalViolation::new(
                StatisticalViolationType::PeriodicPattern,
                CONSISTENCY_ANALYZER,
                r,
                format!("Accuracy repeats every {lag} snapshots (r = {r:.2})"),
                ts,
            )
            .with_values(r, cfg.autocorrelation_threshold)
            .with_meta("lag", lag as f64)
        })
    }

    fn check_entropy(&self, ts: u64, accuracy: &[f64]) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        if accuracy.len() < cfg.min_samples {
            return CheckOutcome::NoSignal;
        }
        let Some(entropy) = normalized_entropy(accuracy, cfg.entropy_buckets, 0.0, 1.0) else {
            return CheckOutcome::NoSignal;
        };
        CheckOutcome::flag_if(entropy < cfg.entropy_threshold, || {
            StatisticalViolation::new(
                StatisticalViolationType::LowEntropy,
                CONSISTENCY_ANALYZER,
                0.5 + 0.5 * (1.0 - entropy / cfg.entropy_threshold),
                format!("Accuracy distribution entropy {entropy:.3}"),
                ts,
            )
            .with_values(entropy, cfg.entropy_threshold)
        })
    }

    fn check_multi_metric(&self, ts: u64, variances: &BTreeMap<StatMetric, f64>) -> CheckOutcome<StatisticalViolation> {
        let judged: Vec<StatMetric> = CORE_METRICS
            .iter()
            .copied()
            .filter(|metric| variances.contains_key(metric))
            .collect();
        if judged.len() < self.config.multi_metric_required {
            return CheckOutcome::NoSignal;
        }
        let steady: Vec<StatMetric> = judged
            .into_iter()
            .filter(|metric| variances[metric] < self.threshold(*metric))
            .collect();
        CheckOutcome::flag_if(steady.len() >= self.config.multi_metric_required, || {
            let names: Vec<&str> = steady.iter().map(|m| m.name()).collect();
            StatisticalViolation::new(
                StatisticalViolationType::MultiMetricConsistency,
                CONSISTENCY_ANALYZER,
                steady.len() as f64 / CORE_METRICS.len() as f64,
                format!("Unnaturally steady: {}", names.join(", ")),
                ts,
            )
            .with_meta("steady_metrics", steady.len() as f64)
        })
    }
}

impl StatisticalAnalyzer for ConsistencyAnalyzer {
    type Profile = ConsistencyProfile;

    fn name(&self) -> &'static str {
        CONSISTENCY_ANALYZER
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> ConsistencyProfile {
        ConsistencyProfile::new(&self.config)
    }

    fn analyze(
        &self,
        stats: &PlayerStatistics,
        _profile: &PlayerStatisticalProfile,
        state: &mut ConsistencyProfile,
    ) -> Vec<StatisticalViolation> {
        state.record(stats);
        let ts = stats.timestamp_ms;
        let variances = self.variances(state);
        let accuracy = state.window(StatMetric::Accuracy, self.config.window_ms);
        collect_flagged([
            self.check_composite(ts, &variances),
            self.check_periodicity(ts, &accuracy),
            self.check_entropy(ts, &accuracy),
            self.check_multi_metric(ts, &variances),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatProfileConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MINUTE: u64 = 60_000;

    fn bot(ts: u64) -> PlayerStatistics {
        PlayerStatistics {
            average_accuracy: 0.62,
            average_reaction_time_ms: 180.0,
            kill_death_ratio: 3.0,
            headshot_percentage: 0.41,
            aim_precision: 0.9,
            ..PlayerStatistics::new(1, ts)
        }
    }

    fn human(rng: &mut StdRng, ts: u64) -> PlayerStatistics {
        PlayerStatistics {
            average_accuracy: rng.gen_range(0.1..0.5),
            average_reaction_time_ms: rng.gen_range(180.0..320.0),
            kill_death_ratio: rng.gen_range(0.4..2.0),
            headshot_percentage: rng.gen_range(0.05..0.35),
            aim_precision: rng.gen_range(0.3..0.8),
            ..PlayerStatistics::new(1, ts)
        }
    }

    fn run(analyzer: &ConsistencyAnalyzer, state: &mut ConsistencyProfile, stats: &PlayerStatistics) -> Vec<StatisticalViolation> {
        let profile = PlayerStatisticalProfile::new(1, &StatProfileConfig::default(), 0);
        analyzer.analyze(stats, &profile, state)
    }

    fn has(found: &[StatisticalViolation], kind: StatisticalViolationType) -> bool {
        found.iter().any(|v| v.violation_type == kind)
    }

    #[test]
    fn test_needs_min_samples() {
        let analyzer = ConsistencyAnalyzer::default();
        let mut state = analyzer.new_profile();
        for i in 0..24 {
            assert!(run(&analyzer, &mut state, &bot(i * 1_000)).is_empty());
        }
        assert!(!run(&analyzer, &mut state, &bot(24_000)).is_empty());
    }

    #[test]
    fn test_robotic_stats_flag_consistency() {
        let analyzer = ConsistencyAnalyzer::default();
        let mut state = analyzer.new_profile();
        let mut last = Vec::new();
        for i in 0..30 {
            last = run(&analyzer, &mut state, &bot(i * 1_000));
        }
        assert!(has(&last, StatisticalViolationType::SuspiciousConsistency));
        assert!(has(&last, StatisticalViolationType::LowEntropy));
        assert!(has(&last, StatisticalViolationType::MultiMetricConsistency));
    }

    #[test]
    fn test_periodic_accuracy() {
        let analyzer = ConsistencyAnalyzer::default();
        let mut state = analyzer.new_profile();
        let mut last = Vec::new();
        for i in 0..40u64 {
            let stats = PlayerStatistics {
                average_accuracy: if i % 4 < 2 { 0.8 } else { 0.2 },
                ..bot(i * 1_000)
            };
            last = run(&analyzer, &mut state, &stats);
        }
        assert!(has(&last, StatisticalViolationType::PeriodicPattern));
    }

    #[test]
    fn test_human_noise_is_clear() {
        let analyzer = ConsistencyAnalyzer::default();
        let mut state = analyzer.new_profile();
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..60 {
            let stats = human(&mut rng, i * 10_000);
            let found = run(&analyzer, &mut state, &stats);
            assert!(!has(&found, StatisticalViolationType::SuspiciousConsistency));
            assert!(!has(&found, StatisticalViolationType::MultiMetricConsistency));
            assert!(!has(&found, StatisticalViolationType::LowEntropy));
        }
    }

    #[test]
    fn test_old_samples_leave_the_window() {
        let analyzer = ConsistencyAnalyzer::default();
        let mut state = analyzer.new_profile();
        for i in 0..30 {
            run(&analyzer, &mut state, &bot(i * 1_000));
        }
        let found = run(&analyzer, &mut state, &bot(30_000 + 25 * MINUTE));
        assert!(found.is_empty());
        assert_eq!(state.window(StatMetric::Accuracy, 20 * MINUTE).len(), 1);
    }
}
