//! # Statistical Player Profile
//!
//! Long-horizon view of one player's statistics snapshots.
//!
//! ## Anomaly level
//!
//! ```text
//! level = clamp(level · decay + growth · Σ(confidence · severity))
//! ```
//!
//! With no new violations the level only decays, so it never rises between
//! two quiet updates.

use std::collections::BTreeMap;

use vigil_shared::series::{clamp01, linear_slope, mean, variance};
use vigil_shared::{BoundedWindow, PlayerId, PlayerStatistics, StatMetric};

use crate::config::StatProfileConfig;
use crate::evidence::StatisticalViolation;

/// Bounded per-metric series for variance and slope queries.
#[derive(Clone, Debug)]
pub struct MetricTrends {
    series: BTreeMap<StatMetric, BoundedWindow<f64>>,
    capacity: usize,
}

impl MetricTrends {
    /// Creates empty series holding up to `capacity` points each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            series: BTreeMap::new(),
            capacity,
        }
    }

    /// Appends every finite metric of a snapshot.
    pub fn record(&mut self, stats: &PlayerStatistics) {
        for metric in StatMetric::ALL {
            let value = stats.metric(metric);
            if value.is_finite() {
                self.series
                    .entry(metric)
                    .or_insert_with(|| BoundedWindow::new(self.capacity))
                    .push(value);
            }
        }
    }

    /// Points recorded for a metric, oldest first.
    #[must_use]
    pub fn values(&self, metric: StatMetric) -> Vec<f64> {
        self.series
            .get(&metric)
            .map(BoundedWindow::to_vec)
            .unwrap_or_default()
    }

    /// Variance of a metric's series.
    #[must_use]
    pub fn variance(&self, metric: StatMetric) -> Option<f64> {
        variance(&self.values(metric))
    }

    /// Per-sample slope of a metric's series.
    #[must_use]
    pub fn slope(&self, metric: StatMetric) -> Option<f64> {
        linear_slope(&self.values(metric))
    }
}

/// Per-player statistical profile.
#[derive(Clone, Debug)]
pub struct PlayerStatisticalProfile {
    player_id: PlayerId,
    created_ms: u64,
    last_activity_ms: u64,
    baseline: Option<PlayerStatistics>,
    history: BoundedWindow<PlayerStatistics>,
    significant: BoundedWindow<PlayerStatistics>,
    trends: MetricTrends,
    anomaly_level: f64,
    violation_count: u64,
}

impl PlayerStatisticalProfile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new(player_id: PlayerId, config: &StatProfileConfig, now_ms: u64) -> Self {
        Self {
            player_id,
            created_ms: now_ms,
            last_activity_ms: now_ms,
            baseline: None,
            history: BoundedWindow::new(config.history_size),
            significant: BoundedWindow::new(config.significant_history),
            trends: MetricTrends::new(config.trend_history),
            anomaly_level: 0.0,
            violation_count: 0,
        }
    }

    /// Records a snapshot. The first one becomes the fixed baseline.
    pub fn add_statistics(&mut self, stats: &PlayerStatistics) {
        if self.baseline.is_none() {
            self.baseline = Some(stats.clone());
        }
        if stats.is_significant() {
            self.significant.push(stats.clone());
        }
        self.trends.record(stats);
        self.history.push(stats.clone());
    }

    /// Folds one evaluation's violations into the anomaly level.
    pub fn update_anomaly(&mut self, violations: &[StatisticalViolation], config: &StatProfileConfig) {
        let weight: f64 = violations.iter().map(|v| v.confidence * v.severity).sum();
        self.anomaly_level =
            clamp01(self.anomaly_level * config.anomaly_decay + config.anomaly_growth * weight);
    }

    /// Counts violations raised against this player.
    pub fn record_violations(&mut self, count: usize) {
        self.violation_count += count as u64;
    }

    /// Marks the profile as used at `now_ms` (wall clock).
    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }

    /// Mean of a metric over the significant snapshots.
    #[must_use]
    pub fn significant_mean(&self, metric: StatMetric) -> Option<f64> {
        let values: Vec<f64> = self.significant.iter().map(|s| s.metric(metric)).collect();
        mean(&values)
    }

    /// Player this profile describes.
    #[must_use]
    pub const fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Creation time (wall clock, ms).
    #[must_use]
    pub const fn created_ms(&self) -> u64 {
        self.created_ms
    }

    /// Last time the profile was used (wall clock, ms).
    #[must_use]
    pub const fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    /// First snapshot ever seen.
    #[must_use]
    pub fn baseline(&self) -> Option<&PlayerStatistics> {
        self.baseline.as_ref()
    }

    /// Recent snapshots, oldest first.
    #[must_use]
    pub fn history(&self) -> &BoundedWindow<PlayerStatistics> {
        &self.history
    }

    /// Recent significant snapshots, oldest first.
    #[must_use]
    pub fn significant(&self) -> &BoundedWindow<PlayerStatistics> {
        &self.significant
    }

    /// Per-metric series.
    #[must_use]
    pub fn trends(&self) -> &MetricTrends {
        &self.trends
    }

    /// Anomaly level in [0, 1].
    #[must_use]
    pub const fn anomaly_level(&self) -> f64 {
        self.anomaly_level
    }

    /// Violations raised so far.
    #[must_use]
    pub const fn violation_count(&self) -> u64 {
        self.violation_count
    }

    /// Snapshots seen (bounded by history capacity).
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::StatisticalViolationType;

    fn snapshot(ts: u64, accuracy: f64, significance: f64) -> PlayerStatistics {
        PlayerStatistics {
            average_accuracy: accuracy,
            statistical_significance: significance,
            ..PlayerStatistics::new(1, ts)
        }
    }

    #[test]
    fn test_baseline_is_first_snapshot() {
        let cfg = StatProfileConfig::default();
        let mut profile = PlayerStatisticalProfile::new(1, &cfg, 0);
        profile.add_statistics(&snapshot(0, 0.2, 1.0));
        profile.add_statistics(&snapshot(1, 0.9, 1.0));
        assert_eq!(profile.baseline().map(|b| b.average_accuracy), Some(0.2));
        assert_eq!(profile.sample_count(), 2);
    }

    #[test]
    fn test_only_significant_snapshots_are_kept_apart() {
        let cfg = StatProfileConfig::default();
        let mut profile = PlayerStatisticalProfile::new(1, &cfg, 0);
        profile.add_statistics(&snapshot(0, 0.3, 0.1));
        profile.add_statistics(&snapshot(1, 0.5, 0.9));
        assert_eq!(profile.significant().len(), 1);
        assert_eq!(profile.significant_mean(StatMetric::Accuracy), Some(0.5));
    }

    #[test]
    fn test_histories_are_bounded() {
        let cfg = StatProfileConfig::default();
        let mut profile = PlayerStatisticalProfile::new(1, &cfg, 0);
        for i in 0..500 {
            profile.add_statistics(&snapshot(i, 0.3, 1.0));
        }
        assert_eq!(profile.history().len(), cfg.history_size);
        assert_eq!(profile.significant().len(), cfg.significant_history);
        assert_eq!(profile.trends().values(StatMetric::Accuracy).len(), cfg.trend_history);
    }

    #[test]
    fn test_anomaly_never_rises_without_violations() {
        let cfg = StatProfileConfig::default();
        let mut profile = PlayerStatisticalProfile::new(1, &cfg, 0);
        let v = StatisticalViolation::new(StatisticalViolationType::ImpossibleKdr, "t", 1.0, "x", 0);
        profile.update_anomaly(&[v.clone(), v.clone(), v], &cfg);
        let mut last = profile.anomaly_level();
        assert!(last > 0.5);
        for _ in 0..50 {
            profile.update_anomaly(&[], &cfg);
            assert!(profile.anomaly_level() <= last);
            last = profile.anomaly_level();
        }
        assert!(last < 0.1);
    }

    #[test]
    fn test_trend_slope() {
        let mut trends = MetricTrends::new(10);
        for i in 0..5 {
            trends.record(&snapshot(i, 0.1 * i as f64, 1.0));
        }
        let slope = trends.slope(StatMetric::Accuracy).unwrap_or_default();
        assert!((slope - 0.1).abs() < 1e-9);
    }
}
