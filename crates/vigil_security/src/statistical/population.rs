//! # Population Baseline
//!
//! Running mean and variance per metric across every analyzed player,
//! seeded with typical values so z-scores are meaningful from the first
//! snapshot.
//!
//! ```text
//! d     = clamp(x − mean, ±2 · std)
//! mean' = mean + α · d
//! var'  = (1 − α)(var + α · d²)
//! std   = max(√var', 0.1 · seeded std)
//! ```
//!
//! The clamp bounds how far one observation can move either moment, so a
//! single player resending the same snapshot cannot widen the baseline
//! around themselves.
//!
//! Every tracked metric is positive for a player who actually played, so
//! non-positive values are treated as unreported and skipped.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;
use vigil_shared::{PlayerStatistics, StatMetric};

/// Share of the seeded stddev the live stddev may never fall below.
const STD_FLOOR_FRACTION: f64 = 0.1;

/// Largest step, in stddevs, one observation may contribute.
pub const MAX_UPDATE_SIGMA: f64 = 2.0;

/// Running estimate for one metric.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MetricBaseline {
    /// Population mean.
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    /// Lower bound on the stddev.
    pub std_floor: f64,
    /// Samples folded in since seeding.
    pub samples: u64,
}

impl MetricBaseline {
    /// Seeds a baseline with a typical mean and stddev.
    #[must_use]
    pub fn seeded(mean: f64, std_dev: f64) -> Self {
        Self {
            mean,
            variance: std_dev * std_dev,
            std_floor: std_dev * STD_FLOOR_FRACTION,
            samples: 0,
        }
    }

    /// Standard deviation, never below the floor.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt().max(self.std_floor)
    }

    /// Standardized distance of `value` from the mean.
    #[must_use]
    pub fn z_score(&self, value: f64) -> f64 {
        let std = self.std_dev();
        if std <= f64::EPSILON {
            return 0.0;
        }
        (value - self.mean) / std
    }

    /// Folds in one observation, its distance from the mean clamped to
    /// [`MAX_UPDATE_SIGMA`] stddevs.
    pub fn update(&mut self, value: f64, alpha: f64) {
        let limit = MAX_UPDATE_SIGMA * self.std_dev();
        let diff = (value - self.mean).clamp(-limit, limit);
        self.mean += alpha * diff;
        self.variance = (1.0 - alpha) * (self.variance + alpha * diff * diff);
        self.samples += 1;
    }
}

/// The metrics tracked against the population, with their seeds.
pub const POPULATION_SEEDS: [(StatMetric, f64, f64); 6] = [
    (StatMetric::Accuracy, 0.25, 0.08),
    (StatMetric::HeadshotRate, 0.15, 0.07),
    (StatMetric::KillDeathRatio, 1.0, 0.5),
    (StatMetric::DamagePerShot, 25.0, 8.0),
    (StatMetric::ReactionTime, 250.0, 50.0),
    (StatMetric::KillsPerMinute, 0.8, 0.4),
];

/// Shared population baseline.
///
/// Readers take a shared lock; each update takes the write lock once for
/// all metrics of a snapshot.
#[derive(Debug)]
pub struct PopulationStatistics {
    baselines: RwLock<BTreeMap<StatMetric, MetricBaseline>>,
    alpha: f64,
}

impl PopulationStatistics {
    /// Creates a baseline seeded with typical values.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        let baselines = POPULATION_SEEDS
            .iter()
            .map(|&(metric, mean, std)| (metric, MetricBaseline::seeded(mean, std)))
            .collect();
        Self {
            baselines: RwLock::new(baselines),
            alpha,
        }
    }

    /// Metrics tracked, in seed order.
    pub fn metrics() -> impl Iterator<Item = StatMetric> {
        POPULATION_SEEDS.iter().map(|&(metric, _, _)| metric)
    }

    /// z-score of `value` for `metric`. `None` for untracked metrics or
    /// unreported values.
    #[must_use]
    pub fn z_score(&self, metric: StatMetric, value: f64) -> Option<f64> {
        if !reported(value) {
            return None;
        }
        self.baselines.read().get(&metric).map(|b| b.z_score(value))
    }

    /// z-scores of every tracked metric in a snapshot.
    #[must_use]
    pub fn z_scores(&self, stats: &PlayerStatistics) -> Vec<(StatMetric, f64)> {
        let baselines = self.baselines.read();
        baselines
            .iter()
            .filter_map(|(&metric, baseline)| {
                let value = stats.metric(metric);
                reported(value).then(|| (metric, baseline.z_score(value)))
            })
            .collect()
    }

    /// Folds a snapshot into the baseline.
    pub fn update(&self, stats: &PlayerStatistics) {
        let mut baselines = self.baselines.write();
        for (&metric, baseline) in baselines.iter_mut() {
            let value = stats.metric(metric);
            if reported(value) {
                baseline.update(value, self.alpha);
            }
        }
    }

    /// Copy of the current baseline.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<StatMetric, MetricBaseline> {
        self.baselines.read().clone()
    }
}

fn reported(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl Default for PopulationStatistics {
    fn default() -> Self {
        Self::new(0.01)
    }
}
