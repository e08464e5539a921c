//! # Outlier Analysis
//!
//! Compares each snapshot with the shared [`PopulationStatistics`].
//! z-scores are taken before the snapshot is folded into the baseline, and
//! a snapshot with any metric past `outlier_sigma` is never folded in.
//!
//! ```text
//! composite = 0.7 · max(|z| / 3) + 0.3 · mean(|z| / 3)
//! ```

use std::sync::Arc;

use vigil_shared::{BoundedWindow, PlayerStatistics, StatMetric};

use super::population::PopulationStatistics;
use super::profile::PlayerStatisticalProfile;
use super::StatisticalAnalyzer;
use crate::check::{collect_flagged, CheckOutcome};
use crate::config::OutlierConfig;
use crate::evidence::{StatisticalViolation, StatisticalViolationType};

/// Analyzer name carried on its violations.
pub const OUTLIER_ANALYZER: &str = "OutlierAnalyzer";

/// Private outlier history for one player.
#[derive(Clone, Debug)]
pub struct OutlierProfile {
    flags: BoundedWindow<bool>,
}

impl OutlierProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &OutlierConfig) -> Self {
        Self {
            flags: BoundedWindow::new(config.history_size),
        }
    }

    /// Share of recent snapshots that were outliers.
    #[must_use]
    pub fn outlier_fraction(&self) -> Option<f64> {
        if self.flags.is_empty() {
            return None;
        }
        let hits = self.flags.iter().filter(|&&f| f).count();
        Some(hits as f64 / self.flags.len() as f64)
    }

    /// Recent outlier flags, oldest first.
    #[must_use]
    pub fn flags(&self) -> &BoundedWindow<bool> {
        &self.flags
    }
}

/// Outlier analyzer.
pub struct OutlierAnalyzer {
    config: OutlierConfig,
    population: Arc<PopulationStatistics>,
}

impl OutlierAnalyzer {
    /// Creates an analyzer comparing against `population`.
    #[must_use]
    pub fn new(config: OutlierConfig, population: Arc<PopulationStatistics>) -> Self {
        Self { config, population }
    }

    /// The shared baseline.
    #[must_use]
    pub fn population(&self) -> &Arc<PopulationStatistics> {
        &self.population
    }

    fn check_multi(&self, ts: u64, outliers: &[(StatMetric, f64)]) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        CheckOutcome::flag_if(outliers.len() >= cfg.min_outlier_metrics, || {
            let peak = outliers.iter().map(|(_, z)| z.abs()).fold(0.0, f64::max);
            let names: Vec<&str> = outliers.iter().map(|(m, _)| m.name()).collect();
            let mut violation = StatisticalViolation::new(
                StatisticalViolationType::StatisticalOutlier,
                OUTLIER_ANALYZER,
                peak / (2.0 * cfg.outlier_sigma),
                format!("Beyond {}σ of the population: {}", cfg.outlier_sigma, names.join(", ")),
                ts,
            )
            .with_values(peak, cfg.outlier_sigma);
            for (metric, z) in outliers {
                violation = violation.with_meta(&format!("{metric}_z"), *z);
            }
            violation
        })
    }

    fn check_extreme(&self, ts: u64, zs: &[(StatMetric, f64)]) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        let Some(&(metric, z)) = zs.iter().max_by(|a, b| a.1.abs().total_cmp(&b.1.abs())) else {
            return CheckOutcome::NoSignal;
        };
        let magnitude = z.abs();
        CheckOutcome::flag_if(magnitude > cfg.extreme_sigma, || {
            StatisticalViolation::new(
                StatisticalViolationType::ExtremeOutlier,
                OUTLIER_ANALYZER,
                0.6 + 0.1 * (magnitude - cfg.extreme_sigma),
                format!("{metric} is {z:+.1}σ from the population"),
                ts,
            )
            .with_values(magnitude, cfg.extreme_sigma)
            .with_meta("metric", metric.name())
        })
    }

    fn check_composite(&self, ts: u64, zs: &[(StatMetric, f64)]) -> CheckOutcome<StatisticalViolation> {
        if zs.is_empty() {
            return CheckOutcome::NoSignal;
        }
        let cfg = &self.config;
        let scaled: Vec<f64> = zs.iter().map(|(_, z)| z.abs() / cfg.outlier_sigma).collect();
        let max = scaled.iter().copied().fold(0.0, f64::max);
        let mean = scaled.iter().sum::<f64>() / scaled.len() as f64;
        let composite = 0.7 * max + 0.3 * mean;
        CheckOutcome::flag_if(composite > cfg.composite_threshold, || {
            StatisticalViolation::new(
                StatisticalViolationType::CompositeOutlier,
                OUTLIER_ANALYZER,
                composite / (2.0 * cfg.composite_threshold),
                format!("Composite outlier score {composite:.2}"),
                ts,
            )
            .with_values(composite, cfg.composite_threshold)
        })
    }

    fn check_consistent(&self, ts: u64, state: &OutlierProfile) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        if state.flags.len() < cfg.consistent_min_samples {
            return CheckOutcome::NoSignal;
        }
        let Some(fraction) = state.outlier_fraction() else {
            return CheckOutcome::NoSignal;
        };
        CheckOutcome::flag_if(fraction >= cfg.consistent_fraction, || {
            StatisticalViolation::new(
                StatisticalViolationType::ConsistentOutlier,
                OUTLIER_ANALYZER,
                fraction,
                format!(
                    "Outlier in {:.0}% of the last {} snapshots",
                    fraction * 100.0,
                    state.flags.len()
                ),
                ts,
            )
            .with_values(fraction, cfg.consistent_fraction)
        })
    }
}

impl std::fmt::Debug for OutlierAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlierAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StatisticalAnalyzer for OutlierAnalyzer {
    type Profile = OutlierProfile;

    fn name(&self) -> &'static str {
        OUTLIER_ANALYZER
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> OutlierProfile {
        OutlierProfile::new(&self.config)
    }

    fn analyze(
        &self,
        stats: &PlayerStatistics,
        _profile: &PlayerStatisticalProfile,
        state: &mut OutlierProfile,
    ) -> Vec<StatisticalViolation> {
        let zs = self.population.z_scores(stats);
        if zs.is_empty() {
            return Vec::new();
        }

        let ts = stats.timestamp_ms;
        let outliers: Vec<(StatMetric, f64)> = zs
            .iter()
            .copied()
            .filter(|(_, z)| z.abs() > self.config.outlier_sigma)
            .collect();
        if outliers.is_empty() {
            self.population.update(stats);
        }
        state.flags.push(!outliers.is_empty());

        collect_flagged([
            self.check_multi(ts, &outliers),
            self.check_extreme(ts, &zs),
            self.check_composite(ts, &zs),
            self.check_consistent(ts, state),
        ])
    }
}
