//! # Performance Analysis
//!
//! Kill/death ratio and estimated damage output, how steady and how fast
//! they move, and whether they still track accuracy.
//!
//! ```text
//! estimated dps = damage/shot × shots/sec × accuracy
//! ```

use vigil_shared::series::{clamp01, coefficient_of_variation, mean, pearson};
use vigil_shared::{BoundedWindow, Ema, PlayerStatistics};

use super::profile::PlayerStatisticalProfile;
use super::StatisticalAnalyzer;
use crate::check::{collect_flagged, CheckOutcome};
use crate::config::PerformanceConfig;
use crate::evidence::{StatisticalViolation, StatisticalViolationType};

/// Analyzer name carried on its violations.
pub const PERFORMANCE_ANALYZER: &str = "PerformanceAnalyzer";

/// Private performance history for one player.
#[derive(Clone, Debug)]
pub struct PerformanceProfile {
    kdr_average: Ema,
    kdr: BoundedWindow<f64>,
    accuracy: BoundedWindow<f64>,
}

impl PerformanceProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &PerformanceConfig) -> Self {
        Self {
            kdr_average: Ema::new(config.alpha),
            kdr: BoundedWindow::new(config.history_size),
            accuracy: BoundedWindow::new(config.history_size),
        }
    }

    /// Running KDR average.
    #[must_use]
    pub const fn kdr_average(&self) -> Option<f64> {
        self.kdr_average.value()
    }

    /// Recent KDR samples, oldest first.
    #[must_use]
    pub fn kdr_samples(&self) -> &BoundedWindow<f64> {
        &self.kdr
    }
}

/// Performance analyzer.
#[derive(Clone, Debug, Default)]
pub struct PerformanceAnalyzer {
    config: PerformanceConfig,
}

impl PerformanceAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(config: PerformanceConfig) -> Self {
        Self { config }
    }

    fn banded(
        value: f64,
        impossible: f64,
        suspicious: f64,
        kinds: (StatisticalViolationType, StatisticalViolationType),
        label: &str,
        ts: u64,
    ) -> CheckOutcome<StatisticalViolation> {
        if value > impossible {
            let severity = 0.7 + 0.3 * clamp01((value - impossible) / impossible);
            return CheckOutcome::Flagged(
                StatisticalViolation::new(
                    kinds.0,
                    PERFORMANCE_ANALYZER,
                    severity,
                    format!("Impossible {label} {value:.2}"),
                    ts,
                )
                .with_values(value, impossible),
            );
        }
        CheckOutcome::flag_if(value > suspicious, || {
            let frac = clamp01((value - suspicious) / (impossible - suspicious));
            StatisticalViolation::new(
                kinds.1,
                PERFORMANCE_ANALYZER,
                0.3 + 0.5 * frac,
                format!("Suspicious {label} {value:.2}"),
                ts,
            )
            .with_values(value, suspicious)
        })
    }

    fn check_consistency(&self, ts: u64, state: &PerformanceProfile) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        if state.kdr.len() < cfg.consistency_min_samples {
            return CheckOutcome::NoSignal;
        }
        let values = state.kdr.to_vec();
        let (Some(cv), Some(avg)) = (coefficient_of_variation(&values), mean(&values)) else {
            return CheckOutcome::NoSignal;
        };
        CheckOutcome::flag_if(cv < cfg.consistency_cv && avg > cfg.consistency_min_kdr, || {
            StatisticalViolation::new(
                StatisticalViolationType::ConsistentPerformance,
                PERFORMANCE_ANALYZER,
                0.5 + 0.5 * (1.0 - cv / cfg.consistency_cv),
                format!("KDR {avg:.2} held with variation {cv:.3}"),
                ts,
            )
            .with_values(cv, cfg.consistency_cv)
            .with_meta("mean_kdr", avg)
        })
    }

    fn check_improvement(&self, kdr: f64, ts: u64, state: &PerformanceProfile) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        // `kdr` already pushed, so the previous sample count is len - 1.
        let Some(previous) = state.kdr_average.value() else {
            return CheckOutcome::NoSignal;
        };
        if state.kdr.len().saturating_sub(1) < cfg.improvement_min_samples
            || previous <= cfg.improvement_min_ema
        {
            return CheckOutcome::NoSignal;
        }
        let ratio = kdr / previous;
        CheckOutcome::flag_if(ratio > cfg.improvement_factor, || {
            StatisticalViolation::new(
                StatisticalViolationType::RapidImprovement,
                PERFORMANCE_ANALYZER,
                0.4 + 0.2 * (ratio - cfg.improvement_factor),
                format!("KDR jumped to {kdr:.2} from an average of {previous:.2}"),
                ts,
            )
            .with_values(ratio, cfg.improvement_factor)
        })
    }

    fn check_correlation(&self, kdr: f64, ts: u64, state: &PerformanceProfile) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        if state.kdr.len() < cfg.correlation_min_samples || state.accuracy.len() != state.kdr.len() {
            return CheckOutcome::NoSignal;
        }
        let Some(r) = pearson(&state.accuracy.to_vec(), &state.kdr.to_vec()) else {
            return CheckOutcome::NoSignal;
        };
        CheckOutcome::flag_if(r < cfg.correlation_floor && kdr > cfg.correlation_min_kdr, || {
            StatisticalViolation::new(
                StatisticalViolationType::StatCorrelationAnomaly,
                PERFORMANCE_ANALYZER,
                0.5 + 0.5 * clamp01((cfg.correlation_floor - r) / (1.0 + cfg.correlation_floor)),
                format!("KDR {kdr:.2} decoupled from accuracy (r = {r:.2})"),
                ts,
            )
            .with_values(r, cfg.correlation_floor)
        })
    }

    fn check_outliers(&self, stats: &PlayerStatistics) -> CheckOutcome<StatisticalViolation> {
        let cfg = &self.config;
        let indicators = [
            stats.kill_death_ratio > cfg.outlier_kdr,
            stats.average_accuracy > cfg.outlier_accuracy,
            stats.headshot_percentage > cfg.outlier_headshot,
        ];
        let count = indicators.iter().filter(|&&hit| hit).count();
        CheckOutcome::flag_if(count >= 2, || {
            StatisticalViolation::new(
                StatisticalViolationType::MultiMetricOutlier,
                PERFORMANCE_ANALYZER,
                count as f64 / indicators.len() as f64,
                format!("{count} of 3 performance metrics out of range"),
                stats.timestamp_ms,
            )
            .with_meta("kdr", stats.kill_death_ratio)
            .with_meta("accuracy", stats.average_accuracy)
            .with_meta("headshot_rate", stats.headshot_percentage)
        })
    }
}

impl StatisticalAnalyzer for PerformanceAnalyzer {
    type Profile = PerformanceProfile;

    fn name(&self) -> &'static str {
        PERFORMANCE_ANALYZER
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> PerformanceProfile {
        PerformanceProfile::new(&self.config)
    }

    fn analyze(
        &self,
        stats: &PlayerStatistics,
        _profile: &PlayerStatisticalProfile,
        state: &mut PerformanceProfile,
    ) -> Vec<StatisticalViolation> {
        let cfg = &self.config;
        let ts = stats.timestamp_ms;
        let kdr = stats.kill_death_ratio;
        let dps = stats.estimated_dps();

        let mut outcomes = Vec::with_capacity(6);
        if dps.is_finite() {
            outcomes.push(Self::banded(
                dps,
                cfg.impossible_dps,
                cfg.suspicious_dps,
                (
                    StatisticalViolationType::ImpossibleDps,
                    StatisticalViolationType::SuspiciousDps,
                ),
                "damage per second",
                ts,
            ));
        }
        outcomes.push(self.check_outliers(stats));

        if kdr.is_finite() {
            state.kdr.push(kdr);
            state.accuracy.push(stats.average_accuracy);
            outcomes.push(Self::banded(
                kdr,
                cfg.impossible_kdr,
                cfg.suspicious_kdr,
                (
                    StatisticalViolationType::ImpossibleKdr,
                    StatisticalViolationType::SuspiciousKdr,
                ),
                "KDR",
                ts,
            ));
            outcomes.push(self.check_consistency(ts, state));
            outcomes.push(self.check_improvement(kdr, ts, state));
            outcomes.push(self.check_correlation(kdr, ts, state));
            state.kdr_average.update(kdr);
        }
        collect_flagged(outcomes)
    }
}
