//! Checks shared by the analyzers that watch a rate in [0, 1]
//! (accuracy and headshot rate).

use vigil_shared::series::{clamp01, mean, variance};
use vigil_shared::{BoundedWindow, Ema};

use crate::check::CheckOutcome;
use crate::evidence::{StatisticalViolation, StatisticalViolationType};

/// EMA plus bounded sample history for one rate.
#[derive(Clone, Debug)]
pub struct RateHistory {
    average: Ema,
    samples: BoundedWindow<f64>,
}

impl RateHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new(alpha: f64, capacity: usize) -> Self {
        Self {
            average: Ema::new(alpha),
            samples: BoundedWindow::new(capacity),
        }
    }

    /// Running average before the current sample is committed.
    #[must_use]
    pub const fn average(&self) -> Option<f64> {
        self.average.value()
    }

    /// Recent samples, oldest first.
    #[must_use]
    pub fn samples(&self) -> &BoundedWindow<f64> {
        &self.samples
    }

    pub(crate) fn push(&mut self, value: f64) {
        self.samples.push(value);
    }

    pub(crate) fn commit(&mut self, value: f64) {
        self.average.update(value);
    }
}

/// Names a rate check's output.
pub(crate) struct RateCheck {
    pub analyzer: &'static str,
    pub label: &'static str,
    pub timestamp_ms: u64,
}

impl RateCheck {
    fn violation(
        &self,
        kind: StatisticalViolationType,
        severity: f64,
        description: String,
    ) -> StatisticalViolation {
        StatisticalViolation::new(kind, self.analyzer, severity, description, self.timestamp_ms)
    }

    /// Impossible above `impossible`, else suspicious above `suspicious`.
    ///
    /// Impossible severity is the share of the remaining headroom used up;
    /// suspicious severity ramps 0.3 → 0.8 across the band.
    pub fn absolute(
        &self,
        value: f64,
        impossible: f64,
        suspicious: f64,
        kinds: (StatisticalViolationType, StatisticalViolationType),
    ) -> CheckOutcome<StatisticalViolation> {
        if value > impossible {
            let severity = (value - impossible) / (1.0 - impossible).max(f64::EPSILON);
            return CheckOutcome::Flagged(
                self.violation(
                    kinds.0,
                    severity,
                    format!("Impossible {} {value:.3}", self.label),
                )
                .with_values(value, impossible),
            );
        }
        CheckOutcome::flag_if(value > suspicious, || {
            let frac = (value - suspicious) / (impossible - suspicious).max(f64::EPSILON);
            self.violation(
                kinds.1,
                0.3 + 0.5 * clamp01(frac),
                format!("Suspicious {} {value:.3}", self.label),
            )
            .with_values(value, suspicious)
        })
    }

    /// Variance of the history below `threshold` while the mean is above
    /// `min_mean`.
    pub fn low_variance(
        &self,
        history: &RateHistory,
        min_samples: usize,
        min_mean: f64,
        threshold: f64,
        kind: StatisticalViolationType,
    ) -> CheckOutcome<StatisticalViolation> {
        if history.samples.len() < min_samples {
            return CheckOutcome::NoSignal;
        }
        let values = history.samples.to_vec();
        let (Some(avg), Some(var)) = (mean(&values), variance(&values)) else {
            return CheckOutcome::NoSignal;
        };
        CheckOutcome::flag_if(avg > min_mean && var < threshold, || {
            self.violation(
                kind,
                0.5 + 0.5 * (1.0 - var / threshold),
                format!("Unnaturally steady {} (variance {var:.6})", self.label),
            )
            .with_values(var, threshold)
            .with_meta("mean", avg)
            .with_meta("samples", values.len() as f64)
        })
    }

    /// Jump of more than `delta` over the running average, landing above
    /// `floor`.
    pub fn spike(
        &self,
        value: f64,
        history: &RateHistory,
        delta: f64,
        floor: f64,
        kind: StatisticalViolationType,
    ) -> CheckOutcome<StatisticalViolation> {
        let Some(previous) = history.average() else {
            return CheckOutcome::NoSignal;
        };
        let jump = value - previous;
        CheckOutcome::flag_if(jump > delta && value > floor, || {
            self.violation(
                kind,
                jump / (2.0 * delta),
                format!("Sudden {} jump from {previous:.3} to {value:.3}", self.label),
            )
            .with_values(jump, delta)
            .with_meta("previous_average", previous)
        })
    }
}
