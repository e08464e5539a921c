//! # Evidence Types
//!
//! Immutable records produced by detectors ([`CheatDetection`]) and
//! analyzers ([`StatisticalViolation`]). Confidence, severity and risk are
//! always within [0, 1].
//!
//! ```text
//! severity   = type weight × confidence          (real-time)
//! confidence = severity × type reliability       (statistical)
//! risk       = 0.6 · severity + 0.4 · confidence (both)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vigil_shared::series::clamp01;
use vigil_shared::{MetaValue, Metadata};

/// Confidence assigned to `SYSTEM_ERROR` evidence.
pub const SYSTEM_ERROR_CONFIDENCE: f64 = 0.1;

/// Weighted blend of severity and confidence.
#[must_use]
pub fn risk_score(severity: f64, confidence: f64) -> f64 {
    clamp01(0.6 * severity + 0.4 * confidence)
}

/// Anything that can feed a verdict.
pub trait Scored {
    /// Confidence in [0, 1].
    fn confidence(&self) -> f64;
    /// Severity in [0, 1].
    fn severity(&self) -> f64;
    /// Risk in [0, 1].
    fn risk_score(&self) -> f64 {
        risk_score(self.severity(), self.confidence())
    }
}

/// Five-bucket quantization of a risk score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// [0, 0.2)
    Minimal,
    /// [0.2, 0.4)
    Low,
    /// [0.4, 0.6)
    Medium,
    /// [0.6, 0.8)
    High,
    /// [0.8, 1]
    Critical,
}

impl Priority {
    /// Buckets a risk score.
    #[must_use]
    pub fn from_risk(risk: f64) -> Self {
        match clamp01(risk) {
            r if r >= 0.8 => Self::Critical,
            r if r >= 0.6 => Self::High,
            r if r >= 0.4 => Self::Medium,
            r if r >= 0.2 => Self::Low,
            _ => Self::Minimal,
        }
    }
}

// ============================================================================
// REAL-TIME EVIDENCE
// ============================================================================

/// Cheat categories flagged by the real-time detectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// Aim assistance.
    Aimbot,
    /// Awareness of enemies through geometry.
    EspWallhack,
    /// Movement speed manipulation.
    SpeedHack,
    /// Automated triggering.
    TriggerBot,
    /// Recoil compensation.
    NoRecoil,
    /// Internal failure while evaluating.
    SystemError,
}

impl ViolationType {
    /// Multiplier turning confidence into severity.
    #[must_use]
    pub const fn severity_weight(self) -> f64 {
        match self {
            Self::Aimbot => 1.0,
            Self::SpeedHack | Self::TriggerBot => 0.9,
            Self::EspWallhack => 0.85,
            Self::NoRecoil => 0.8,
            Self::SystemError => 0.1,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aimbot => "AIMBOT",
            Self::EspWallhack => "ESP_WALLHACK",
            Self::SpeedHack => "SPEED_HACK",
            Self::TriggerBot => "TRIGGER_BOT",
            Self::NoRecoil => "NO_RECOIL",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One real-time finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheatDetection {
    /// Category.
    pub violation_type: ViolationType,
    /// Human-readable summary.
    pub description: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Severity in [0, 1] (type weight × confidence).
    pub severity: f64,
    /// Detector that produced it.
    pub detector_name: String,
    /// Detection time (ms).
    pub timestamp_ms: u64,
    /// Supporting measurement text.
    pub evidence: Option<String>,
    /// Supporting values.
    pub metadata: Metadata,
    /// Confirmed by a later stage or a moderator.
    pub confirmed: bool,
}

impl CheatDetection {
    /// Creates a detection. Confidence is clamped and severity derived.
    #[must_use]
    pub fn new(
        violation_type: ViolationType,
        detector_name: &str,
        confidence: f64,
        description: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        let confidence = clamp01(confidence);
        Self {
            violation_type,
            description: description.into(),
            confidence,
            severity: clamp01(violation_type.severity_weight() * confidence),
            detector_name: detector_name.to_string(),
            timestamp_ms,
            evidence: None,
            metadata: Metadata::new(),
            confirmed: false,
        }
    }

    /// Low-confidence marker for a caught internal failure.
    #[must_use]
    pub fn system_error(source: &str, message: impl Into<String>, timestamp_ms: u64) -> Self {
        Self::new(
            ViolationType::SystemError,
            source,
            SYSTEM_ERROR_CONFIDENCE,
            message,
            timestamp_ms,
        )
    }

    /// Builder: attaches evidence text.
    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Builder: attaches a metadata value.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Risk in [0, 1].
    #[must_use]
    pub fn risk_score(&self) -> f64 {
        risk_score(self.severity, self.confidence)
    }

    /// Priority bucket.
    #[must_use]
    pub fn priority(&self) -> Priority {
        Priority::from_risk(self.risk_score())
    }

    /// Marks the detection confirmed.
    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Flat key-value form for telemetry and hand-off.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert("violation_type".into(), json!(self.violation_type.as_str()));
        map.insert("description".into(), json!(self.description));
        map.insert("confidence".into(), json!(self.confidence));
        map.insert("severity".into(), json!(self.severity));
        map.insert("risk_score".into(), json!(self.risk_score()));
        map.insert("priority".into(), json!(self.priority()));
        map.insert("detector".into(), json!(self.detector_name));
        map.insert("timestamp".into(), json!(self.timestamp_ms));
        map.insert("evidence".into(), json!(self.evidence));
        map.insert(
            "metadata".into(),
            serde_json::to_value(&self.metadata).unwrap_or_default(),
        );
        map.insert("confirmed".into(), json!(self.confirmed));
        map
    }
}

impl Scored for CheatDetection {
    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn severity(&self) -> f64 {
        self.severity
    }
}

// ============================================================================
// STATISTICAL EVIDENCE
// ============================================================================

/// Anomaly categories flagged by the statistical analyzers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatisticalViolationType {
    /// Accuracy beyond human reach.
    ImpossibleAccuracy,
    /// Accuracy well above the norm.
    SuspiciousAccuracy,
    /// Accuracy too steady across snapshots.
    LowAccuracyVariance,
    /// Sudden accuracy jump.
    AccuracySpike,
    /// High accuracy together with high damage per shot.
    AccuracyDamageCorrelation,
    /// Headshot rate beyond human reach.
    ImpossibleHeadshotRate,
    /// Headshot rate well above the norm.
    SuspiciousHeadshotRate,
    /// Headshot rate too steady.
    LowHeadshotVariance,
    /// Sudden headshot-rate jump.
    HeadshotSpike,
    /// Bursty on/off headshot pattern.
    HeadshotStreakiness,
    /// High headshot rate at long range.
    LongRangeHeadshots,
    /// KDR beyond human reach.
    ImpossibleKdr,
    /// KDR well above the norm.
    SuspiciousKdr,
    /// Damage output beyond human reach.
    ImpossibleDps,
    /// Damage output well above the norm.
    SuspiciousDps,
    /// Performance too steady.
    ConsistentPerformance,
    /// Sudden performance jump.
    RapidImprovement,
    /// Accuracy and KDR decoupled while KDR is high.
    StatCorrelationAnomaly,
    /// Several metrics simultaneously out of range.
    MultiMetricOutlier,
    /// Composite consistency too high.
    SuspiciousConsistency,
    /// Repeating pattern in accuracy.
    PeriodicPattern,
    /// Accuracy distribution too narrow.
    LowEntropy,
    /// Most core metrics simultaneously too steady.
    MultiMetricConsistency,
    /// Several metrics beyond 3σ of the population.
    StatisticalOutlier,
    /// A metric beyond 4σ of the population.
    ExtremeOutlier,
    /// Combined z-score beyond threshold.
    CompositeOutlier,
    /// Outlier in most recent snapshots.
    ConsistentOutlier,
    /// Profile anomaly level above threshold.
    AnomalyLevel,
    /// Several superhuman indicators at once.
    SuperhumanPerformance,
    /// Internal failure while evaluating.
    SystemError,
}

impl StatisticalViolationType {
    /// How far this kind of signal can be trusted, in [0, 1].
    #[must_use]
    pub const fn reliability(self) -> f64 {
        match self {
            Self::ImpossibleAccuracy
            | Self::ImpossibleHeadshotRate
            | Self::ImpossibleKdr
            | Self::ImpossibleDps
            | Self::SuperhumanPerformance => 1.0,
            Self::ExtremeOutlier | Self::ConsistentOutlier | Self::MultiMetricConsistency => 0.9,
            Self::SuspiciousAccuracy
            | Self::SuspiciousHeadshotRate
            | Self::SuspiciousKdr
            | Self::SuspiciousDps
            | Self::StatisticalOutlier
            | Self::CompositeOutlier
            | Self::MultiMetricOutlier
            | Self::AnomalyLevel => 0.8,
            Self::AccuracyDamageCorrelation
            | Self::LongRangeHeadshots
            | Self::SuspiciousConsistency
            | Self::ConsistentPerformance
            | Self::LowAccuracyVariance
            | Self::LowHeadshotVariance => 0.75,
            Self::AccuracySpike
            | Self::HeadshotSpike
            | Self::RapidImprovement
            | Self::HeadshotStreakiness
            | Self::PeriodicPattern
            | Self::LowEntropy
            | Self::StatCorrelationAnomaly => 0.6,
            Self::SystemError => 0.1,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImpossibleAccuracy => "IMPOSSIBLE_ACCURACY",
            Self::SuspiciousAccuracy => "SUSPICIOUS_ACCURACY",
            Self::LowAccuracyVariance => "LOW_ACCURACY_VARIANCE",
            Self::AccuracySpike => "ACCURACY_SPIKE",
            Self::AccuracyDamageCorrelation => "ACCURACY_DAMAGE_CORRELATION",
            Self::ImpossibleHeadshotRate => "IMPOSSIBLE_HEADSHOT_RATE",
            Self::SuspiciousHeadshotRate => "SUSPICIOUS_HEADSHOT_RATE",
            Self::LowHeadshotVariance => "LOW_HEADSHOT_VARIANCE",
            Self::HeadshotSpike => "HEADSHOT_SPIKE",
            Self::HeadshotStreakiness => "HEADSHOT_STREAKINESS",
            Self::LongRangeHeadshots => "LONG_RANGE_HEADSHOTS",
            Self::ImpossibleKdr => "IMPOSSIBLE_KDR",
            Self::SuspiciousKdr => "SUSPICIOUS_KDR",
            Self::ImpossibleDps => "IMPOSSIBLE_DPS",
            Self::SuspiciousDps => "SUSPICIOUS_DPS",
            Self::ConsistentPerformance => "CONSISTENT_PERFORMANCE",
            Self::RapidImprovement => "RAPID_IMPROVEMENT",
            Self::StatCorrelationAnomaly => "STAT_CORRELATION_ANOMALY",
            Self::MultiMetricOutlier => "MULTI_METRIC_OUTLIER",
            Self::SuspiciousConsistency => "SUSPICIOUS_CONSISTENCY",
            Self::PeriodicPattern => "PERIODIC_PATTERN",
            Self::LowEntropy => "LOW_ENTROPY",
            Self::MultiMetricConsistency => "MULTI_METRIC_CONSISTENCY",
            Self::StatisticalOutlier => "STATISTICAL_OUTLIER",
            Self::ExtremeOutlier => "EXTREME_OUTLIER",
            Self::CompositeOutlier => "COMPOSITE_OUTLIER",
            Self::ConsistentOutlier => "CONSISTENT_OUTLIER",
            Self::AnomalyLevel => "ANOMALY_LEVEL",
            Self::SuperhumanPerformance => "SUPERHUMAN_PERFORMANCE",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl std::fmt::Display for StatisticalViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One statistical finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatisticalViolation {
    /// Category.
    pub violation_type: StatisticalViolationType,
    /// Human-readable summary.
    pub description: String,
    /// Severity in [0, 1].
    pub severity: f64,
    /// Confidence in [0, 1], seeded from severity × reliability.
    pub confidence: f64,
    /// Analyzer that produced it.
    pub analyzer_name: String,
    /// Detection time (ms).
    pub timestamp_ms: u64,
    /// Measured value that tripped the check.
    pub metric_value: Option<f64>,
    /// Threshold it was compared against.
    pub threshold: Option<f64>,
    /// Supporting values.
    pub metadata: Metadata,
    /// Confirmed by a later stage or a moderator.
    pub confirmed: bool,
}

impl StatisticalViolation {
    /// Creates a violation. Severity is clamped and confidence derived.
    #[must_use]
    pub fn new(
        violation_type: StatisticalViolationType,
        analyzer_name: &str,
        severity: f64,
        description: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        let severity = clamp01(severity);
        Self {
            violation_type,
            description: description.into(),
            severity,
            confidence: clamp01(severity * violation_type.reliability()),
            analyzer_name: analyzer_name.to_string(),
            timestamp_ms,
            metric_value: None,
            threshold: None,
            metadata: Metadata::new(),
            confirmed: false,
        }
    }

    /// Low-confidence marker for a caught internal failure.
    #[must_use]
    pub fn system_error(source: &str, message: impl Into<String>, timestamp_ms: u64) -> Self {
        let mut violation = Self::new(
            StatisticalViolationType::SystemError,
            source,
            SYSTEM_ERROR_CONFIDENCE,
            message,
            timestamp_ms,
        );
        violation.confidence = SYSTEM_ERROR_CONFIDENCE;
        violation
    }

    /// Builder: records the measured value and the threshold it crossed.
    #[must_use]
    pub fn with_values(mut self, metric_value: f64, threshold: f64) -> Self {
        self.metric_value = Some(metric_value);
        self.threshold = Some(threshold);
        self
    }

    /// Builder: attaches a metadata value.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Marks the violation confirmed and revises its confidence.
    pub fn confirm(&mut self, confidence: f64) {
        self.confidence = clamp01(confidence);
        self.confirmed = true;
    }

    /// Risk in [0, 1].
    #[must_use]
    pub fn risk_score(&self) -> f64 {
        risk_score(self.severity, self.confidence)
    }

    /// Priority bucket.
    #[must_use]
    pub fn priority(&self) -> Priority {
        Priority::from_risk(self.risk_score())
    }

    /// Flat key-value form for telemetry and hand-off.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        map.insert("violation_type".into(), json!(self.violation_type.as_str()));
        map.insert("description".into(), json!(self.description));
        map.insert("severity".into(), json!(self.severity));
        map.insert("confidence".into(), json!(self.confidence));
        map.insert("risk_score".into(), json!(self.risk_score()));
        map.insert("priority".into(), json!(self.priority()));
        map.insert("analyzer".into(), json!(self.analyzer_name));
        map.insert("timestamp".into(), json!(self.timestamp_ms));
        map.insert("metric_value".into(), json!(self.metric_value));
        map.insert("threshold".into(), json!(self.threshold));
        map.insert(
            "metadata".into(),
            serde_json::to_value(&self.metadata).unwrap_or_default(),
        );
        map.insert("confirmed".into(), json!(self.confirmed));
        map
    }
}

impl Scored for StatisticalViolation {
    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn severity(&self) -> f64 {
        self.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_scores_are_clamped() {
        for raw in [-3.0, 0.0, 0.42, 1.0, 7.5, f64::NAN] {
            let d = CheatDetection::new(ViolationType::Aimbot, "test", raw, "x", 0);
            assert!((0.0..=1.0).contains(&d.confidence));
            assert!((0.0..=1.0).contains(&d.severity));
            assert!((0.0..=1.0).contains(&d.risk_score()));
        }
    }

    #[test]
    fn test_severity_follows_type_weight() {
        let d = CheatDetection::new(ViolationType::NoRecoil, "test", 0.5, "x", 0);
        assert!((d.severity - 0.4).abs() < 1e-9);
        assert!((d.risk_score() - (0.6 * 0.4 + 0.4 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_priority_buckets() {
        assert_eq!(Priority::from_risk(0.0), Priority::Minimal);
        assert_eq!(Priority::from_risk(0.2), Priority::Low);
        assert_eq!(Priority::from_risk(0.59), Priority::Medium);
        assert_eq!(Priority::from_risk(0.6), Priority::High);
        assert_eq!(Priority::from_risk(0.95), Priority::Critical);
    }

    #[test]
    fn test_violation_confidence_seeded_from_reliability() {
        let v = StatisticalViolation::new(
            StatisticalViolationType::AccuracySpike,
            "test",
            0.5,
            "x",
            0,
        );
        assert!((v.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_confirm_revises_confidence() {
        let mut v = StatisticalViolation::new(
            StatisticalViolationType::LowEntropy,
            "test",
            0.5,
            "x",
            0,
        );
        v.confirm(1.4);
        assert!(v.confirmed);
        assert!((v.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_to_map_uses_wire_names() {
        let d = CheatDetection::new(ViolationType::SpeedHack, "SpeedHackDetector", 0.8, "fast", 10)
            .with_evidence("Teleportation")
            .with_meta("speed", 30.0);
        let map = d.to_map();
        assert_eq!(map["violation_type"], json!("SPEED_HACK"));
        assert_eq!(map["evidence"], json!("Teleportation"));
        assert_eq!(map["metadata"]["speed"], json!(30.0));
    }
}
