//! # Verdicts
//!
//! Ephemeral results built from one evaluation's evidence list. Both
//! pipelines share the same ladder:
//!
//! ```text
//! action required  = any critical item (severity ≥ 0.8 ∧ confidence ≥ 0.8)
//!                  ∨ ≥ 2 actionable items (confidence ≥ 0.7)
//!                  ∨ aggregate risk ≥ 0.8
//!
//! max item risk ≥ 0.9 → IMMEDIATE_BAN
//!               ≥ 0.8 → TEMPORARY_BAN
//!               ≥ 0.6 → WARNING
//!               else  → INCREASED_MONITORING
//! no evidence         → MONITOR
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vigil_shared::series::clamp01;
use vigil_shared::PlayerId;

use crate::evidence::{CheatDetection, Scored, StatisticalViolation};

/// Severity and confidence an item needs to be critical.
pub const CRITICAL_THRESHOLD: f64 = 0.8;
/// Confidence an item needs to be actionable.
pub const ACTIONABLE_CONFIDENCE: f64 = 0.7;
/// Actionable items that require action on their own.
pub const ACTIONABLE_COUNT: usize = 2;
/// Aggregate risk that requires action on its own.
pub const AGGREGATE_RISK_THRESHOLD: f64 = 0.8;

/// Enforcement recommendation handed to the moderation system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    /// No evidence: keep the default watch.
    Monitor,
    /// Weak evidence: sample the player more closely.
    IncreasedMonitoring,
    /// Moderate evidence.
    Warning,
    /// Strong evidence.
    TemporaryBan,
    /// Overwhelming evidence.
    ImmediateBan,
}

impl RecommendedAction {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monitor => "MONITOR",
            Self::IncreasedMonitoring => "INCREASED_MONITORING",
            Self::Warning => "WARNING",
            Self::TemporaryBan => "TEMPORARY_BAN",
            Self::ImmediateBan => "IMMEDIATE_BAN",
        }
    }
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated view over an evidence list.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Whether the verdict demands action.
    pub action_required: bool,
    /// Recommended enforcement.
    pub recommended_action: RecommendedAction,
    /// Severity-weighted mean confidence.
    pub aggregate_confidence: f64,
    /// 0.7 · max risk + 0.3 · mean risk.
    pub aggregate_risk: f64,
    /// Highest single-item risk.
    pub max_risk: f64,
}

impl Assessment {
    /// Assessment of an empty evidence list.
    pub const EMPTY: Self = Self {
        action_required: false,
        recommended_action: RecommendedAction::Monitor,
        aggregate_confidence: 0.0,
        aggregate_risk: 0.0,
        max_risk: 0.0,
    };
}

/// Runs the shared verdict ladder.
#[must_use]
pub fn assess<E: Scored>(items: &[E]) -> Assessment {
    if items.is_empty() {
        return Assessment::EMPTY;
    }

    let risks: Vec<f64> = items.iter().map(Scored::risk_score).collect();
    let max_risk = risks.iter().copied().fold(0.0, f64::max);
    let mean_risk = risks.iter().sum::<f64>() / risks.len() as f64;
    let aggregate_risk = clamp01(0.7 * max_risk + 0.3 * mean_risk);

    let severity_sum: f64 = items.iter().map(Scored::severity).sum();
    let aggregate_confidence = if severity_sum > f64::EPSILON {
        items
            .iter()
            .map(|item| item.confidence() * item.severity())
            .sum::<f64>()
            / severity_sum
    } else {
        items.iter().map(Scored::confidence).sum::<f64>() / items.len() as f64
    };

    let critical = items.iter().any(|item| {
        item.severity() >= CRITICAL_THRESHOLD && item.confidence() >= CRITICAL_THRESHOLD
    });
    let actionable = items
        .iter()
        .filter(|item| item.confidence() >= ACTIONABLE_CONFIDENCE)
        .count();
    let action_required =
        critical || actionable >= ACTIONABLE_COUNT || aggregate_risk >= AGGREGATE_RISK_THRESHOLD;

    let recommended_action = match max_risk {
        r if r >= 0.9 => RecommendedAction::ImmediateBan,
        r if r >= 0.8 => RecommendedAction::TemporaryBan,
        r if r >= 0.6 => RecommendedAction::Warning,
        _ => RecommendedAction::IncreasedMonitoring,
    };

    Assessment {
        action_required,
        recommended_action,
        aggregate_confidence: clamp01(aggregate_confidence),
        aggregate_risk,
        max_risk,
    }
}

/// Outcome of evaluating one player action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealtimeDetectionResult {
    /// Evaluated player.
    pub player_id: PlayerId,
    /// Timestamp of the evaluated action (ms).
    pub timestamp_ms: u64,
    /// Detections, highest confidence first.
    pub detections: Vec<CheatDetection>,
    /// The player's suspicious score after this action.
    pub suspicious_score: f64,
    /// The player was not admitted (registry full under `Reject`).
    pub rejected: bool,
    /// Wall time spent evaluating (µs).
    pub processing_time_us: u64,
}

impl RealtimeDetectionResult {
    /// A result with no evidence.
    #[must_use]
    pub fn empty(player_id: PlayerId, timestamp_ms: u64) -> Self {
        Self {
            player_id,
            timestamp_ms,
            detections: Vec::new(),
            suspicious_score: 0.0,
            rejected: false,
            processing_time_us: 0,
        }
    }

    /// Aggregated view of the detections.
    #[must_use]
    pub fn assessment(&self) -> Assessment {
        assess(&self.detections)
    }

    /// Whether the verdict demands action.
    #[must_use]
    pub fn action_required(&self) -> bool {
        self.assessment().action_required
    }

    /// Recommended enforcement.
    #[must_use]
    pub fn recommended_action(&self) -> RecommendedAction {
        self.assessment().recommended_action
    }

    /// Returns true if nothing was detected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.detections.is_empty()
    }

    /// Highest-confidence detection.
    #[must_use]
    pub fn top_detection(&self) -> Option<&CheatDetection> {
        self.detections.first()
    }

    /// Flat key-value form for telemetry and hand-off.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let assessment = self.assessment();
        let mut map = BTreeMap::new();
        map.insert("player_id".into(), json!(self.player_id));
        map.insert("timestamp".into(), json!(self.timestamp_ms));
        map.insert("suspicious_score".into(), json!(self.suspicious_score));
        map.insert("detection_count".into(), json!(self.detections.len()));
        map.insert(
            "detections".into(),
            Value::Array(
                self.detections
                    .iter()
                    .map(|d| Value::Object(d.to_map().into_iter().collect()))
                    .collect(),
            ),
        );
        map.insert("action_required".into(), json!(assessment.action_required));
        map.insert(
            "recommended_action".into(),
            json!(assessment.recommended_action.as_str()),
        );
        map.insert(
            "aggregate_confidence".into(),
            json!(assessment.aggregate_confidence),
        );
        map.insert("aggregate_risk".into(), json!(assessment.aggregate_risk));
        map.insert("rejected".into(), json!(self.rejected));
        map.insert("processing_time_us".into(), json!(self.processing_time_us));
        map
    }
}

/// Outcome of analyzing one statistics snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatisticalAnalysisResult {
    /// Analyzed player.
    pub player_id: PlayerId,
    /// Timestamp of the analyzed snapshot (ms).
    pub timestamp_ms: u64,
    /// Violations, highest confidence first.
    pub violations: Vec<StatisticalViolation>,
    /// The profile's anomaly level after this snapshot.
    pub anomaly_level: f64,
    /// Snapshots recorded for this player so far.
    pub sample_count: usize,
    /// The player was not admitted (registry full under `Reject`).
    pub rejected: bool,
    /// Wall time spent evaluating (µs).
    pub processing_time_us: u64,
}

impl StatisticalAnalysisResult {
    /// A result with no evidence.
    #[must_use]
    pub fn empty(player_id: PlayerId, timestamp_ms: u64) -> Self {
        Self {
            player_id,
            timestamp_ms,
            violations: Vec::new(),
            anomaly_level: 0.0,
            sample_count: 0,
            rejected: false,
            processing_time_us: 0,
        }
    }

    /// Aggregated view of the violations.
    #[must_use]
    pub fn assessment(&self) -> Assessment {
        assess(&self.violations)
    }

    /// Whether the verdict demands action.
    #[must_use]
    pub fn action_required(&self) -> bool {
        self.assessment().action_required
    }

    /// Recommended enforcement.
    #[must_use]
    pub fn recommended_action(&self) -> RecommendedAction {
        self.assessment().recommended_action
    }

    /// Returns true if nothing was flagged.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Flat key-value form for telemetry and hand-off.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        let assessment = self.assessment();
        let mut map = BTreeMap::new();
        map.insert("player_id".into(), json!(self.player_id));
        map.insert("timestamp".into(), json!(self.timestamp_ms));
        map.insert("anomaly_level".into(), json!(self.anomaly_level));
        map.insert("sample_count".into(), json!(self.sample_count));
        map.insert("violation_count".into(), json!(self.violations.len()));
        map.insert(
            "violations".into(),
            Value::Array(
                self.violations
                    .iter()
                    .map(|v| Value::Object(v.to_map().into_iter().collect()))
                    .collect(),
            ),
        );
        map.insert("action_required".into(), json!(assessment.action_required));
        map.insert(
            "recommended_action".into(),
            json!(assessment.recommended_action.as_str()),
        );
        map.insert(
            "aggregate_confidence".into(),
            json!(assessment.aggregate_confidence),
        );
        map.insert("aggregate_risk".into(), json!(assessment.aggregate_risk));
        map.insert("rejected".into(), json!(self.rejected));
        map.insert("processing_time_us".into(), json!(self.processing_time_us));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{StatisticalViolationType, ViolationType};

    fn detection(confidence: f64) -> CheatDetection {
        CheatDetection::new(ViolationType::Aimbot, "test", confidence, "x", 0)
    }

    #[test]
    fn test_empty_is_monitor() {
        let result = RealtimeDetectionResult::empty(1, 0);
        assert!(!result.action_required());
        assert_eq!(result.recommended_action(), RecommendedAction::Monitor);
    }

    #[test]
    fn test_high_risk_is_immediate_ban() {
        let result = RealtimeDetectionResult {
            detections: vec![detection(0.95)],
            ..RealtimeDetectionResult::empty(1, 0)
        };
        assert!((result.detections[0].risk_score() - 0.95).abs() < 1e-9);
        assert!(result.action_required());
        assert_eq!(result.recommended_action(), RecommendedAction::ImmediateBan);
    }

    #[test]
    fn test_ladder_rungs() {
        let rung = |confidence: f64| assess(&[detection(confidence)]).recommended_action;
        assert_eq!(rung(0.85), RecommendedAction::TemporaryBan);
        assert_eq!(rung(0.65), RecommendedAction::Warning);
        assert_eq!(rung(0.3), RecommendedAction::IncreasedMonitoring);
    }

    #[test]
    fn test_two_actionable_items_require_action() {
        let a = assess(&[detection(0.72), detection(0.71)]);
        assert!(a.action_required);
        let b = assess(&[detection(0.72), detection(0.3)]);
        assert!(!b.action_required);
    }

    #[test]
    fn test_aggregate_confidence_is_severity_weighted() {
        let low = StatisticalViolation::new(
            StatisticalViolationType::ImpossibleAccuracy,
            "test",
            0.2,
            "x",
            0,
        );
        let high = StatisticalViolation::new(
            StatisticalViolationType::ImpossibleAccuracy,
            "test",
            0.8,
            "x",
            0,
        );
        let a = assess(&[low, high]);
        let expected = (0.2 * 0.2 + 0.8 * 0.8) / 1.0;
        assert!((a.aggregate_confidence - expected).abs() < 1e-9);
        assert!((a.aggregate_risk - (0.7 * 0.8 + 0.3 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_result_map_carries_verdict() {
        let result = StatisticalAnalysisResult::empty(9, 5);
        let map = result.to_map();
        assert_eq!(map["recommended_action"], json!("MONITOR"));
        assert_eq!(map["player_id"], json!(9));
    }
}
