//! # Detection Scenario Tests
//!
//! End-to-end checks through the public orchestrators:
//!
//! 1. **Aim snap**: a 90° flick followed by a shot is an aimbot
//! 2. **Teleport**: 100 units in 40 ms is a speed hack
//! 3. **Impossible accuracy**: 97% accuracy scores severity 0.4
//! 4. **Clean player**: walking under the cap stays quiet
//! 5. **Eviction**: idle players leave after the TTL
//! 6. **Verdict ladder**: risk 0.95 means an immediate ban
//!
//! Run with: cargo test --test scenarios

use std::sync::Arc;

use vigil_security::realtime::Oracles;
use vigil_security::statistical::{AccuracyAnalyzer, PlayerStatisticalProfile, StatisticalAnalyzer};
use vigil_security::{
    CheatDetection, DetectionConfig, PopulationStatistics, RealtimeCheatDetector, RealtimeDetectionResult,
    RecommendedAction, StatisticalAnalysisEngine, StatisticalViolationType, ViolationType,
};
use vigil_shared::constants::DEFAULT_PROFILE_TTL_MS;
use vigil_shared::{ActionType, ManualClock, PlayerAction, PlayerId, PlayerStatistics, Vec3, ViewAngle};

fn realtime(clock: &ManualClock) -> RealtimeCheatDetector {
    RealtimeCheatDetector::with_components(&DetectionConfig::default(), Arc::new(clock.clone()), Oracles::default())
}

fn statistical(clock: &ManualClock) -> StatisticalAnalysisEngine {
    StatisticalAnalysisEngine::with_components(
        &DetectionConfig::default(),
        Arc::new(clock.clone()),
        Arc::new(PopulationStatistics::default()),
    )
}

fn movement(player: PlayerId, ts: u64, x: f64) -> PlayerAction {
    PlayerAction::new(player, ActionType::Move, ts, Vec3::new(x, 0.0, 0.0), ViewAngle::default())
}

// ============================================================================
// SCENARIO A: AIM SNAP
// ============================================================================

#[test]
fn verify_aim_snap_then_shot_is_aimbot() {
    let clock = ManualClock::new(0);
    let detector = realtime(&clock);

    detector.process_player_action(&PlayerAction::new(
        1,
        ActionType::Aim,
        1_000,
        Vec3::default(),
        ViewAngle::new(0.0, 0.0),
    ));
    detector.process_player_action(&PlayerAction::new(
        1,
        ActionType::Aim,
        1_010,
        Vec3::default(),
        ViewAngle::new(90.0, 0.0),
    ));
    let shot = PlayerAction::new(1, ActionType::Shoot, 1_040, Vec3::default(), ViewAngle::new(90.0, 0.0))
        .with_hit(true, true);
    let result = detector.process_player_action(&shot);

    let aimbot: Vec<_> = result
        .detections
        .iter()
        .filter(|d| d.violation_type == ViolationType::Aimbot)
        .collect();
    assert!(!aimbot.is_empty(), "no aimbot detection: {:?}", result.detections);
    assert!(aimbot.iter().all(|d| d.confidence > 0.5));
}

// ============================================================================
// SCENARIO B: TELEPORT
// ============================================================================

#[test]
fn verify_teleport_is_speed_hack() {
    let clock = ManualClock::new(0);
    let detector = realtime(&clock);

    detector.process_player_action(&movement(2, 1_000, 0.0));
    let result = detector.process_player_action(&movement(2, 1_040, 100.0));

    let teleport = result.detections.iter().find(|d| {
        d.violation_type == ViolationType::SpeedHack
            && d.evidence.as_deref().is_some_and(|e| e.contains("Teleportation"))
    });
    assert!(teleport.is_some(), "no teleport detection: {:?}", result.detections);
}

// ============================================================================
// SCENARIO C: IMPOSSIBLE ACCURACY
// ============================================================================

#[test]
fn verify_impossible_accuracy_severity() {
    let analyzer = AccuracyAnalyzer::default();
    let mut state = analyzer.new_profile();
    let stats = PlayerStatistics {
        average_accuracy: 0.97,
        ..PlayerStatistics::new(3, 0)
    };
    let profile = PlayerStatisticalProfile::new(3, &DetectionConfig::default().statistical.profile, 0);

    let found = analyzer.analyze(&stats, &profile, &mut state);
    let impossible = found
        .iter()
        .find(|v| v.violation_type == StatisticalViolationType::ImpossibleAccuracy);
    assert!(impossible.is_some_and(|v| (v.severity - 0.4).abs() < 1e-6));

    let engine = statistical(&ManualClock::new(0));
    let result = engine.analyze_player_statistics(3, &stats);
    assert!(result
        .violations
        .iter()
        .any(|v| v.violation_type == StatisticalViolationType::ImpossibleAccuracy));
}

// ============================================================================
// SCENARIO D: CLEAN PLAYER
// ============================================================================

#[test]
fn verify_clean_walker_stays_quiet() {
    let clock = ManualClock::new(0);
    let detector = realtime(&clock);

    for i in 0..50u64 {
        let result = detector.process_player_action(&movement(4, i * 100, i as f64 * 0.5));
        assert!(
            result.detections.iter().all(|d| d.violation_type != ViolationType::SpeedHack),
            "step {i}: {:?}",
            result.detections
        );
    }
    assert!(detector.suspicious_score(4).is_some_and(|score| score < 0.3));
}

// ============================================================================
// SCENARIO E: EVICTION
// ============================================================================

#[test]
fn verify_idle_profiles_are_evicted() {
    let clock = ManualClock::new(0);
    let detector = realtime(&clock);
    let engine = statistical(&clock);

    detector.process_player_action(&movement(5, 0, 0.0));
    engine.analyze_player_statistics(5, &PlayerStatistics::new(5, 0));
    assert!(detector.profile_snapshot(5).is_some());
    assert!(engine.profile_snapshot(5).is_some());

    clock.advance(DEFAULT_PROFILE_TTL_MS - 1);
    assert_eq!(detector.cleanup(), 0);

    clock.advance(2);
    assert_eq!(detector.cleanup(), 1);
    assert_eq!(engine.cleanup(), 1);
    assert!(detector.profile_snapshot(5).is_none());
    assert!(engine.profile_snapshot(5).is_none());
}

// ============================================================================
// SCENARIO F: VERDICT LADDER
// ============================================================================

#[test]
fn verify_high_risk_means_immediate_ban() {
    let detection = CheatDetection::new(ViolationType::Aimbot, "manual", 0.95, "flick", 0);
    assert!((detection.risk_score() - 0.95).abs() < 1e-9);

    let mut result = RealtimeDetectionResult::empty(6, 0);
    result.detections.push(detection);
    assert_eq!(result.recommended_action(), RecommendedAction::ImmediateBan);
    assert!(result.action_required());
}

#[test]
fn verify_empty_result_means_monitor() {
    let result = RealtimeDetectionResult::empty(7, 0);
    assert_eq!(result.recommended_action(), RecommendedAction::Monitor);
    assert!(!result.action_required());
    assert!(result.is_clean());
}
