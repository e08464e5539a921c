//! # Invariant Tests
//!
//! Randomized telemetry (seeded, so failures reproduce) checked against the
//! invariants every verdict must hold:
//!
//! 1. **Unit range**: confidence, severity and risk stay in [0, 1]
//! 2. **Bounded history**: windows never exceed their capacity
//! 3. **Anomaly decay**: no new violations never raises the anomaly level
//!
//! Run with: cargo test --test properties

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vigil_security::realtime::Oracles;
use vigil_security::statistical::PlayerStatisticalProfile;
use vigil_security::{DetectionConfig, PopulationStatistics, RealtimeCheatDetector, StatisticalAnalysisEngine};
use vigil_shared::constants::{META_LINE_OF_SIGHT, META_REACTION_TIME_MS, META_RECOIL_RESIDUAL, META_SPRINTING};
use vigil_shared::{ActionType, BoundedWindow, ManualClock, PlayerAction, PlayerStatistics, Vec3, ViewAngle};

const ACTION_TYPES: [ActionType; 4] = [ActionType::Move, ActionType::Aim, ActionType::Shoot, ActionType::Jump];

fn in_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn random_action(rng: &mut StdRng, player: u64, ts: u64) -> PlayerAction {
    let kind = ACTION_TYPES[rng.gen_range(0..ACTION_TYPES.len())];
    let position = Vec3::new(rng.gen_range(-50.0..50.0), 0.0, rng.gen_range(-50.0..50.0));
    let angle = ViewAngle::new(rng.gen_range(-180.0..180.0), rng.gen_range(-89.0..89.0));
    let mut action = PlayerAction::new(player, kind, ts, position, angle)
        .with_hit(rng.gen_bool(0.4), rng.gen_bool(0.2))
        .with_meta(META_SPRINTING, rng.gen_bool(0.3));
    if kind == ActionType::Shoot {
        action = action
            .with_meta(META_LINE_OF_SIGHT, rng.gen_bool(0.7))
            .with_meta(META_REACTION_TIME_MS, rng.gen_range(40.0..400.0))
            .with_meta(META_RECOIL_RESIDUAL, rng.gen_range(0.0..2.0));
    }
    action
}

fn random_statistics(rng: &mut StdRng, player: u64, ts: u64) -> PlayerStatistics {
    PlayerStatistics {
        average_accuracy: rng.gen_range(0.0..1.0),
        kill_death_ratio: rng.gen_range(0.0..30.0),
        headshot_percentage: rng.gen_range(0.0..1.0),
        damage_per_shot: rng.gen_range(0.0..120.0),
        shots_per_second: rng.gen_range(0.0..12.0),
        kills_per_minute: rng.gen_range(0.0..4.0),
        average_reaction_time_ms: rng.gen_range(50.0..500.0),
        average_kill_distance: rng.gen_range(0.0..150.0),
        win_rate: rng.gen_range(0.0..1.0),
        aim_precision: rng.gen_range(0.0..1.0),
        statistical_significance: rng.gen_range(0.0..1.0),
        ..PlayerStatistics::new(player, ts)
    }
}

// ============================================================================
// UNIT RANGE
// ============================================================================

#[test]
fn verify_realtime_scores_stay_in_unit_range() {
    let clock = ManualClock::new(0);
    let config = DetectionConfig::default();
    let detector = RealtimeCheatDetector::with_components(&config, Arc::new(clock.clone()), Oracles::default());
    let mut rng = StdRng::seed_from_u64(42);

    let mut ts = 0;
    for _ in 0..2_000 {
        let player = rng.gen_range(0..8);
        ts += rng.gen_range(1..40);
        clock.set(ts);
        let result = detector.process_player_action(&random_action(&mut rng, player, ts));
        assert!(result.detections.len() <= config.realtime.max_detections + 1);
        for detection in &result.detections {
            assert!(in_unit(detection.confidence), "{detection:?}");
            assert!(in_unit(detection.severity), "{detection:?}");
            assert!(in_unit(detection.risk_score()), "{detection:?}");
        }
        let assessment = result.assessment();
        assert!(in_unit(assessment.aggregate_confidence));
        assert!(in_unit(assessment.aggregate_risk));
    }

    for player in 0..8 {
        if let Some(profile) = detector.profile_snapshot(player) {
            assert!(in_unit(profile.suspicious_score()));
            assert!(profile.actions().len() <= config.realtime.profile.action_history);
            assert!(profile.aim_samples().len() <= config.realtime.profile.aim_history);
            assert!(profile.detections().len() <= config.realtime.profile.detection_history);
        }
    }
}

#[test]
fn verify_statistical_scores_stay_in_unit_range() {
    let clock = ManualClock::new(0);
    let config = DetectionConfig::default();
    let engine = StatisticalAnalysisEngine::with_components(
        &config,
        Arc::new(clock.clone()),
        Arc::new(PopulationStatistics::default()),
    );
    let mut rng = StdRng::seed_from_u64(9);

    for step in 0..600u64 {
        let player = rng.gen_range(0..4);
        let ts = step * 30_000;
        clock.set(ts);
        let result = engine.analyze_player_statistics(player, &random_statistics(&mut rng, player, ts));
        assert!(in_unit(result.anomaly_level));
        assert!(result.violations.len() <= config.statistical.max_violations + 1);
        for violation in &result.violations {
            assert!(in_unit(violation.confidence), "{violation:?}");
            assert!(in_unit(violation.severity), "{violation:?}");
            assert!(in_unit(violation.risk_score()), "{violation:?}");
        }
    }

    for player in 0..4 {
        if let Some(profile) = engine.profile_snapshot(player) {
            assert!(profile.history().len() <= config.statistical.profile.history_size);
            assert!(profile.significant().len() <= config.statistical.profile.significant_history);
        }
    }
}

// ============================================================================
// BOUNDED HISTORY
// ============================================================================

#[test]
fn verify_window_is_fifo_and_bounded() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..50 {
        let capacity = rng.gen_range(1..40);
        let pushes = rng.gen_range(0..200u32);
        let mut window = BoundedWindow::new(capacity);
        for value in 0..pushes {
            window.push(value);
            assert!(window.len() <= capacity);
        }
        let kept = window.to_vec();
        let expected: Vec<u32> = (pushes.saturating_sub(capacity as u32)..pushes).collect();
        assert_eq!(kept, expected);
    }
}

// ============================================================================
// ANOMALY DECAY
// ============================================================================

#[test]
fn verify_anomaly_never_rises_without_violations() {
    let clock = ManualClock::new(0);
    let config = DetectionConfig::default();
    let engine = StatisticalAnalysisEngine::with_components(
        &config,
        Arc::new(clock),
        Arc::new(PopulationStatistics::default()),
    );
    let mut rng = StdRng::seed_from_u64(21);
    for step in 0..5 {
        engine.analyze_player_statistics(1, &random_statistics(&mut rng, 1, step * 60_000));
    }
    let mut profile = engine
        .profile_snapshot(1)
        .unwrap_or_else(|| PlayerStatisticalProfile::new(1, &config.statistical.profile, 0));

    let mut previous = profile.anomaly_level();
    for _ in 0..100 {
        profile.update_anomaly(&[], &config.statistical.profile);
        let level = profile.anomaly_level();
        assert!(level <= previous);
        previous = level;
    }
}
