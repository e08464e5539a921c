//! # Realtime Player Profile
//!
//! The shared, per-player view of recent behavior. Detectors read its raw
//! samples; only the orchestrator writes it, through [`add_action`] and
//! [`add_detection`], while holding the player's shard lock.
//!
//! ## Suspicious score
//!
//! ```text
//! raw   = 0.30 · unhuman aiming
//!       + 0.20 · smoothness < low   |  0.15 · smoothness > high
//!       + 0.25 · headshot streak > threshold
//!       + 0.20 · last shot interval < floor
//!       + 0.20 · accuracy EMA > threshold
//!       + 0.30 · mean confidence of recent detections
//!       + 0.20 · violations / actions
//! score = 0.8 · score + 0.2 · clamp(raw)
//! ```
//!
//! Each action advances the score one step. Detections recorded for that
//! action redo the same step, so the score handed back with a result
//! already counts its own detections.
//!
//! [`add_action`]: PlayerRealtimeProfile::add_action
//! [`add_detection`]: PlayerRealtimeProfile::add_detection

use vigil_shared::constants::MILLIS_PER_SECOND;
use vigil_shared::series::{clamp01, mean};
use vigil_shared::{ActionType, BoundedWindow, Ema, PlayerAction, PlayerId, Vec3, ViewAngle};

use crate::config::RealtimeProfileConfig;
use crate::evidence::CheatDetection;

/// Shots needed before the accuracy trend counts toward the score.
const MIN_SHOTS_FOR_TREND: u64 = 10;

/// One aim observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimPoint {
    /// View angle.
    pub angle: ViewAngle,
    /// Action time (ms).
    pub timestamp_ms: u64,
}

/// Shared per-player behavior profile.
#[derive(Clone, Debug)]
pub struct PlayerRealtimeProfile {
    player_id: PlayerId,
    created_ms: u64,
    last_activity_ms: u64,
    last_action_ms: Option<u64>,

    actions: BoundedWindow<PlayerAction>,
    aim_samples: BoundedWindow<AimPoint>,
    detections: BoundedWindow<CheatDetection>,

    aim_smoothness: Option<f64>,
    mean_aim_delta: f64,
    peak_angular_speed: f64,
    unhuman_aiming: bool,

    movement_consistency: Ema,
    last_move: Option<(Vec3, u64)>,
    last_velocity: Option<Vec3>,

    accuracy_trend: Ema,
    consecutive_headshots: u32,
    last_shot_ms: Option<u64>,
    last_shot_interval_ms: Option<f64>,

    total_actions: u64,
    total_shots: u64,
    total_hits: u64,
    violation_count: u64,
    suspicious_score: f64,
    score_before_action: f64,
}

impl PlayerRealtimeProfile {
    /// Creates an empty profile.
    #[must_use]
    pub fn new(player_id: PlayerId, config: &RealtimeProfileConfig, now_ms: u64) -> Self {
        Self {
            player_id,
            created_ms: now_ms,
            last_activity_ms: now_ms,
            last_action_ms: None,
            actions: BoundedWindow::new(config.action_history),
            aim_samples: BoundedWindow::new(config.aim_history),
            detections: BoundedWindow::new(config.detection_history),
            aim_smoothness: None,
            mean_aim_delta: 0.0,
            peak_angular_speed: 0.0,
            unhuman_aiming: false,
            movement_consistency: Ema::new(config.movement_alpha),
            last_move: None,
            last_velocity: None,
            accuracy_trend: Ema::new(config.accuracy_alpha),
            consecutive_headshots: 0,
            last_shot_ms: None,
            last_shot_interval_ms: None,
            total_actions: 0,
            total_shots: 0,
            total_hits: 0,
            violation_count: 0,
            suspicious_score: 0.0,
            score_before_action: 0.0,
        }
    }

    /// Records an action and recomputes the suspicious score.
    pub fn add_action(&mut self, action: &PlayerAction, config: &RealtimeProfileConfig) {
        self.total_actions += 1;
        self.last_action_ms = Some(
            self.last_action_ms
                .map_or(action.timestamp_ms, |t| t.max(action.timestamp_ms)),
        );

        match action.action_type {
            ActionType::Move | ActionType::Jump | ActionType::Crouch => {
                self.update_movement(action);
            }
            ActionType::Shoot => self.update_shooting(action),
            ActionType::Aim => self.update_aim(action, config),
            ActionType::Reload | ActionType::Interact => {}
        }

        self.actions.push(action.clone());
        self.score_before_action = self.suspicious_score;
        self.recompute_score(config);
    }

    /// Records a detection raised against this player and re-scores the
    /// current action with it.
    pub fn add_detection(&mut self, detection: CheatDetection, config: &RealtimeProfileConfig) {
        self.violation_count += 1;
        self.detections.push(detection);
        self.recompute_score(config);
    }

    /// Marks the profile as used at `now_ms` (wall clock).
    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }

    fn update_movement(&mut self, action: &PlayerAction) {
        let position = action.position;
        let ts = action.timestamp_ms;
        if let Some((last_pos, last_ts)) = self.last_move {
            if ts <= last_ts {
                return;
            }
            let dt = (ts - last_ts) as f64 / MILLIS_PER_SECOND;
            let velocity = (position - last_pos).scale(1.0 / dt);
            if let Some(previous) = self.last_velocity {
                let change = (velocity - previous).length();
                self.movement_consistency.update(1.0 / (1.0 + change));
            }
            self.last_velocity = Some(velocity);
        }
        self.last_move = Some((position, ts));
    }

    fn update_shooting(&mut self, action: &PlayerAction) {
        self.total_shots += 1;
        if action.hit {
            self.total_hits += 1;
        }
        self.accuracy_trend.update(if action.hit { 1.0 } else { 0.0 });

        if action.headshot {
            self.consecutive_headshots += 1;
        } else {
            self.consecutive_headshots = 0;
        }

        if let Some(last) = self.last_shot_ms {
            if action.timestamp_ms > last {
                self.last_shot_interval_ms = Some((action.timestamp_ms - last) as f64);
            }
        }
        self.last_shot_ms = Some(action.timestamp_ms);
    }

    fn update_aim(&mut self, action: &PlayerAction, config: &RealtimeProfileConfig) {
        self.aim_samples.push(AimPoint {
            angle: action.view_angle,
            timestamp_ms: action.timestamp_ms,
        });

        let mut deltas = Vec::with_capacity(self.aim_samples.len());
        let mut peak_speed: f64 = 0.0;
        for (prev, next) in self.aim_samples.iter().zip(self.aim_samples.iter().skip(1)) {
            if next.timestamp_ms <= prev.timestamp_ms {
                continue;
            }
            let delta = next.angle.delta(prev.angle);
            let dt = (next.timestamp_ms - prev.timestamp_ms) as f64 / MILLIS_PER_SECOND;
            peak_speed = peak_speed.max(delta / dt);
            deltas.push(delta);
        }
        self.peak_angular_speed = peak_speed;

        if deltas.len() < 3 {
            self.aim_smoothness = None;
            self.unhuman_aiming = peak_speed > config.impossible_angular_speed;
            return;
        }

        // Jerk as the second difference of per-sample deltas.
        let jerks: Vec<f64> = deltas
            .windows(3)
            .map(|w| (w[2] - 2.0 * w[1] + w[0]).abs())
            .collect();
        let mean_jerk = mean(&jerks).unwrap_or(0.0);
        let smoothness = 1.0 / (1.0 + mean_jerk);
        self.mean_aim_delta = mean(&deltas).unwrap_or(0.0);
        self.aim_smoothness = Some(smoothness);
        self.unhuman_aiming = (smoothness > config.unhuman_smoothness
            && self.mean_aim_delta > config.unhuman_min_delta_deg)
            || peak_speed > config.impossible_angular_speed;
    }

    fn recompute_score(&mut self, config: &RealtimeProfileConfig) {
        let mut raw = 0.0;

        if self.unhuman_aiming {
            raw += 0.3;
        }
        if let Some(smoothness) = self.aim_smoothness {
            if smoothness < config.smoothness_low {
                raw += 0.2;
            } else if smoothness > config.smoothness_high {
                raw += 0.15;
            }
        }
        if self.consecutive_headshots > config.headshot_streak_threshold {
            raw += 0.25;
        }
        if self
            .last_shot_interval_ms
            .is_some_and(|interval| interval < config.min_shot_interval_ms)
        {
            raw += 0.2;
        }
        if self.total_shots >= MIN_SHOTS_FOR_TREND
            && self.accuracy_trend.value_or(0.0) > config.accuracy_trend_threshold
        {
            raw += 0.2;
        }

        let recent: Vec<f64> = self
            .detections
            .recent(config.recent_detection_window)
            .map(|d| d.confidence)
            .collect();
        raw += 0.3 * mean(&recent).unwrap_or(0.0);
        raw += 0.2 * self.violation_rate();

        self.suspicious_score = clamp01(0.8 * self.score_before_action + 0.2 * clamp01(raw));
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

    /// Newest action timestamp seen.
    #[must_use]
    pub const fn last_action_ms(&self) -> Option<u64> {
        self.last_action_ms
    }

    /// Recent actions, oldest first.
    #[must_use]
    pub fn actions(&self) -> &BoundedWindow<PlayerAction> {
        &self.actions
    }

    /// Recent aim samples, oldest first.
    #[must_use]
    pub fn aim_samples(&self) -> &BoundedWindow<AimPoint> {
        &self.aim_samples
    }

    /// Recent detections, oldest first.
    #[must_use]
    pub fn detections(&self) -> &BoundedWindow<CheatDetection> {
        &self.detections
    }

    /// Aim smoothness in (0, 1], once three deltas exist.
    #[must_use]
    pub const fn aim_smoothness(&self) -> Option<f64> {
        self.aim_smoothness
    }

    /// Whether the latest aim window looked machine-driven.
    #[must_use]
    pub const fn unhuman_aiming(&self) -> bool {
        self.unhuman_aiming
    }

    /// Fastest angular speed in the aim window (deg/s).
    #[must_use]
    pub const fn peak_angular_speed(&self) -> f64 {
        self.peak_angular_speed
    }

    /// Velocity-change EMA in (0, 1]; 1 is perfectly steady.
    #[must_use]
    pub fn movement_consistency(&self) -> f64 {
        self.movement_consistency.value_or(1.0)
    }

    /// Hit-rate EMA.
    #[must_use]
    pub fn accuracy_trend(&self) -> f64 {
        self.accuracy_trend.value_or(0.0)
    }

    /// Headshots in a row.
    #[must_use]
    pub const fn consecutive_headshots(&self) -> u32 {
        self.consecutive_headshots
    }

    /// Actions recorded.
    #[must_use]
    pub const fn total_actions(&self) -> u64 {
        self.total_actions
    }

    /// Shots recorded.
    #[must_use]
    pub const fn total_shots(&self) -> u64 {
        self.total_shots
    }

    /// Hits recorded.
    #[must_use]
    pub const fn total_hits(&self) -> u64 {
        self.total_hits
    }

    /// Detections recorded.
    #[must_use]
    pub const fn violation_count(&self) -> u64 {
        self.violation_count
    }

    /// Detections per action, in [0, 1].
    #[must_use]
    pub fn violation_rate(&self) -> f64 {
        if self.total_actions == 0 {
            return 0.0;
        }
        clamp01(self.violation_count as f64 / self.total_actions as f64)
    }

    /// Suspicious score in [0, 1].
    #[must_use]
    pub const fn suspicious_score(&self) -> f64 {
        self.suspicious_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::ViolationType;

    fn config() -> RealtimeProfileConfig {
        RealtimeProfileConfig::default()
    }

    fn aim(ts: u64, yaw: f64) -> PlayerAction {
        PlayerAction::new(1, ActionType::Aim, ts, Vec3::default(), ViewAngle::new(yaw, 0.0))
    }

    #[test]
    fn test_histories_stay_bounded() {
        let cfg = config();
        let mut profile = PlayerRealtimeProfile::new(1, &cfg, 0);
        for i in 0..500 {
            profile.add_action(&aim(i * 16, (i as f64) * 0.7), &cfg);
            profile.add_detection(CheatDetection::new(ViolationType::Aimbot, "t", 0.5, "x", i), &cfg);
        }
        assert_eq!(profile.actions().len(), cfg.action_history);
        assert_eq!(profile.aim_samples().len(), cfg.aim_history);
        assert_eq!(profile.detections().len(), cfg.detection_history);
        assert_eq!(profile.actions().last().map(|a| a.timestamp_ms), Some(499 * 16));
    }

    #[test]
    fn test_move_only_keeps_score_low() {
        let cfg = config();
        let mut profile = PlayerRealtimeProfile::new(1, &cfg, 0);
        for i in 0..50 {
            let action = PlayerAction::new(
                1,
                ActionType::Move,
                i * 100,
                Vec3::new(i as f64 * 0.5, 0.0, 0.0),
                ViewAngle::default(),
            );
            profile.add_action(&action, &cfg);
        }
        assert!(profile.suspicious_score() < 0.3);
        assert!((profile.movement_consistency() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_turn_is_unhuman() {
        let cfg = config();
        let mut profile = PlayerRealtimeProfile::new(1, &cfg, 0);
        for i in 0..10 {
            profile.add_action(&aim(i * 16, i as f64 * 2.0), &cfg);
        }
        assert!(profile.unhuman_aiming());
        assert!(profile.aim_smoothness().is_some_and(|s| s > 0.98));
        assert!(profile.suspicious_score() > 0.0);
    }

    #[test]
    fn test_headshot_streak_resets_on_body_shot() {
        let cfg = config();
        let mut profile = PlayerRealtimeProfile::new(1, &cfg, 0);
        let shot = |ts: u64, headshot: bool| {
            PlayerAction::new(1, ActionType::Shoot, ts, Vec3::default(), ViewAngle::default())
                .with_hit(true, headshot)
        };
        for i in 0..4 {
            profile.add_action(&shot(i * 200, true), &cfg);
        }
        assert_eq!(profile.consecutive_headshots(), 4);
        profile.add_action(&shot(1_000, false), &cfg);
        assert_eq!(profile.consecutive_headshots(), 0);
        assert_eq!(profile.total_hits(), 5);
    }

    #[test]
    fn test_score_stays_in_unit_range() {
        let cfg = config();
        let mut profile = PlayerRealtimeProfile::new(1, &cfg, 0);
        for i in 0..200 {
            let action =
                PlayerAction::new(1, ActionType::Shoot, i * 10, Vec3::default(), ViewAngle::default())
                    .with_hit(true, true);
            profile.add_action(&action, &cfg);
            profile.add_detection(CheatDetection::new(ViolationType::Aimbot, "t", 1.0, "x", i), &cfg);
            assert!((0.0..=1.0).contains(&profile.suspicious_score()));
        }
        assert!(profile.suspicious_score() > 0.5);
    }

    #[test]
    fn test_detection_rescores_current_action() {
        let cfg = config();
        let mut profile = PlayerRealtimeProfile::new(1, &cfg, 0);
        let action = PlayerAction::new(1, ActionType::Move, 0, Vec3::default(), ViewAngle::default());
        profile.add_action(&action, &cfg);
        assert!(profile.suspicious_score().abs() < 1e-12);

        profile.add_detection(CheatDetection::new(ViolationType::SpeedHack, "t", 1.0, "x", 0), &cfg);
        // One action, one violation: raw = 0.3 · 1.0 + 0.2 · 1.0.
        let once = profile.suspicious_score();
        assert!((once - 0.1).abs() < 1e-12, "score {once}");

        profile.add_detection(CheatDetection::new(ViolationType::SpeedHack, "t", 1.0, "x", 0), &cfg);
        // Still one step for the action; the violation rate caps at 1.
        assert!((profile.suspicious_score() - once).abs() < 1e-12);
    }
}
