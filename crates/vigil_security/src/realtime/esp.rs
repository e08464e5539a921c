//! # ESP / Wallhack Detection
//!
//! An engagement is a shot that connects. Landing several of them in a row
//! without line of sight means the shooter knew where targets were through
//! geometry.

use std::sync::Arc;

use vigil_shared::{BoundedWindow, PlayerAction};

use crate::check::{collect_flagged, CheckOutcome};
use super::oracle::{MetadataOracle, VisibilityOracle};
use super::profile::PlayerRealtimeProfile;
use super::RealtimeDetector;
use crate::config::EspConfig;
use crate::evidence::{CheatDetection, ViolationType};

/// Detector name carried on its detections.
pub const ESP_DETECTOR: &str = "EspDetector";

/// Private engagement history for one player.
#[derive(Clone, Debug)]
pub struct EspProfile {
    engagements: BoundedWindow<bool>,
    blind_streak: u32,
}

impl EspProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &EspConfig) -> Self {
        Self {
            engagements: BoundedWindow::new(config.window_size),
            blind_streak: 0,
        }
    }

    /// Line of sight per recent engagement, oldest first.
    #[must_use]
    pub fn engagements(&self) -> &BoundedWindow<bool> {
        &self.engagements
    }

    /// Current run of engagements without line of sight.
    #[must_use]
    pub const fn blind_streak(&self) -> u32 {
        self.blind_streak
    }

    /// Share of recent engagements without line of sight.
    #[must_use]
    pub fn blind_ratio(&self) -> f64 {
        if self.engagements.is_empty() {
            return 0.0;
        }
        let blind = self.engagements.iter().filter(|seen| !**seen).count();
        blind as f64 / self.engagements.len() as f64
    }
}

/// ESP detector.
#[derive(Clone)]
pub struct EspDetector {
    config: EspConfig,
    oracle: Arc<dyn VisibilityOracle>,
}

impl EspDetector {
    /// Creates a detector reading line of sight from `oracle`.
    #[must_use]
    pub fn new(config: EspConfig, oracle: Arc<dyn VisibilityOracle>) -> Self {
        Self { config, oracle }
    }

    fn check_blind_hits(&self, action: &PlayerAction, state: &mut EspProfile) -> CheckOutcome {
        let Some(line_of_sight) = self.oracle.line_of_sight(action) else {
            return CheckOutcome::NoSignal;
        };
        state.engagements.push(line_of_sight);
        if line_of_sight {
            state.blind_streak = 0;
            return CheckOutcome::Clear;
        }
        state.blind_streak += 1;

        let streak = state.blind_streak;
        let threshold = self.config.streak_threshold;
        CheckOutcome::flag_if(streak >= threshold, || {
            let confidence = (0.5 + 0.1 * f64::from(streak - threshold)).min(0.9);
            let ratio = state.blind_ratio();
            CheatDetection::new(
                ViolationType::EspWallhack,
                ESP_DETECTOR,
                confidence,
                "Repeated hits without line of sight",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "{streak} consecutive hits through geometry ({:.0}% of recent engagements)",
                ratio * 100.0
            ))
            .with_meta("blind_streak", f64::from(streak))
            .with_meta("blind_ratio", ratio)
        })
    }
}

impl Default for EspDetector {
    fn default() -> Self {
        Self::new(EspConfig::default(), Arc::new(MetadataOracle))
    }
}

impl std::fmt::Debug for EspDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EspDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RealtimeDetector for EspDetector {
    type Profile = EspProfile;

    fn name(&self) -> &'static str {
        ESP_DETECTOR
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> EspProfile {
        EspProfile::new(&self.config)
    }

    fn detect(
        &self,
        action: &PlayerAction,
        _profile: &PlayerRealtimeProfile,
        state: &mut EspProfile,
    ) -> Vec<CheatDetection> {
        if !(action.is_shot() && action.hit) {
            return Vec::new();
        }
        collect_flagged([self.check_blind_hits(action, state)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RealtimeProfileConfig;
    use vigil_shared::constants::META_LINE_OF_SIGHT;
    use vigil_shared::{ActionType, Vec3, ViewAngle};

    fn hit(ts: u64, line_of_sight: bool) -> PlayerAction {
        PlayerAction::new(1, ActionType::Shoot, ts, Vec3::default(), ViewAngle::default())
            .with_hit(true, false)
            .with_meta(META_LINE_OF_SIGHT, line_of_sight)
    }

    fn run(detector: &EspDetector, state: &mut EspProfile, a: &PlayerAction) -> Vec<CheatDetection> {
        let profile = PlayerRealtimeProfile::new(1, &RealtimeProfileConfig::default(), 0);
        detector.detect(a, &profile, state)
    }

    #[test]
    fn test_third_blind_hit_fires() {
        let detector = EspDetector::default();
        let mut state = detector.new_profile();
        assert!(run(&detector, &mut state, &hit(0, false)).is_empty());
        assert!(run(&detector, &mut state, &hit(100, false)).is_empty());
        let found = run(&detector, &mut state, &hit(200, false));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].violation_type, ViolationType::EspWallhack);
        assert!((found[0].severity - 0.85 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_visible_hit_resets() {
        let detector = EspDetector::default();
        let mut state = detector.new_profile();
        run(&detector, &mut state, &hit(0, false));
        run(&detector, &mut state, &hit(100, false));
        run(&detector, &mut state, &hit(200, true));
        assert!(run(&detector, &mut state, &hit(300, false)).is_empty());
        assert_eq!(state.blind_streak(), 1);
        assert!((state.blind_ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_misses_are_not_engagements() {
        let detector = EspDetector::default();
        let mut state = detector.new_profile();
        for i in 0..5 {
            let miss = hit(i * 100, false).with_hit(false, false);
            assert!(run(&detector, &mut state, &miss).is_empty());
        }
        assert!(state.engagements().is_empty());
    }
}
