//! # No-Recoil Detection
//!
//! Humans leave some recoil uncompensated on every shot. A streak of shots
//! with near-zero residual points at a compensation script.

use std::sync::Arc;

use vigil_shared::{BoundedWindow, PlayerAction};

use crate::check::{collect_flagged, CheckOutcome};
use super::oracle::{MetadataOracle, RecoilOracle};
use super::profile::PlayerRealtimeProfile;
use super::RealtimeDetector;
use crate::config::NoRecoilConfig;
use crate::evidence::{CheatDetection, ViolationType};

/// Detector name carried on its detections.
pub const NO_RECOIL_DETECTOR: &str = "NoRecoilDetector";

/// Private recoil history for one player.
#[derive(Clone, Debug)]
pub struct RecoilProfile {
    residuals: BoundedWindow<f64>,
    perfect_streak: u32,
}

impl RecoilProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &NoRecoilConfig) -> Self {
        Self {
            residuals: BoundedWindow::new(config.window_size),
            perfect_streak: 0,
        }
    }

    /// Recent residuals (deg), oldest first.
    #[must_use]
    pub fn residuals(&self) -> &BoundedWindow<f64> {
        &self.residuals
    }

    /// Current run of too-perfect shots.
    #[must_use]
    pub const fn perfect_streak(&self) -> u32 {
        self.perfect_streak
    }
}

/// No-recoil detector.
#[derive(Clone)]
pub struct NoRecoilDetector {
    config: NoRecoilConfig,
    oracle: Arc<dyn RecoilOracle>,
}

impl NoRecoilDetector {
    /// Creates a detector reading residuals from `oracle`.
    #[must_use]
    pub fn new(config: NoRecoilConfig, oracle: Arc<dyn RecoilOracle>) -> Self {
        Self { config, oracle }
    }

    fn check_streak(&self, action: &PlayerAction, state: &mut RecoilProfile) -> CheckOutcome {
        let Some(residual) = self.oracle.recoil_residual(action) else {
            return CheckOutcome::NoSignal;
        };
        state.residuals.push(residual);
        if residual < self.config.perfect_residual_deg {
            state.perfect_streak += 1;
        } else {
            state.perfect_streak = 0;
        }

        let streak = state.perfect_streak;
        let threshold = self.config.streak_threshold;
        CheckOutcome::flag_if(streak >= threshold, || {
            let confidence = (0.6 + 0.05 * f64::from(streak - threshold)).min(0.95);
            CheatDetection::new(
                ViolationType::NoRecoil,
                NO_RECOIL_DETECTOR,
                confidence,
                "Recoil compensated too perfectly",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "{streak} consecutive shots under {:.2} deg residual",
                self.config.perfect_residual_deg
            ))
            .with_meta("perfect_streak", f64::from(streak))
            .with_meta("last_residual", residual)
        })
    }
}

impl Default for NoRecoilDetector {
    fn default() -> Self {
        Self::new(NoRecoilConfig::default(), Arc::new(MetadataOracle))
    }
}

impl std::fmt::Debug for NoRecoilDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoRecoilDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RealtimeDetector for NoRecoilDetector {
    type Profile = RecoilProfile;

    fn name(&self) -> &'static str {
        NO_RECOIL_DETECTOR
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> RecoilProfile {
        RecoilProfile::new(&self.config)
    }

    fn detect(
        &self,
        action: &PlayerAction,
        _profile: &PlayerRealtimeProfile,
        state: &mut RecoilProfile,
    ) -> Vec<CheatDetection> {
        if !action.is_shot() {
            return Vec::new();
        }
        collect_flagged([self.check_streak(action, state)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RealtimeProfileConfig;
    use vigil_shared::constants::META_RECOIL_RESIDUAL;
    use vigil_shared::{ActionType, Vec3, ViewAngle};

    fn shot(ts: u64, residual: f64) -> PlayerAction {
        PlayerAction::new(1, ActionType::Shoot, ts, Vec3::default(), ViewAngle::default())
            .with_meta(META_RECOIL_RESIDUAL, residual)
    }

    fn run(detector: &NoRecoilDetector, state: &mut RecoilProfile, a: &PlayerAction) -> Vec<CheatDetection> {
        let profile = PlayerRealtimeProfile::new(1, &RealtimeProfileConfig::default(), 0);
        detector.detect(a, &profile, state)
    }

    #[test]
    fn test_fires_on_fifth_perfect_shot() {
        let detector = NoRecoilDetector::default();
        let mut state = detector.new_profile();
        for i in 0..4 {
            assert!(run(&detector, &mut state, &shot(i * 100, 0.01)).is_empty());
        }
        let found = run(&detector, &mut state, &shot(400, 0.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].violation_type, ViolationType::NoRecoil);
        assert!((found[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_imperfect_shot_resets_streak() {
        let detector = NoRecoilDetector::default();
        let mut state = detector.new_profile();
        for i in 0..4 {
            run(&detector, &mut state, &shot(i * 100, 0.01));
        }
        run(&detector, &mut state, &shot(400, 0.8));
        assert_eq!(state.perfect_streak(), 0);
        assert!(run(&detector, &mut state, &shot(500, 0.01)).is_empty());
    }

    #[test]
    fn test_shots_without_residual_are_ignored() {
        let detector = NoRecoilDetector::default();
        let mut state = detector.new_profile();
        let bare = PlayerAction::new(1, ActionType::Shoot, 0, Vec3::default(), ViewAngle::default());
        for _ in 0..10 {
            assert!(run(&detector, &mut state, &bare).is_empty());
        }
        assert!(state.residuals().is_empty());
    }
}
