//! # Trigger-Bot Detection
//!
//! Fires when a shot lands faster after target exposure than a human can
//! react. Reaction times come from the [`ReactionOracle`]; without one the
//! detector is silent.

use std::sync::Arc;

use vigil_shared::series::mean;
use vigil_shared::{BoundedWindow, PlayerAction};

use crate::check::{collect_flagged, CheckOutcome};
use super::oracle::{MetadataOracle, ReactionOracle};
use super::profile::PlayerRealtimeProfile;
use super::RealtimeDetector;
use crate::config::TriggerBotConfig;
use crate::evidence::{CheatDetection, ViolationType};

/// Detector name carried on its detections.
pub const TRIGGER_BOT_DETECTOR: &str = "TriggerBotDetector";

/// Private reaction-time history for one player.
#[derive(Clone, Debug)]
pub struct TriggerProfile {
    reactions: BoundedWindow<f64>,
}

impl TriggerProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &TriggerBotConfig) -> Self {
        Self {
            reactions: BoundedWindow::new(config.window_size),
        }
    }

    /// Recent reaction times (ms), oldest first.
    #[must_use]
    pub fn reactions(&self) -> &BoundedWindow<f64> {
        &self.reactions
    }

    /// Mean of the recent reaction times.
    #[must_use]
    pub fn mean_reaction_ms(&self) -> Option<f64> {
        mean(&self.reactions.to_vec())
    }
}

/// Trigger-bot detector.
#[derive(Clone)]
pub struct TriggerBotDetector {
    config: TriggerBotConfig,
    oracle: Arc<dyn ReactionOracle>,
}

impl TriggerBotDetector {
    /// Creates a detector reading reaction times from `oracle`.
    #[must_use]
    pub fn new(config: TriggerBotConfig, oracle: Arc<dyn ReactionOracle>) -> Self {
        Self { config, oracle }
    }

    fn check_reaction(&self, action: &PlayerAction, state: &mut TriggerProfile) -> CheckOutcome {
        let Some(reaction) = self.oracle.reaction_time_ms(action) else {
            return CheckOutcome::NoSignal;
        };
        state.reactions.push(reaction);

        let floor = self.config.min_human_reaction_ms;
        CheckOutcome::flag_if(reaction < floor, || {
            let confidence = 0.5 + 0.5 * (1.0 - reaction / floor);
            let window_mean = state.mean_reaction_ms().unwrap_or(reaction);
            CheatDetection::new(
                ViolationType::TriggerBot,
                TRIGGER_BOT_DETECTOR,
                confidence,
                "Reaction time below human limit",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "Reacted in {reaction:.0} ms (floor {floor:.0} ms, recent mean {window_mean:.0} ms)"
            ))
            .with_meta("reaction_time_ms", reaction)
            .with_meta("mean_reaction_ms", window_mean)
        })
    }
}

impl Default for TriggerBotDetector {
    fn default() -> Self {
        Self::new(TriggerBotConfig::default(), Arc::new(MetadataOracle))
    }
}

impl std::fmt::Debug for TriggerBotDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerBotDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RealtimeDetector for TriggerBotDetector {
    type Profile = TriggerProfile;

    fn name(&self) -> &'static str {
        TRIGGER_BOT_DETECTOR
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> TriggerProfile {
        TriggerProfile::new(&self.config)
    }

    fn detect(
        &self,
        action: &PlayerAction,
        _profile: &PlayerRealtimeProfile,
        state: &mut TriggerProfile,
    ) -> Vec<CheatDetection> {
        if !action.is_shot() {
            return Vec::new();
        }
        collect_flagged([self.check_reaction(action, state)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RealtimeProfileConfig;
    use crate::realtime::oracle::NullOracle;
    use vigil_shared::constants::META_REACTION_TIME_MS;
    use vigil_shared::{ActionType, Vec3, ViewAngle};

    fn shot(ts: u64, reaction: f64) -> PlayerAction {
        PlayerAction::new(1, ActionType::Shoot, ts, Vec3::default(), ViewAngle::default())
            .with_meta(META_REACTION_TIME_MS, reaction)
    }

    fn run(detector: &TriggerBotDetector, state: &mut TriggerProfile, a: &PlayerAction) -> Vec<CheatDetection> {
        let profile = PlayerRealtimeProfile::new(1, &RealtimeProfileConfig::default(), 0);
        detector.detect(a, &profile, state)
    }

    #[test]
    fn test_fast_reaction_flags() {
        let detector = TriggerBotDetector::default();
        let mut state = detector.new_profile();
        let found = run(&detector, &mut state, &shot(0, 40.0));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].violation_type, ViolationType::TriggerBot);
        assert!((found[0].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_human_reaction_is_clear() {
        let detector = TriggerBotDetector::default();
        let mut state = detector.new_profile();
        for i in 0..40 {
            assert!(run(&detector, &mut state, &shot(i * 300, 180.0 + i as f64)).is_empty());
        }
        assert_eq!(state.reactions().len(), 20);
    }

    #[test]
    fn test_no_oracle_no_signal() {
        let detector = TriggerBotDetector::new(TriggerBotConfig::default(), Arc::new(NullOracle));
        let mut state = detector.new_profile();
        assert!(run(&detector, &mut state, &shot(0, 1.0)).is_empty());
        assert!(state.reactions().is_empty());
    }
}
