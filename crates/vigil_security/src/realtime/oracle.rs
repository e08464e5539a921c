//! # Signal Oracles
//!
//! Some checks need facts the action stream cannot prove on its own: did
//! the shooter have line of sight, how fast did they react, how much recoil
//! was left uncompensated. Those come from collaborators behind these
//! traits.
//!
//! Every oracle answers `Option`: `None` is "no signal" and the check that
//! asked stays silent. There is no richer contract than that.

use std::sync::Arc;

use vigil_shared::constants::{META_LINE_OF_SIGHT, META_REACTION_TIME_MS, META_RECOIL_RESIDUAL};
use vigil_shared::PlayerAction;

/// Line-of-sight source for the ESP detector.
pub trait VisibilityOracle: Send + Sync {
    /// Whether the shooter could see the target when firing.
    fn line_of_sight(&self, action: &PlayerAction) -> Option<bool>;
}

/// Reaction-time source for the trigger-bot detector.
pub trait ReactionOracle: Send + Sync {
    /// Time from target exposure to the shot, in milliseconds.
    fn reaction_time_ms(&self, action: &PlayerAction) -> Option<f64>;
}

/// Recoil source for the no-recoil detector.
pub trait RecoilOracle: Send + Sync {
    /// Uncompensated recoil after the shot, in degrees.
    fn recoil_residual(&self, action: &PlayerAction) -> Option<f64>;
}

/// Reads oracle answers from action metadata set by the session layer.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetadataOracle;

impl VisibilityOracle for MetadataOracle {
    fn line_of_sight(&self, action: &PlayerAction) -> Option<bool> {
        action.meta_bool(META_LINE_OF_SIGHT)
    }
}

impl ReactionOracle for MetadataOracle {
    fn reaction_time_ms(&self, action: &PlayerAction) -> Option<f64> {
        action
            .meta_f64(META_REACTION_TIME_MS)
            .filter(|ms| *ms >= 0.0)
    }
}

impl RecoilOracle for MetadataOracle {
    fn recoil_residual(&self, action: &PlayerAction) -> Option<f64> {
        action.meta_f64(META_RECOIL_RESIDUAL).map(f64::abs)
    }
}

/// Never answers. Disables oracle-backed checks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOracle;

impl VisibilityOracle for NullOracle {
    fn line_of_sight(&self, _action: &PlayerAction) -> Option<bool> {
        None
    }
}

impl ReactionOracle for NullOracle {
    fn reaction_time_ms(&self, _action: &PlayerAction) -> Option<f64> {
        None
    }
}

impl RecoilOracle for NullOracle {
    fn recoil_residual(&self, _action: &PlayerAction) -> Option<f64> {
        None
    }
}

/// The oracle set handed to the detectors.
#[derive(Clone)]
pub struct Oracles {
    /// Line of sight.
    pub visibility: Arc<dyn VisibilityOracle>,
    /// Reaction time.
    pub reaction: Arc<dyn ReactionOracle>,
    /// Recoil residual.
    pub recoil: Arc<dyn RecoilOracle>,
}

impl Oracles {
    /// All three answered from action metadata.
    #[must_use]
    pub fn metadata() -> Self {
        Self {
            visibility: Arc::new(MetadataOracle),
            reaction: Arc::new(MetadataOracle),
            recoil: Arc::new(MetadataOracle),
        }
    }

    /// None of the three answers.
    #[must_use]
    pub fn none() -> Self {
        Self {
            visibility: Arc::new(NullOracle),
            reaction: Arc::new(NullOracle),
            recoil: Arc::new(NullOracle),
        }
    }
}

impl Default for Oracles {
    fn default() -> Self {
        Self::metadata()
    }
}

impl std::fmt::Debug for Oracles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracles").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_shared::{ActionType, Vec3, ViewAngle};

    fn shot() -> PlayerAction {
        PlayerAction::new(7, ActionType::Shoot, 0, Vec3::default(), ViewAngle::default())
    }

    #[test]
    fn test_metadata_oracle_reads_keys() {
        let action = shot()
            .with_meta(META_LINE_OF_SIGHT, false)
            .with_meta(META_REACTION_TIME_MS, 80.0)
            .with_meta(META_RECOIL_RESIDUAL, -0.02);
        let oracle = MetadataOracle;
        assert_eq!(oracle.line_of_sight(&action), Some(false));
        assert_eq!(oracle.reaction_time_ms(&action), Some(80.0));
        assert_eq!(oracle.recoil_residual(&action), Some(0.02));
    }

    #[test]
    fn test_missing_keys_are_no_signal() {
        let oracles = Oracles::metadata();
        assert_eq!(oracles.visibility.line_of_sight(&shot()), None);
        assert_eq!(oracles.reaction.reaction_time_ms(&shot()), None);
    }

    #[test]
    fn test_negative_reaction_is_ignored() {
        let action = shot().with_meta(META_REACTION_TIME_MS, -5.0);
        assert_eq!(MetadataOracle.reaction_time_ms(&action), None);
    }

    #[test]
    fn test_null_oracle_never_answers() {
        let action = shot().with_meta(META_LINE_OF_SIGHT, true);
        assert_eq!(NullOracle.line_of_sight(&action), None);
    }
}
