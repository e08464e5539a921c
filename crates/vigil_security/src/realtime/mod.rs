//! # Real-Time Detection
//!
//! Per-action cheat detection. Every action runs through the shared
//! [`PlayerRealtimeProfile`] and then through five detectors, each with its
//! own private per-player history.
//!
//! ```text
//!   PlayerAction
//!        │
//!        ▼
//!   PlayerState (one per player, under its shard lock)
//!   ├── profile ──────► suspicious score
//!   ├── aimbot ───────► AimbotDetector
//!   ├── speed_hack ───► SpeedHackDetector
//!   ├── trigger_bot ──► TriggerBotDetector   (ReactionOracle)
//!   ├── no_recoil ────► NoRecoilDetector     (RecoilOracle)
//!   └── esp ──────────► EspDetector          (VisibilityOracle)
//!        │
//!        ▼
//!   filter ► sort ► truncate ► RealtimeDetectionResult
//! ```
//!
//! Detectors never read the profile's suspicious score, only raw samples.

pub mod aimbot;
pub mod detector;
pub mod esp;
pub mod no_recoil;
pub mod oracle;
pub mod profile;
pub mod speed_hack;
pub mod trigger_bot;

use vigil_shared::PlayerAction;

use crate::evidence::CheatDetection;

pub use aimbot::{AimbotDetector, AimbotProfile};
pub use detector::{PlayerState, RealtimeCheatDetector, RealtimeStatistics};
pub use esp::{EspDetector, EspProfile};
pub use no_recoil::{NoRecoilDetector, RecoilProfile};
pub use oracle::{MetadataOracle, NullOracle, Oracles, ReactionOracle, RecoilOracle, VisibilityOracle};
pub use profile::PlayerRealtimeProfile;
pub use speed_hack::{SpeedHackDetector, SpeedProfile};
pub use trigger_bot::{TriggerBotDetector, TriggerProfile};

/// A per-action cheat detector.
///
/// Detectors hold only configuration. Per-player history lives in
/// [`Self::Profile`], owned by the player's [`PlayerState`] and aged out by
/// the orchestrator.
pub trait RealtimeDetector: Send + Sync {
    /// Private per-player history.
    type Profile: Send;

    /// Name carried on detections.
    fn name(&self) -> &'static str;

    /// Whether the detector runs.
    fn is_enabled(&self) -> bool;

    /// Fresh history for a new player.
    fn new_profile(&self) -> Self::Profile;

    /// Evaluates one action. `profile` already includes the action.
    fn detect(
        &self,
        action: &PlayerAction,
        profile: &PlayerRealtimeProfile,
        state: &mut Self::Profile,
    ) -> Vec<CheatDetection>;
}
