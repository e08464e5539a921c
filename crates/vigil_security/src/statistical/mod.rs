//! # Statistical Analysis
//!
//! Long-horizon anomaly detection over periodic statistics snapshots.
//!
//! ```text
//!   PlayerStatistics
//!        │
//!        ▼
//!   StatisticalPlayerState (one per player, under its shard lock)
//!   ├── profile ──────► anomaly level, significant history
//!   ├── accuracy ─────► AccuracyAnalyzer
//!   ├── headshot ─────► HeadshotAnalyzer
//!   ├── performance ──► PerformanceAnalyzer
//!   ├── consistency ──► ConsistencyAnalyzer
//!   └── outlier ──────► OutlierAnalyzer ◄──► PopulationStatistics (shared)
//!        │
//!        ▼
//!   anomaly update ► profile checks ► filter ► sort ► truncate
//! ```
//!
//! The population baseline is the only state shared between players. It
//! moves slowly (α 0.01) so no single player can drag it.

pub mod accuracy;
pub mod consistency;
pub mod engine;
pub mod headshot;
pub mod outlier;
pub mod performance;
pub mod population;
pub mod profile;
pub mod rate;

use vigil_shared::PlayerStatistics;

use crate::evidence::StatisticalViolation;

pub use accuracy::{AccuracyAnalyzer, AccuracyProfile};
pub use consistency::{ConsistencyAnalyzer, ConsistencyProfile};
pub use engine::{StatisticalAnalysisEngine, StatisticalEngineStatistics, StatisticalPlayerState};
pub use headshot::{HeadshotAnalyzer, HeadshotProfile};
pub use outlier::{OutlierAnalyzer, OutlierProfile};
pub use performance::{PerformanceAnalyzer, PerformanceProfile};
pub use population::{MetricBaseline, PopulationStatistics};
pub use profile::{MetricTrends, PlayerStatisticalProfile};
pub use rate::RateHistory;

/// A per-snapshot statistical analyzer.
///
/// Same shape as the real-time detectors: configuration in the analyzer,
/// per-player EMA state in [`Self::Profile`].
pub trait StatisticalAnalyzer: Send + Sync {
    /// Private per-player state.
    type Profile: Send;

    /// Name carried on violations.
    fn name(&self) -> &'static str;

    /// Whether the analyzer runs.
    fn is_enabled(&self) -> bool;

    /// Fresh state for a new player.
    fn new_profile(&self) -> Self::Profile;

    /// Evaluates one snapshot. `profile` already includes the snapshot.
    fn analyze(
        &self,
        stats: &PlayerStatistics,
        profile: &PlayerStatisticalProfile,
        state: &mut Self::Profile,
    ) -> Vec<StatisticalViolation>;
}
