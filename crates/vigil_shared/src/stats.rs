//! # Match Statistics Snapshots
//!
//! Periodic per-player aggregates produced by the stats-aggregation
//! collaborator. The core does not control their cadence.

use serde::{Deserialize, Serialize};

use crate::action::PlayerId;

/// Significance weight at or above which a snapshot is "significant".
pub const SIGNIFICANT_WEIGHT: f64 = 0.5;

/// A statistics snapshot for one player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStatistics {
    /// Player the snapshot describes.
    pub player_id: PlayerId,
    /// Snapshot time (ms).
    pub timestamp_ms: u64,
    /// Hits / shots, in [0, 1].
    pub average_accuracy: f64,
    /// Kills / deaths.
    pub kill_death_ratio: f64,
    /// Headshot kills / kills, in [0, 1].
    pub headshot_percentage: f64,
    /// Mean damage per fired shot.
    pub damage_per_shot: f64,
    /// Fire rate.
    pub shots_per_second: f64,
    /// Kill rate.
    pub kills_per_minute: f64,
    /// Mean reaction time (ms).
    pub average_reaction_time_ms: f64,
    /// Mean distance to victims at kill time (world units).
    pub average_kill_distance: f64,
    /// Matches won / matches played, in [0, 1].
    pub win_rate: f64,
    /// Aim precision score in [0, 1] (crosshair error normalized).
    pub aim_precision: f64,
    /// How much weight the snapshot deserves, in [0, 1].
    pub statistical_significance: f64,
    /// Shots fired in the window.
    pub total_shots: u64,
    /// Shots that connected.
    pub total_hits: u64,
}

impl PlayerStatistics {
    /// Creates an empty snapshot for a player at a time.
    #[must_use]
    pub fn new(player_id: PlayerId, timestamp_ms: u64) -> Self {
        Self {
            player_id,
            timestamp_ms,
            ..Self::default()
        }
    }

    /// Returns true if the snapshot carries enough weight to be trusted.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.statistical_significance >= SIGNIFICANT_WEIGHT
    }

    /// Estimated damage per second: damage/shot × shots/sec × accuracy.
    #[must_use]
    pub fn estimated_dps(&self) -> f64 {
        self.damage_per_shot * self.shots_per_second * self.average_accuracy
    }

    /// Reads one metric.
    #[must_use]
    pub fn metric(&self, metric: StatMetric) -> f64 {
        match metric {
            StatMetric::Accuracy => self.average_accuracy,
            StatMetric::KillDeathRatio => self.kill_death_ratio,
            StatMetric::HeadshotRate => self.headshot_percentage,
            StatMetric::DamagePerShot => self.damage_per_shot,
            StatMetric::ShotsPerSecond => self.shots_per_second,
            StatMetric::KillsPerMinute => self.kills_per_minute,
            StatMetric::ReactionTime => self.average_reaction_time_ms,
            StatMetric::KillDistance => self.average_kill_distance,
            StatMetric::WinRate => self.win_rate,
            StatMetric::AimPrecision => self.aim_precision,
        }
    }
}

/// Named snapshot metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatMetric {
    /// `average_accuracy`
    Accuracy,
    /// `kill_death_ratio`
    KillDeathRatio,
    /// `headshot_percentage`
    HeadshotRate,
    /// `damage_per_shot`
    DamagePerShot,
    /// `shots_per_second`
    ShotsPerSecond,
    /// `kills_per_minute`
    KillsPerMinute,
    /// `average_reaction_time_ms`
    ReactionTime,
    /// `average_kill_distance`
    KillDistance,
    /// `win_rate`
    WinRate,
    /// `aim_precision`
    AimPrecision,
}

impl StatMetric {
    /// Every metric, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Accuracy,
        Self::KillDeathRatio,
        Self::HeadshotRate,
        Self::DamagePerShot,
        Self::ShotsPerSecond,
        Self::KillsPerMinute,
        Self::ReactionTime,
        Self::KillDistance,
        Self::WinRate,
        Self::AimPrecision,
    ];

    /// Stable snake-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::KillDeathRatio => "kill_death_ratio",
            Self::HeadshotRate => "headshot_rate",
            Self::DamagePerShot => "damage_per_shot",
            Self::ShotsPerSecond => "shots_per_second",
            Self::KillsPerMinute => "kills_per_minute",
            Self::ReactionTime => "reaction_time",
            Self::KillDistance => "kill_distance",
            Self::WinRate => "win_rate",
            Self::AimPrecision => "aim_precision",
        }
    }
}

impl std::fmt::Display for StatMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_dps() {
        let stats = PlayerStatistics {
            damage_per_shot: 30.0,
            shots_per_second: 10.0,
            average_accuracy: 0.5,
            ..PlayerStatistics::default()
        };
        assert!((stats.estimated_dps() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_snapshot_deserializes() {
        let stats: PlayerStatistics =
            serde_json::from_str(r#"{"player_id": 3, "average_accuracy": 0.4}"#).unwrap();
        assert_eq!(stats.player_id, 3);
        assert!((stats.metric(StatMetric::Accuracy) - 0.4).abs() < 1e-9);
        assert!(!stats.is_significant());
    }
}
