//! # Detection Configuration
//!
//! The core consumes an already-resolved [`DetectionConfig`]. Every struct
//! derives `Deserialize` with `#[serde(default)]` so a host can load a
//! partial file and inherit the rest; reading that file is the host's job.
//!
//! Units: milliseconds, degrees, world units, units/second, degrees/second.

use serde::{Deserialize, Serialize};
use vigil_shared::constants::{DEFAULT_MAX_PROFILES, DEFAULT_PROFILE_TTL_MS, DEFAULT_WORKER_COUNT};

use crate::error::{SecurityError, SecurityResult};

/// Root configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Real-time pipeline.
    pub realtime: RealtimeConfig,
    /// Statistical pipeline.
    pub statistical: StatisticalConfig,
    /// Per-player state limits.
    pub registry: RegistryConfig,
    /// Worker pool.
    pub service: ServiceConfig,
}

impl DetectionConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> SecurityResult<()> {
        self.registry.validate()?;
        self.service.validate()?;
        self.realtime.validate()?;
        self.statistical.validate()
    }

    /// Boolean form of [`validate`](Self::validate), for loaders.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

fn invalid(field: &str, reason: &str) -> SecurityError {
    SecurityError::InvalidConfig(format!("{field}: {reason}"))
}

fn check_unit(field: &str, value: f64) -> SecurityResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, "must be within [0, 1]"))
    }
}

fn check_alpha(field: &str, value: f64) -> SecurityResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be within (0, 1]"))
    }
}

fn check_positive(field: &str, value: f64) -> SecurityResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn check_nonzero(field: &str, value: usize) -> SecurityResult<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(invalid(field, "must be greater than zero"))
    }
}

// ============================================================================
// REGISTRY / SERVICE
// ============================================================================

/// What happens when a new player arrives and the registry is full even
/// after evicting idle profiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Admit the player anyway (population may exceed the cap).
    #[default]
    AdmitAnyway,
    /// Refuse to track the player; the result is marked rejected.
    Reject,
}

/// Per-player state limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Player population cap that triggers idle eviction.
    pub max_profiles: usize,
    /// Idle time before a profile is evicted (ms).
    pub profile_ttl_ms: u64,
    /// Number of independently locked shards.
    pub shard_count: usize,
    /// Behavior when eviction frees no capacity.
    pub admission: AdmissionPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_profiles: DEFAULT_MAX_PROFILES,
            profile_ttl_ms: DEFAULT_PROFILE_TTL_MS,
            shard_count: 16,
            admission: AdmissionPolicy::AdmitAnyway,
        }
    }
}

impl RegistryConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("registry.max_profiles", self.max_profiles)?;
        check_nonzero("registry.shard_count", self.shard_count)?;
        if self.profile_ttl_ms == 0 {
            return Err(invalid("registry.profile_ttl_ms", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Worker pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Jobs buffered per worker before submitters block.
    pub queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: 1024,
        }
    }
}

impl ServiceConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("service.worker_count", self.worker_count)?;
        check_nonzero("service.queue_capacity", self.queue_capacity)
    }
}

// ============================================================================
// REAL-TIME PIPELINE
// ============================================================================

/// Real-time pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Master switch.
    pub enabled: bool,
    /// Detections below this confidence are dropped.
    pub min_confidence: f64,
    /// Maximum detections per result.
    pub max_detections: usize,
    /// Shared profile tuning.
    pub profile: RealtimeProfileConfig,
    /// Aimbot detector.
    pub aimbot: AimbotConfig,
    /// Speed-hack detector.
    pub speed_hack: SpeedHackConfig,
    /// Trigger-bot detector.
    pub trigger_bot: TriggerBotConfig,
    /// No-recoil detector.
    pub no_recoil: NoRecoilConfig,
    /// ESP detector.
    pub esp: EspConfig,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.3,
            max_detections: 10,
            profile: RealtimeProfileConfig::default(),
            aimbot: AimbotConfig::default(),
            speed_hack: SpeedHackConfig::default(),
            trigger_bot: TriggerBotConfig::default(),
            no_recoil: NoRecoilConfig::default(),
            esp: EspConfig::default(),
        }
    }
}

impl RealtimeConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_unit("realtime.min_confidence", self.min_confidence)?;
        check_nonzero("realtime.max_detections", self.max_detections)?;
        self.profile.validate()?;
        self.aimbot.validate()?;
        self.speed_hack.validate()?;
        self.trigger_bot.validate()?;
        self.no_recoil.validate()?;
        self.esp.validate()
    }
}

/// Shared realtime profile tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeProfileConfig {
    /// Recent actions kept.
    pub action_history: usize,
    /// Aim samples kept.
    pub aim_history: usize,
    /// Detections kept.
    pub detection_history: usize,
    /// Shots closer together than this are suspicious (ms).
    pub min_shot_interval_ms: f64,
    /// Smoothness below this is "extreme low" (jittery input injection).
    pub smoothness_low: f64,
    /// Smoothness above this is "extreme high".
    pub smoothness_high: f64,
    /// Smoothness above this while turning flags unhuman aiming.
    pub unhuman_smoothness: f64,
    /// Mean aim delta (deg) required before smoothness can flag unhuman aiming.
    pub unhuman_min_delta_deg: f64,
    /// Angular speed (deg/s) that flags unhuman aiming on its own.
    pub impossible_angular_speed: f64,
    /// Consecutive headshots above this count are suspicious.
    pub headshot_streak_threshold: u32,
    /// Accuracy EMA above this is suspicious.
    pub accuracy_trend_threshold: f64,
    /// EMA weight for the accuracy trend.
    pub accuracy_alpha: f64,
    /// EMA weight for movement consistency.
    pub movement_alpha: f64,
    /// Recent detections averaged into the suspicious score.
    pub recent_detection_window: usize,
}

impl Default for RealtimeProfileConfig {
    fn default() -> Self {
        Self {
            action_history: 100,
            aim_history: 20,
            detection_history: 50,
            min_shot_interval_ms: 50.0,
            smoothness_low: 0.05,
            smoothness_high: 0.95,
            unhuman_smoothness: 0.98,
            unhuman_min_delta_deg: 1.0,
            impossible_angular_speed: 12_000.0,
            headshot_streak_threshold: 10,
            accuracy_trend_threshold: 0.9,
            accuracy_alpha: 0.1,
            movement_alpha: 0.1,
            recent_detection_window: 10,
        }
    }
}

impl RealtimeProfileConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("realtime.profile.action_history", self.action_history)?;
        check_nonzero("realtime.profile.aim_history", self.aim_history)?;
        check_nonzero("realtime.profile.detection_history", self.detection_history)?;
        check_nonzero("realtime.profile.recent_detection_window", self.recent_detection_window)?;
        check_unit("realtime.profile.smoothness_low", self.smoothness_low)?;
        check_unit("realtime.profile.smoothness_high", self.smoothness_high)?;
        check_unit("realtime.profile.unhuman_smoothness", self.unhuman_smoothness)?;
        check_unit("realtime.profile.accuracy_trend_threshold", self.accuracy_trend_threshold)?;
        check_alpha("realtime.profile.accuracy_alpha", self.accuracy_alpha)?;
        check_alpha("realtime.profile.movement_alpha", self.movement_alpha)?;
        check_positive("realtime.profile.impossible_angular_speed", self.impossible_angular_speed)?;
        if self.smoothness_low >= self.smoothness_high {
            return Err(invalid(
                "realtime.profile.smoothness_low",
                "must be below smoothness_high",
            ));
        }
        Ok(())
    }
}

/// Aimbot detector tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimbotConfig {
    /// Detector switch.
    pub enabled: bool,
    /// Aim samples kept.
    pub history_size: usize,
    /// Angular speed (deg/s) that counts as a snap.
    pub snap_speed_threshold: f64,
    /// A shot within this long after a snap completes snap-to-target (ms).
    pub snap_shot_window_ms: u64,
    /// Mean |jerk| (deg/s³) below this is inhumanly smooth.
    pub jerk_floor: f64,
    /// Samples needed before smoothness is judged.
    pub smoothness_min_samples: usize,
    /// Mean angular speed (deg/s) needed before smoothness is judged.
    pub smoothness_min_speed: f64,
    /// Half-width of the tracking speed band, as a fraction of mean speed.
    pub tracking_band: f64,
    /// Mean tracking speed (deg/s) needed before tracking is judged.
    pub tracking_min_speed: f64,
    /// Targeting samples needed before tracking is judged.
    pub tracking_min_samples: usize,
    /// In-band fraction that counts as a tracking hit.
    pub tracking_fraction: f64,
    /// Tracking counter value that fires.
    pub tracking_hits_required: u32,
    /// Deltas this close (deg) count as identical.
    pub precision_tolerance_deg: f64,
    /// Deltas below this (deg) are too small to judge precision.
    pub precision_min_delta_deg: f64,
    /// Identical deltas among the last five that fire.
    pub precision_matches: usize,
    /// Angular speed (deg/s) no human wrist produces.
    pub impossible_angular_speed: f64,
}

impl Default for AimbotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_size: 30,
            snap_speed_threshold: 1_800.0,
            snap_shot_window_ms: 100,
            jerk_floor: 500.0,
            smoothness_min_samples: 10,
            smoothness_min_speed: 30.0,
            tracking_band: 0.05,
            tracking_min_speed: 20.0,
            tracking_min_samples: 8,
            tracking_fraction: 0.8,
            tracking_hits_required: 3,
            precision_tolerance_deg: 0.05,
            precision_min_delta_deg: 0.5,
            precision_matches: 3,
            impossible_angular_speed: 12_000.0,
        }
    }
}

impl AimbotConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("realtime.aimbot.history_size", self.history_size)?;
        check_positive("realtime.aimbot.snap_speed_threshold", self.snap_speed_threshold)?;
        check_positive("realtime.aimbot.jerk_floor", self.jerk_floor)?;
        check_unit("realtime.aimbot.tracking_band", self.tracking_band)?;
        check_unit("realtime.aimbot.tracking_fraction", self.tracking_fraction)?;
        check_positive("realtime.aimbot.impossible_angular_speed", self.impossible_angular_speed)?;
        if self.precision_matches == 0 || self.precision_matches > 5 {
            return Err(invalid("realtime.aimbot.precision_matches", "must be within 1..=5"));
        }
        if self.smoothness_min_samples < 4 {
            return Err(invalid("realtime.aimbot.smoothness_min_samples", "must be at least 4"));
        }
        Ok(())
    }
}

/// Speed-hack detector tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedHackConfig {
    /// Detector switch.
    pub enabled: bool,
    /// Movement samples kept.
    pub history_size: usize,
    /// Walking speed cap (u/s).
    pub max_walk_speed: f64,
    /// Sprinting speed cap (u/s).
    pub max_sprint_speed: f64,
    /// Multiplier applied to the caps for network jitter.
    pub speed_tolerance: f64,
    /// Samples closer together than this are too noisy for speed (ms).
    pub min_sample_interval_ms: u64,
    /// Displacement (u) that counts as a teleport...
    pub teleport_distance: f64,
    /// ...when covered within this window (ms).
    pub teleport_window_ms: u64,
    /// Acceleration cap (u/s²).
    pub max_acceleration: f64,
    /// Shortest span a speed change is measured across (ms).
    pub acceleration_window_ms: u64,
    /// Samples considered for sustained violation.
    pub sustained_window: usize,
    /// Samples needed before sustained violation is judged.
    pub sustained_min_samples: usize,
    /// Over-cap fraction that fires.
    pub sustained_fraction: f64,
}

impl Default for SpeedHackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_size: 50,
            max_walk_speed: 6.0,
            max_sprint_speed: 9.0,
            speed_tolerance: 1.1,
            min_sample_interval_ms: 10,
            teleport_distance: 15.0,
            teleport_window_ms: 200,
            max_acceleration: 150.0,
            acceleration_window_ms: 100,
            sustained_window: 20,
            sustained_min_samples: 10,
            sustained_fraction: 0.5,
        }
    }
}

impl SpeedHackConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("realtime.speed_hack.history_size", self.history_size)?;
        check_positive("realtime.speed_hack.max_walk_speed", self.max_walk_speed)?;
        check_positive("realtime.speed_hack.max_sprint_speed", self.max_sprint_speed)?;
        check_positive("realtime.speed_hack.teleport_distance", self.teleport_distance)?;
        check_positive("realtime.speed_hack.max_acceleration", self.max_acceleration)?;
        if self.acceleration_window_ms < self.min_sample_interval_ms {
            return Err(invalid(
                "realtime.speed_hack.acceleration_window_ms",
                "must be at least min_sample_interval_ms",
            ));
        }
        check_nonzero("realtime.speed_hack.sustained_window", self.sustained_window)?;
        check_unit("realtime.speed_hack.sustained_fraction", self.sustained_fraction)?;
        if self.speed_tolerance < 1.0 {
            return Err(invalid("realtime.speed_hack.speed_tolerance", "must be at least 1.0"));
        }
        if self.sustained_window > self.history_size {
            return Err(invalid(
                "realtime.speed_hack.sustained_window",
                "must not exceed history_size",
            ));
        }
        Ok(())
    }
}

/// Trigger-bot detector tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerBotConfig {
    /// Detector switch.
    pub enabled: bool,
    /// Reaction times kept.
    pub window_size: usize,
    /// Fastest plausible human reaction (ms).
    pub min_human_reaction_ms: f64,
}

impl Default for TriggerBotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size: 20,
            min_human_reaction_ms: 100.0,
        }
    }
}

impl TriggerBotConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("realtime.trigger_bot.window_size", self.window_size)?;
        check_positive("realtime.trigger_bot.min_human_reaction_ms", self.min_human_reaction_ms)
    }
}

/// No-recoil detector tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoRecoilConfig {
    /// Detector switch.
    pub enabled: bool,
    /// Residuals kept.
    pub window_size: usize,
    /// Residual (deg) below which compensation is "too perfect".
    pub perfect_residual_deg: f64,
    /// Streak length that fires.
    pub streak_threshold: u32,
}

impl Default for NoRecoilConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size: 30,
            perfect_residual_deg: 0.05,
            streak_threshold: 5,
        }
    }
}

impl NoRecoilConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("realtime.no_recoil.window_size", self.window_size)?;
        check_positive("realtime.no_recoil.perfect_residual_deg", self.perfect_residual_deg)?;
        if self.streak_threshold == 0 {
            return Err(invalid("realtime.no_recoil.streak_threshold", "must be greater than zero"));
        }
        Ok(())
    }
}

/// ESP detector tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EspConfig {
    /// Detector switch.
    pub enabled: bool,
    /// Engagements kept.
    pub window_size: usize,
    /// Consecutive engagements without line of sight that fire.
    pub streak_threshold: u32,
}

impl Default for EspConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size: 30,
            streak_threshold: 3,
        }
    }
}

impl EspConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("realtime.esp.window_size", self.window_size)?;
        if self.streak_threshold == 0 {
            return Err(invalid("realtime.esp.streak_threshold", "must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// STATISTICAL PIPELINE
// ============================================================================

/// Statistical pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalConfig {
    /// Master switch.
    pub enabled: bool,
    /// Violations below this confidence are dropped.
    pub min_confidence: f64,
    /// Maximum violations per result.
    pub max_violations: usize,
    /// Anomaly level above which the profile itself is flagged.
    pub anomaly_threshold: f64,
    /// Statistical profile tuning.
    pub profile: StatProfileConfig,
    /// Superhuman-performance gate.
    pub superhuman: SuperhumanConfig,
    /// Accuracy analyzer.
    pub accuracy: AccuracyConfig,
    /// Headshot analyzer.
    pub headshot: HeadshotConfig,
    /// Performance analyzer.
    pub performance: PerformanceConfig,
    /// Consistency analyzer.
    pub consistency: ConsistencyConfig,
    /// Outlier analyzer.
    pub outlier: OutlierConfig,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.2,
            max_violations: 20,
            anomaly_threshold: 0.7,
            profile: StatProfileConfig::default(),
            superhuman: SuperhumanConfig::default(),
            accuracy: AccuracyConfig::default(),
            headshot: HeadshotConfig::default(),
            performance: PerformanceConfig::default(),
            consistency: ConsistencyConfig::default(),
            outlier: OutlierConfig::default(),
        }
    }
}

impl StatisticalConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_unit("statistical.min_confidence", self.min_confidence)?;
        check_unit("statistical.anomaly_threshold", self.anomaly_threshold)?;
        check_nonzero("statistical.max_violations", self.max_violations)?;
        self.profile.validate()?;
        self.superhuman.validate()?;
        self.accuracy.validate()?;
        self.headshot.validate()?;
        self.performance.validate()?;
        self.consistency.validate()?;
        self.outlier.validate()
    }
}

/// Statistical profile tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatProfileConfig {
    /// Snapshots kept.
    pub history_size: usize,
    /// Significant snapshots kept.
    pub significant_history: usize,
    /// Points kept per trend series.
    pub trend_history: usize,
    /// Anomaly level multiplier per update.
    pub anomaly_decay: f64,
    /// Anomaly growth per unit of Σ(confidence·severity).
    pub anomaly_growth: f64,
    /// Significant snapshots needed for profile-level impossible checks.
    pub profile_check_min_samples: usize,
    /// Mean significant accuracy that is impossible.
    pub profile_impossible_accuracy: f64,
    /// Mean significant headshot rate that is impossible.
    pub profile_impossible_headshot: f64,
}

impl Default for StatProfileConfig {
    fn default() -> Self {
        Self {
            history_size: 200,
            significant_history: 50,
            trend_history: 50,
            anomaly_decay: 0.95,
            anomaly_growth: 0.2,
            profile_check_min_samples: 5,
            profile_impossible_accuracy: 0.9,
            profile_impossible_headshot: 0.7,
        }
    }
}

impl StatProfileConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("statistical.profile.history_size", self.history_size)?;
        check_nonzero("statistical.profile.significant_history", self.significant_history)?;
        check_nonzero("statistical.profile.trend_history", self.trend_history)?;
        check_unit("statistical.profile.anomaly_decay", self.anomaly_decay)?;
        check_positive("statistical.profile.anomaly_growth", self.anomaly_growth)?;
        check_unit(
            "statistical.profile.profile_impossible_accuracy",
            self.profile_impossible_accuracy,
        )?;
        check_unit(
            "statistical.profile.profile_impossible_headshot",
            self.profile_impossible_headshot,
        )
    }
}

/// Superhuman-performance gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuperhumanConfig {
    /// Accuracy indicator threshold.
    pub accuracy: f64,
    /// Headshot indicator threshold.
    pub headshot: f64,
    /// KDR indicator threshold.
    pub kill_death_ratio: f64,
    /// Win-rate indicator threshold.
    pub win_rate: f64,
    /// Indicators that must hold simultaneously.
    pub min_indicators: usize,
    /// Minimum snapshot significance to judge.
    pub min_significance: f64,
}

impl Default for SuperhumanConfig {
    fn default() -> Self {
        Self {
            accuracy: 0.9,
            headshot: 0.7,
            kill_death_ratio: 15.0,
            win_rate: 0.9,
            min_indicators: 3,
            min_significance: 0.3,
        }
    }
}

impl SuperhumanConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_unit("statistical.superhuman.min_significance", self.min_significance)?;
        if self.min_indicators == 0 || self.min_indicators > 4 {
            return Err(invalid("statistical.superhuman.min_indicators", "must be within 1..=4"));
        }
        Ok(())
    }
}

/// Accuracy analyzer tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyConfig {
    /// Analyzer switch.
    pub enabled: bool,
    /// EMA weight.
    pub alpha: f64,
    /// Samples kept.
    pub history_size: usize,
    /// Accuracy above this is impossible.
    pub impossible: f64,
    /// Accuracy above this is suspicious.
    pub suspicious: f64,
    /// Samples needed before variance is judged.
    pub min_variance_samples: usize,
    /// Variance below this is unnaturally steady.
    pub low_variance: f64,
    /// Mean accuracy needed before low variance matters.
    pub variance_min_mean: f64,
    /// Jump over the EMA that counts as a spike.
    pub spike_delta: f64,
    /// Accuracy a spike must land above.
    pub competence_floor: f64,
    /// Accuracy component of the damage correlation check.
    pub damage_accuracy: f64,
    /// Damage-per-shot component of the damage correlation check.
    pub damage_per_shot: f64,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: 0.1,
            history_size: 50,
            impossible: 0.95,
            suspicious: 0.75,
            min_variance_samples: 10,
            low_variance: 0.0005,
            variance_min_mean: 0.3,
            spike_delta: 0.15,
            competence_floor: 0.5,
            damage_accuracy: 0.8,
            damage_per_shot: 50.0,
        }
    }
}

impl AccuracyConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_alpha("statistical.accuracy.alpha", self.alpha)?;
        check_nonzero("statistical.accuracy.history_size", self.history_size)?;
        check_unit("statistical.accuracy.impossible", self.impossible)?;
        check_unit("statistical.accuracy.suspicious", self.suspicious)?;
        check_positive("statistical.accuracy.low_variance", self.low_variance)?;
        if self.suspicious >= self.impossible || self.impossible >= 1.0 {
            return Err(invalid(
                "statistical.accuracy.suspicious",
                "must satisfy suspicious < impossible < 1",
            ));
        }
        Ok(())
    }
}

/// Headshot analyzer tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadshotConfig {
    /// Analyzer switch.
    pub enabled: bool,
    /// EMA weight.
    pub alpha: f64,
    /// Samples kept.
    pub history_size: usize,
    /// Rate above this is impossible.
    pub impossible: f64,
    /// Rate above this is suspicious.
    pub suspicious: f64,
    /// Samples needed before variance is judged.
    pub min_variance_samples: usize,
    /// Variance below this is unnaturally steady.
    pub low_variance: f64,
    /// Mean rate needed before low variance matters.
    pub variance_min_mean: f64,
    /// Jump over the EMA that counts as a spike.
    pub spike_delta: f64,
    /// Rate a spike must land above.
    pub spike_floor: f64,
    /// Sample/average ratio above which streakiness grows.
    pub streak_high_ratio: f64,
    /// Sample/average ratio below which streakiness grows.
    pub streak_low_ratio: f64,
    /// Streakiness growth weight.
    pub streak_increment: f64,
    /// Streakiness multiplier otherwise.
    pub streak_decay: f64,
    /// Streakiness that fires.
    pub streak_threshold: f64,
    /// Rate component of the long-range check.
    pub long_range_rate: f64,
    /// Kill distance (u) component of the long-range check.
    pub long_range_distance: f64,
}

impl Default for HeadshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: 0.1,
            history_size: 50,
            impossible: 0.8,
            suspicious: 0.5,
            min_variance_samples: 10,
            low_variance: 0.0005,
            variance_min_mean: 0.2,
            spike_delta: 0.15,
            spike_floor: 0.3,
            streak_high_ratio: 1.5,
            streak_low_ratio: 0.5,
            streak_increment: 0.15,
            streak_decay: 0.95,
            streak_threshold: 0.6,
            long_range_rate: 0.4,
            long_range_distance: 50.0,
        }
    }
}

impl HeadshotConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_alpha("statistical.headshot.alpha", self.alpha)?;
        check_nonzero("statistical.headshot.history_size", self.history_size)?;
        check_unit("statistical.headshot.impossible", self.impossible)?;
        check_unit("statistical.headshot.suspicious", self.suspicious)?;
        check_unit("statistical.headshot.streak_increment", self.streak_increment)?;
        check_unit("statistical.headshot.streak_decay", self.streak_decay)?;
        check_unit("statistical.headshot.streak_threshold", self.streak_threshold)?;
        if self.suspicious >= self.impossible || self.impossible >= 1.0 {
            return Err(invalid(
                "statistical.headshot.suspicious",
                "must satisfy suspicious < impossible < 1",
            ));
        }
        Ok(())
    }
}

/// Performance analyzer tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Analyzer switch.
    pub enabled: bool,
    /// EMA weight.
    pub alpha: f64,
    /// Samples kept.
    pub history_size: usize,
    /// KDR above this is impossible.
    pub impossible_kdr: f64,
    /// KDR above this is suspicious.
    pub suspicious_kdr: f64,
    /// Estimated DPS above this is impossible.
    pub impossible_dps: f64,
    /// Estimated DPS above this is suspicious.
    pub suspicious_dps: f64,
    /// Samples needed before KDR consistency is judged.
    pub consistency_min_samples: usize,
    /// KDR coefficient of variation below this is too steady.
    pub consistency_cv: f64,
    /// KDR needed before consistency matters.
    pub consistency_min_kdr: f64,
    /// KDR over EMA ratio that counts as rapid improvement.
    pub improvement_factor: f64,
    /// EMA needed before improvement is judged.
    pub improvement_min_ema: f64,
    /// Samples needed before improvement is judged.
    pub improvement_min_samples: usize,
    /// Samples needed before accuracy↔KDR correlation is judged.
    pub correlation_min_samples: usize,
    /// Correlation below this is poor.
    pub correlation_floor: f64,
    /// KDR the poor correlation must co-occur with.
    pub correlation_min_kdr: f64,
    /// KDR outlier indicator.
    pub outlier_kdr: f64,
    /// Accuracy outlier indicator.
    pub outlier_accuracy: f64,
    /// Headshot outlier indicator.
    pub outlier_headshot: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alpha: 0.15,
            history_size: 50,
            impossible_kdr: 20.0,
            suspicious_kdr: 5.0,
            impossible_dps: 400.0,
            suspicious_dps: 200.0,
            consistency_min_samples: 10,
            consistency_cv: 0.1,
            consistency_min_kdr: 2.0,
            improvement_factor: 2.0,
            improvement_min_ema: 0.5,
            improvement_min_samples: 5,
            correlation_min_samples: 10,
            correlation_floor: 0.2,
            correlation_min_kdr: 3.0,
            outlier_kdr: 5.0,
            outlier_accuracy: 0.75,
            outlier_headshot: 0.5,
        }
    }
}

impl PerformanceConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_alpha("statistical.performance.alpha", self.alpha)?;
        check_nonzero("statistical.performance.history_size", self.history_size)?;
        check_positive("statistical.performance.suspicious_kdr", self.suspicious_kdr)?;
        check_positive("statistical.performance.suspicious_dps", self.suspicious_dps)?;
        if self.suspicious_kdr >= self.impossible_kdr {
            return Err(invalid(
                "statistical.performance.suspicious_kdr",
                "must be below impossible_kdr",
            ));
        }
        if self.suspicious_dps >= self.impossible_dps {
            return Err(invalid(
                "statistical.performance.suspicious_dps",
                "must be below impossible_dps",
            ));
        }
        if self.improvement_factor <= 1.0 {
            return Err(invalid(
                "statistical.performance.improvement_factor",
                "must be greater than 1",
            ));
        }
        Ok(())
    }
}

/// Consistency analyzer tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    /// Analyzer switch.
    pub enabled: bool,
    /// Samples kept per metric.
    pub history_size: usize,
    /// Samples needed inside the window.
    pub min_samples: usize,
    /// Window length (ms).
    pub window_ms: u64,
    /// Accuracy variance threshold.
    pub accuracy_variance: f64,
    /// Reaction-time variance threshold (ms²).
    pub reaction_variance: f64,
    /// KDR variance threshold.
    pub kdr_variance: f64,
    /// Headshot variance threshold.
    pub headshot_variance: f64,
    /// Aim-precision variance threshold.
    pub aim_precision_variance: f64,
    /// Composite consistency that fires.
    pub composite_threshold: f64,
    /// Autocorrelation that counts as periodic.
    pub autocorrelation_threshold: f64,
    /// Smallest lag tested.
    pub min_lag: usize,
    /// Largest lag tested.
    pub max_lag: usize,
    /// Histogram buckets for entropy.
    pub entropy_buckets: usize,
    /// Normalized entropy below this fires.
    pub entropy_threshold: f64,
    /// Core metrics (of 4) that must be consistent at once.
    pub multi_metric_required: usize,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_size: 100,
            min_samples: 25,
            window_ms: 20 * 60 * 1000,
            accuracy_variance: 0.0004,
            reaction_variance: 25.0,
            kdr_variance: 0.01,
            headshot_variance: 0.0004,
            aim_precision_variance: 0.0004,
            composite_threshold: 0.6,
            autocorrelation_threshold: 0.8,
            min_lag: 2,
            max_lag: 10,
            entropy_buckets: 20,
            entropy_threshold: 0.25,
            multi_metric_required: 3,
        }
    }
}

impl ConsistencyConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_nonzero("statistical.consistency.min_samples", self.min_samples)?;
        check_unit("statistical.consistency.composite_threshold", self.composite_threshold)?;
        check_unit(
            "statistical.consistency.autocorrelation_threshold",
            self.autocorrelation_threshold,
        )?;
        check_unit("statistical.consistency.entropy_threshold", self.entropy_threshold)?;
        if self.history_size < self.min_samples {
            return Err(invalid(
                "statistical.consistency.history_size",
                "must be at least min_samples",
            ));
        }
        if self.min_lag == 0 || self.min_lag > self.max_lag {
            return Err(invalid("statistical.consistency.min_lag", "must satisfy 0 < min_lag <= max_lag"));
        }
        if self.entropy_buckets < 2 {
            return Err(invalid("statistical.consistency.entropy_buckets", "must be at least 2"));
        }
        if self.multi_metric_required == 0 || self.multi_metric_required > 4 {
            return Err(invalid(
                "statistical.consistency.multi_metric_required",
                "must be within 1..=4",
            ));
        }
        Ok(())
    }
}

/// Outlier analyzer tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Analyzer switch.
    pub enabled: bool,
    /// Population EMA weight. Small enough that one player cannot move it.
    pub population_alpha: f64,
    /// |z| that makes a metric an outlier.
    pub outlier_sigma: f64,
    /// |z| that makes a metric an extreme outlier.
    pub extreme_sigma: f64,
    /// Outlier metrics needed for a multi-metric flag.
    pub min_outlier_metrics: usize,
    /// Composite score that fires.
    pub composite_threshold: f64,
    /// Outlier flags kept per player.
    pub history_size: usize,
    /// Fraction of outlier samples that makes a consistent outlier.
    pub consistent_fraction: f64,
    /// Samples needed before consistency is judged.
    pub consistent_min_samples: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            population_alpha: 0.01,
            outlier_sigma: 3.0,
            extreme_sigma: 4.0,
            min_outlier_metrics: 2,
            composite_threshold: 1.2,
            history_size: 10,
            consistent_fraction: 0.7,
            consistent_min_samples: 5,
        }
    }
}

impl OutlierConfig {
    fn validate(&self) -> SecurityResult<()> {
        check_alpha("statistical.outlier.population_alpha", self.population_alpha)?;
        check_positive("statistical.outlier.outlier_sigma", self.outlier_sigma)?;
        check_unit("statistical.outlier.consistent_fraction", self.consistent_fraction)?;
        check_nonzero("statistical.outlier.history_size", self.history_size)?;
        if self.extreme_sigma <= self.outlier_sigma {
            return Err(invalid(
                "statistical.outlier.extreme_sigma",
                "must exceed outlier_sigma",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DetectionConfig::default().is_valid());
    }

    #[test]
    fn test_rejects_bad_confidence() {
        let mut config = DetectionConfig::default();
        config.realtime.min_confidence = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SecurityError::InvalidConfig(ref msg) if msg.contains("min_confidence")));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = DetectionConfig::default();
        config.statistical.accuracy.suspicious = 0.97;
        assert!(!config.is_valid());

        let mut config = DetectionConfig::default();
        config.statistical.outlier.extreme_sigma = 2.0;
        assert!(!config.is_valid());

        let mut config = DetectionConfig::default();
        config.realtime.speed_hack.acceleration_window_ms = 5;
        assert!(!config.is_valid());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = DetectionConfig::default();
        config.service.worker_count = 0;
        assert!(!config.is_valid());
    }
}
