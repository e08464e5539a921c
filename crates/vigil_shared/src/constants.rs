//! Shared constants.

/// Milliseconds in one second.
pub const MILLIS_PER_SECOND: f64 = 1000.0;

/// Default idle time after which per-player state is evicted (30 minutes).
pub const DEFAULT_PROFILE_TTL_MS: u64 = 30 * 60 * 1000;

/// Default cap on concurrently tracked players.
pub const DEFAULT_MAX_PROFILES: usize = 1000;

/// Default worker pool size.
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Metadata key: player is sprinting.
pub const META_SPRINTING: &str = "sprinting";

/// Metadata key: crosshair is on a target (aim sample "is targeting").
pub const META_ON_TARGET: &str = "on_target";

/// Metadata key: shooter had line of sight to the victim.
pub const META_LINE_OF_SIGHT: &str = "line_of_sight";

/// Metadata key: measured reaction time in milliseconds.
pub const META_REACTION_TIME_MS: &str = "reaction_time_ms";

/// Metadata key: uncompensated recoil after a shot, in degrees.
pub const META_RECOIL_RESIDUAL: &str = "recoil_residual";
