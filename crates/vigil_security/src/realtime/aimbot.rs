//! # Aimbot Detection
//!
//! Works on the aim trajectory built from AIM and SHOOT actions.
//!
//! ## Checks
//!
//! - **Snap-to-target**: a flick above the snap speed, then a shot within
//!   a short window
//! - **Inhuman smoothness**: mean |jerk| below a floor while turning
//! - **Perfect tracking**: on-target samples locked in a narrow speed band,
//!   sustained across several evaluations
//! - **Inhuman precision**: most of the last five deltas identical
//! - **Impossible speed**: an angular speed no wrist produces

use vigil_shared::constants::{META_ON_TARGET, MILLIS_PER_SECOND};
use vigil_shared::series::mean;
use vigil_shared::{ActionType, BoundedWindow, PlayerAction, ViewAngle};

use crate::check::{collect_flagged, CheckOutcome};
use super::profile::PlayerRealtimeProfile;
use super::RealtimeDetector;
use crate::config::AimbotConfig;
use crate::evidence::{CheatDetection, ViolationType};

/// Detector name carried on its detections.
pub const AIMBOT_DETECTOR: &str = "AimbotDetector";

/// One point on the aim trajectory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimbotSample {
    /// View angle.
    pub angle: ViewAngle,
    /// Angular distance from the previous sample (deg).
    pub delta: f64,
    /// Angular speed since the previous sample (deg/s).
    pub speed: f64,
    /// Action time (ms).
    pub timestamp_ms: u64,
    /// The action was a shot.
    pub is_shooting: bool,
    /// The crosshair was on a target.
    pub is_targeting: bool,
}

/// Private aimbot history for one player.
#[derive(Clone, Debug)]
pub struct AimbotProfile {
    samples: BoundedWindow<AimbotSample>,
    last_angle: Option<(ViewAngle, u64)>,
    last_snap: Option<(u64, f64)>,
    tracking_hits: u32,
}

impl AimbotProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &AimbotConfig) -> Self {
        Self {
            samples: BoundedWindow::new(config.history_size),
            last_angle: None,
            last_snap: None,
            tracking_hits: 0,
        }
    }

    /// Trajectory samples, oldest first.
    #[must_use]
    pub fn samples(&self) -> &BoundedWindow<AimbotSample> {
        &self.samples
    }

    /// Current value of the decaying tracking counter.
    #[must_use]
    pub const fn tracking_hits(&self) -> u32 {
        self.tracking_hits
    }
}

/// Aimbot detector.
#[derive(Clone, Debug, Default)]
pub struct AimbotDetector {
    config: AimbotConfig,
}

impl AimbotDetector {
    /// Creates a detector.
    #[must_use]
    pub fn new(config: AimbotConfig) -> Self {
        Self { config }
    }

    /// Appends a sample for the action. `None` if there is nothing to
    /// measure against yet or time did not move forward.
    fn record(&self, action: &PlayerAction, state: &mut AimbotProfile) -> Option<AimbotSample> {
        let angle = action.view_angle;
        let ts = action.timestamp_ms;
        let previous = state.last_angle.replace((angle, ts));
        let (last_angle, last_ts) = previous?;
        if ts <= last_ts {
            // Same instant: keep the older reference point.
            state.last_angle = Some((last_angle, last_ts));
            return None;
        }

        let delta = angle.delta(last_angle);
        let dt = (ts - last_ts) as f64 / MILLIS_PER_SECOND;
        let sample = AimbotSample {
            angle,
            delta,
            speed: delta / dt,
            timestamp_ms: ts,
            is_shooting: action.is_shot(),
            is_targeting: action.meta_bool(META_ON_TARGET).unwrap_or(false),
        };
        state.samples.push(sample);
        Some(sample)
    }

    fn check_snap(
        &self,
        action: &PlayerAction,
        sample: Option<AimbotSample>,
        state: &mut AimbotProfile,
    ) -> CheckOutcome {
        if let Some(s) = sample.filter(|s| s.speed > self.config.snap_speed_threshold) {
            state.last_snap = Some((s.timestamp_ms, s.speed));
        }
        if !action.is_shot() {
            return CheckOutcome::NoSignal;
        }
        let Some((snap_ts, snap_speed)) = state.last_snap else {
            return CheckOutcome::Clear;
        };
        let Some(gap) = action.timestamp_ms.checked_sub(snap_ts) else {
            return CheckOutcome::NoSignal;
        };
        if gap > self.config.snap_shot_window_ms {
            state.last_snap = None;
            return CheckOutcome::Clear;
        }

        state.last_snap = None;
        let threshold = self.config.snap_speed_threshold;
        let excess = ((snap_speed - threshold) / threshold).min(1.0);
        let window = self.config.snap_shot_window_ms.max(1) as f64;
        let promptness = 1.0 - gap as f64 / window;
        let confidence = 0.6 + 0.3 * excess + 0.1 * promptness;
        CheckOutcome::Flagged(
            CheatDetection::new(
                ViolationType::Aimbot,
                AIMBOT_DETECTOR,
                confidence,
                "Snap to target followed by an immediate shot",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "Snap at {snap_speed:.0} deg/s, shot {gap} ms later"
            ))
            .with_meta("snap_speed", snap_speed)
            .with_meta("shot_delay_ms", gap as f64),
        )
    }

    fn check_smoothness(&self, ts: u64, state: &AimbotProfile) -> CheckOutcome {
        let samples: Vec<&AimbotSample> = state.samples.iter().collect();
        if samples.len() < self.config.smoothness_min_samples {
            return CheckOutcome::NoSignal;
        }
        let speeds: Vec<f64> = samples.iter().map(|s| s.speed).collect();
        let mean_speed = mean(&speeds).unwrap_or(0.0);
        if mean_speed < self.config.smoothness_min_speed {
            return CheckOutcome::NoSignal;
        }

        let mut accelerations = Vec::with_capacity(samples.len());
        for pair in samples.windows(2) {
            let dt = (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64 / MILLIS_PER_SECOND;
            if dt > 0.0 {
                accelerations.push(((pair[1].speed - pair[0].speed) / dt, pair[1].timestamp_ms));
            }
        }
        let mut jerks = Vec::with_capacity(accelerations.len());
        for pair in accelerations.windows(2) {
            let dt = (pair[1].1 - pair[0].1) as f64 / MILLIS_PER_SECOND;
            if dt > 0.0 {
                jerks.push(((pair[1].0 - pair[0].0) / dt).abs());
            }
        }
        let Some(mean_jerk) = mean(&jerks) else {
            return CheckOutcome::NoSignal;
        };

        let floor = self.config.jerk_floor;
        CheckOutcome::flag_if(mean_jerk < floor, || {
            let smoothness = 1.0 / (1.0 + mean_jerk);
            let confidence = 0.5 + 0.4 * (1.0 - mean_jerk / floor);
            CheatDetection::new(
                ViolationType::Aimbot,
                AIMBOT_DETECTOR,
                confidence,
                "Inhumanly smooth aim movement",
                ts,
            )
            .with_evidence(format!(
                "Mean jerk {mean_jerk:.1} deg/s^3 at {mean_speed:.0} deg/s (smoothness {smoothness:.3})"
            ))
            .with_meta("mean_jerk", mean_jerk)
            .with_meta("smoothness", smoothness)
        })
    }

    fn check_tracking(&self, ts: u64, sample: Option<AimbotSample>, state: &mut AimbotProfile) -> CheckOutcome {
        if !sample.is_some_and(|s| s.is_targeting) {
            return CheckOutcome::NoSignal;
        }
        let speeds: Vec<f64> = state
            .samples
            .iter()
            .filter(|s| s.is_targeting)
            .map(|s| s.speed)
            .collect();
        if speeds.len() < self.config.tracking_min_samples {
            return CheckOutcome::NoSignal;
        }
        let mean_speed = mean(&speeds).unwrap_or(0.0);
        if mean_speed < self.config.tracking_min_speed {
            return CheckOutcome::NoSignal;
        }

        let band = mean_speed * self.config.tracking_band;
        let in_band = speeds.iter().filter(|s| (*s - mean_speed).abs() <= band).count();
        let fraction = in_band as f64 / speeds.len() as f64;
        if fraction >= self.config.tracking_fraction {
            state.tracking_hits += 1;
        } else {
            state.tracking_hits = state.tracking_hits.saturating_sub(1);
        }

        let hits = state.tracking_hits;
        CheckOutcome::flag_if(hits >= self.config.tracking_hits_required, || {
            let confidence = (0.5 + 0.1 * f64::from(hits)).min(0.9);
            CheatDetection::new(
                ViolationType::Aimbot,
                AIMBOT_DETECTOR,
                confidence,
                "Perfect target tracking",
                ts,
            )
            .with_evidence(format!(
                "{:.0}% of on-target samples within {:.0}% of {mean_speed:.1} deg/s",
                fraction * 100.0,
                self.config.tracking_band * 100.0
            ))
            .with_meta("tracking_fraction", fraction)
            .with_meta("tracking_hits", f64::from(hits))
        })
    }

    fn check_precision(&self, ts: u64, sample: Option<AimbotSample>, state: &AimbotProfile) -> CheckOutcome {
        let min_delta = self.config.precision_min_delta_deg;
        if !sample.is_some_and(|s| s.delta >= min_delta) || state.samples.len() < 5 {
            return CheckOutcome::NoSignal;
        }
        let deltas: Vec<f64> = state.samples.recent(5).map(|s| s.delta).collect();
        if deltas.iter().any(|d| *d < min_delta) {
            return CheckOutcome::NoSignal;
        }

        let tolerance = self.config.precision_tolerance_deg;
        let matches = deltas
            .iter()
            .map(|a| deltas.iter().filter(|b| (*b - a).abs() <= tolerance).count())
            .max()
            .unwrap_or(0);

        CheckOutcome::flag_if(matches >= self.config.precision_matches, || {
            let confidence = 0.4 + 0.1 * matches as f64;
            CheatDetection::new(
                ViolationType::Aimbot,
                AIMBOT_DETECTOR,
                confidence,
                "Inhumanly precise aim adjustments",
                ts,
            )
            .with_evidence(format!(
                "{matches} of the last 5 deltas within {tolerance} deg of each other"
            ))
            .with_meta("identical_deltas", matches as f64)
        })
    }

    fn check_impossible_speed(&self, sample: Option<AimbotSample>) -> CheckOutcome {
        let Some(sample) = sample else {
            return CheckOutcome::NoSignal;
        };
        let limit = self.config.impossible_angular_speed;
        CheckOutcome::flag_if(sample.speed > limit, || {
            let excess = ((sample.speed - limit) / limit).min(1.0);
            CheatDetection::new(
                ViolationType::Aimbot,
                AIMBOT_DETECTOR,
                0.85 + 0.15 * excess,
                "Impossible angular speed",
                sample.timestamp_ms,
            )
            .with_evidence(format!(
                "{:.0} deg/s exceeds {limit:.0} deg/s",
                sample.speed
            ))
            .with_meta("angular_speed", sample.speed)
        })
    }
}

impl RealtimeDetector for AimbotDetector {
    type Profile = AimbotProfile;

    fn name(&self) -> &'static str {
        AIMBOT_DETECTOR
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> AimbotProfile {
        AimbotProfile::new(&self.config)
    }

    fn detect(
        &self,
        action: &PlayerAction,
        _profile: &PlayerRealtimeProfile,
        state: &mut AimbotProfile,
    ) -> Vec<CheatDetection> {
        if !matches!(action.action_type, ActionType::Aim | ActionType::Shoot) {
            return Vec::new();
        }
        let ts = action.timestamp_ms;
        let sample = self.record(action, state);

        collect_flagged([
            self.check_snap(action, sample, state),
            self.check_smoothness(ts, state),
            self.check_tracking(ts, sample, state),
            self.check_precision(ts, sample, state),
            self.check_impossible_speed(sample),
        ])
    }
}
