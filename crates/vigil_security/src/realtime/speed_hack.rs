//! # Speed-Hack Detection
//!
//! Works on the position trail of every action.
//!
//! ```text
//!   pos(t-1) ──── distance / dt ────► pos(t)
//!        │                               │
//!        ├─ distance > teleport cap, dt ≤ window  → Teleportation
//!        ├─ speed > cap × tolerance                → Speed over cap
//!        ├─ |Δspeed| / span > acceleration cap    → Impossible acceleration
//!        └─ > half of the last N samples over cap  → Sustained violation
//! ```
//!
//! Speed is only measured across gaps of at least `min_sample_interval_ms`;
//! shorter gaps amplify position jitter into nonsense. Acceleration compares
//! against the newest sample at least `acceleration_window_ms` older, so a
//! legal stop at a 16 ms tick spreads over the whole window.

use vigil_shared::constants::{META_SPRINTING, MILLIS_PER_SECOND};
use vigil_shared::{BoundedWindow, PlayerAction, Vec3};

use crate::check::{collect_flagged, CheckOutcome};
use super::profile::PlayerRealtimeProfile;
use super::RealtimeDetector;
use crate::config::SpeedHackConfig;
use crate::evidence::{CheatDetection, ViolationType};

/// Detector name carried on its detections.
pub const SPEED_HACK_DETECTOR: &str = "SpeedHackDetector";

/// One measured movement step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementSample {
    /// Position at the end of the step.
    pub position: Vec3,
    /// Step end time (ms).
    pub timestamp_ms: u64,
    /// Speed over the step (u/s).
    pub speed: f64,
    /// Cap that applied (u/s, tolerance included).
    pub cap: f64,
}

impl MovementSample {
    /// Returns true if the step broke its cap.
    #[must_use]
    pub fn over_cap(&self) -> bool {
        self.speed > self.cap
    }
}

/// Private movement history for one player.
#[derive(Clone, Debug)]
pub struct SpeedProfile {
    samples: BoundedWindow<MovementSample>,
    last_position: Option<(Vec3, u64)>,
}

impl SpeedProfile {
    /// Creates an empty history.
    #[must_use]
    pub fn new(config: &SpeedHackConfig) -> Self {
        Self {
            samples: BoundedWindow::new(config.history_size),
            last_position: None,
        }
    }

    /// Measured steps, oldest first.
    #[must_use]
    pub fn samples(&self) -> &BoundedWindow<MovementSample> {
        &self.samples
    }
}

/// Step between the previous and current position.
struct Step {
    distance: f64,
    dt_ms: u64,
    from: Vec3,
}

/// Speed-hack detector.
#[derive(Clone, Debug, Default)]
pub struct SpeedHackDetector {
    config: SpeedHackConfig,
}

impl SpeedHackDetector {
    /// Creates a detector.
    #[must_use]
    pub fn new(config: SpeedHackConfig) -> Self {
        Self { config }
    }

    fn speed_cap(&self, action: &PlayerAction) -> f64 {
        let base = if action.meta_bool(META_SPRINTING).unwrap_or(false) {
            self.config.max_sprint_speed
        } else {
            self.config.max_walk_speed
        };
        base * self.config.speed_tolerance
    }

    fn check_teleport(&self, action: &PlayerAction, step: &Step) -> CheckOutcome {
        if step.dt_ms > self.config.teleport_window_ms {
            return CheckOutcome::Clear;
        }
        let limit = self.config.teleport_distance;
        CheckOutcome::flag_if(step.distance > limit, || {
            let excess = ((step.distance - limit) / limit).min(1.0);
            CheatDetection::new(
                ViolationType::SpeedHack,
                SPEED_HACK_DETECTOR,
                0.7 + 0.3 * excess,
                "Position jump without valid movement",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "Teleportation: {:.1} units in {} ms from ({:.1}, {:.1}, {:.1})",
                step.distance, step.dt_ms, step.from.x, step.from.y, step.from.z
            ))
            .with_meta("distance", step.distance)
            .with_meta("elapsed_ms", step.dt_ms as f64)
        })
    }

    fn check_speed(&self, action: &PlayerAction, sample: &MovementSample) -> CheckOutcome {
        CheckOutcome::flag_if(sample.over_cap(), || {
            let excess = ((sample.speed - sample.cap) / sample.cap).min(1.0);
            CheatDetection::new(
                ViolationType::SpeedHack,
                SPEED_HACK_DETECTOR,
                0.4 + 0.5 * excess,
                "Movement speed over cap",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "Speed {:.2} u/s exceeds cap {:.2} u/s",
                sample.speed, sample.cap
            ))
            .with_meta("speed", sample.speed)
            .with_meta("cap", sample.cap)
        })
    }

    fn check_acceleration(
        &self,
        action: &PlayerAction,
        state: &SpeedProfile,
        sample: &MovementSample,
    ) -> CheckOutcome {
        let window = self.config.acceleration_window_ms;
        let reference = state
            .samples
            .iter()
            .rev()
            .find(|s| s.timestamp_ms.saturating_add(window) <= sample.timestamp_ms);
        let Some(reference) = reference else {
            return CheckOutcome::NoSignal;
        };
        let span_ms = sample.timestamp_ms - reference.timestamp_ms;
        let dt = span_ms as f64 / MILLIS_PER_SECOND;
        let acceleration = (sample.speed - reference.speed).abs() / dt;
        let cap = self.config.max_acceleration;
        CheckOutcome::flag_if(acceleration > cap, || {
            let excess = ((acceleration - cap) / cap).min(1.0);
            CheatDetection::new(
                ViolationType::SpeedHack,
                SPEED_HACK_DETECTOR,
                0.4 + 0.4 * excess,
                "Impossible acceleration",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "Acceleration {acceleration:.1} u/s^2 over {span_ms} ms exceeds {cap:.1} u/s^2"
            ))
            .with_meta("acceleration", acceleration)
            .with_meta("span_ms", span_ms as f64)
        })
    }

    fn check_sustained(&self, action: &PlayerAction, state: &SpeedProfile) -> CheckOutcome {
        let recent: Vec<&MovementSample> = state.samples.recent(self.config.sustained_window).collect();
        if recent.len() < self.config.sustained_min_samples {
            return CheckOutcome::NoSignal;
        }
        let over = recent.iter().filter(|s| s.over_cap()).count();
        let fraction = over as f64 / recent.len() as f64;
        let threshold = self.config.sustained_fraction;
        CheckOutcome::flag_if(fraction > threshold, || {
            let span = (1.0 - threshold).max(f64::EPSILON);
            let confidence = 0.5 + 0.4 * ((fraction - threshold) / span);
            CheatDetection::new(
                ViolationType::SpeedHack,
                SPEED_HACK_DETECTOR,
                confidence,
                "Sustained speed violation",
                action.timestamp_ms,
            )
            .with_evidence(format!(
                "{over} of the last {} samples over cap",
                recent.len()
            ))
            .with_meta("over_cap_fraction", fraction)
        })
    }
}

impl RealtimeDetector for SpeedHackDetector {
    type Profile = SpeedProfile;

    fn name(&self) -> &'static str {
        SPEED_HACK_DETECTOR
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn new_profile(&self) -> SpeedProfile {
        SpeedProfile::new(&self.config)
    }

    fn detect(
        &self,
        action: &PlayerAction,
        _profile: &PlayerRealtimeProfile,
        state: &mut SpeedProfile,
    ) -> Vec<CheatDetection> {
        let position = action.position;
        let ts = action.timestamp_ms;
        if !position.is_finite() {
            return Vec::new();
        }
        let Some((from, last_ts)) = state.last_position else {
            state.last_position = Some((position, ts));
            return Vec::new();
        };
        if ts <= last_ts {
            return Vec::new();
        }

        let step = Step {
            distance: position.distance(from),
            dt_ms: ts - last_ts,
            from,
        };
        let mut outcomes = vec![self.check_teleport(action, &step)];

        // Too-short gaps only feed the teleport check; the reference point
        // stays put so the next gap is measured from it.
        if step.dt_ms < self.config.min_sample_interval_ms {
            return collect_flagged(outcomes);
        }
        state.last_position = Some((position, ts));

        let sample = MovementSample {
            position,
            timestamp_ms: ts,
            speed: step.distance / (step.dt_ms as f64 / MILLIS_PER_SECOND),
            cap: self.speed_cap(action),
        };
        outcomes.push(self.check_acceleration(action, state, &sample));
        state.samples.push(sample);

        outcomes.push(self.check_speed(action, &sample));
        outcomes.push(self.check_sustained(action, state));
        collect_flagged(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RealtimeProfileConfig;
    use vigil_shared::{ActionType, MetaValue, ViewAngle};

    fn step(ts: u64, x: f64) -> PlayerAction {
        PlayerAction::new(1, ActionType::Move, ts, Vec3::new(x, 0.0, 0.0), ViewAngle::default())
    }

    fn run(detector: &SpeedHackDetector, state: &mut SpeedProfile, a: &PlayerAction) -> Vec<CheatDetection> {
        let profile = PlayerRealtimeProfile::new(1, &RealtimeProfileConfig::default(), 0);
        detector.detect(a, &profile, state)
    }

    #[test]
    fn test_teleport() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        run(&detector, &mut state, &step(1_000, 0.0));
        let found = run(&detector, &mut state, &step(1_040, 100.0));
        let teleport = found
            .iter()
            .find(|d| d.evidence.as_deref().is_some_and(|e| e.contains("Teleportation")))
            .expect("teleport detection");
        assert_eq!(teleport.violation_type, ViolationType::SpeedHack);
        assert!(teleport.confidence > 0.9);
    }

    #[test]
    fn test_walking_is_clear() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        for i in 0..50u64 {
            let found = run(&detector, &mut state, &step(i * 100, i as f64 * 0.5));
            assert!(found.is_empty(), "flagged at step {i}: {found:?}");
        }
    }

    #[test]
    fn test_sprint_cap_from_metadata() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        run(&detector, &mut state, &step(0, 0.0).with_meta(META_SPRINTING, true));
        // 8.5 u/s: over the walk cap, under the sprint cap.
        let found = run(
            &detector,
            &mut state,
            &step(1_000, 8.5).with_meta(META_SPRINTING, true),
        );
        assert!(found.iter().all(|d| !d.description.contains("over cap")));

        let mut state = detector.new_profile();
        run(&detector, &mut state, &step(0, 0.0));
        let found = run(&detector, &mut state, &step(1_000, 8.5));
        assert!(found.iter().any(|d| d.description.contains("over cap")));
    }

    #[test]
    fn test_sustained_violation() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        let mut last = Vec::new();
        for i in 0..=12u64 {
            // 8 u/s in straight line, every 250 ms.
            last = run(&detector, &mut state, &step(i * 250, i as f64 * 2.0));
        }
        assert!(last.iter().any(|d| d.description.contains("Sustained")));
    }

    #[test]
    fn test_sudden_acceleration() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        for i in 0..=4u64 {
            run(&detector, &mut state, &step(i * 50, 0.0));
        }
        // Standing still at 150 ms, 40 u/s at 250 ms: 400 u/s^2 over 100 ms.
        let found = run(&detector, &mut state, &step(250, 2.0));
        let accel = found
            .iter()
            .find(|d| d.description.contains("acceleration"))
            .unwrap_or_else(|| panic!("no acceleration detection: {found:?}"));
        assert_eq!(accel.metadata.get("span_ms"), Some(&MetaValue::Number(100.0)));
    }

    #[test]
    fn test_tick_rate_stop_and_start_is_clear() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        let mut ts = 0;
        let mut x = 0.0;
        // 60 Hz: walk at 5 u/s, stop dead, then walk again.
        for phase in [0.08, 0.0, 0.08, 0.0] {
            for _ in 0..20 {
                ts += 16;
                x += phase;
                let found = run(&detector, &mut state, &step(ts, x));
                assert!(found.is_empty(), "tick at {ts} ms: {found:?}");
            }
        }
        assert_eq!(state.samples().len(), 50);
    }

    #[test]
    fn test_short_gap_keeps_reference_point() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        run(&detector, &mut state, &step(0, 0.0));
        run(&detector, &mut state, &step(5, 0.01));
        assert!(state.samples().is_empty());
        run(&detector, &mut state, &step(100, 0.5));
        assert_eq!(state.samples().len(), 1);
        assert!((state.samples().last().map_or(0.0, |s| s.speed) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dt_is_no_signal() {
        let detector = SpeedHackDetector::default();
        let mut state = detector.new_profile();
        run(&detector, &mut state, &step(10, 0.0));
        assert!(run(&detector, &mut state, &step(10, 500.0)).is_empty());
    }
}
