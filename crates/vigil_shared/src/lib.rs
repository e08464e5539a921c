//! # VIGIL Shared
//!
//! Input vocabulary and numeric toolkit for the cheat-detection core.
//!
//! ## Contents
//!
//! - **Inputs**: [`PlayerAction`] events and [`PlayerStatistics`] snapshots
//! - **Geometry**: [`Vec3`] positions and [`ViewAngle`] aim directions
//! - **Windows**: [`BoundedWindow`] FIFO rings and [`Ema`] smoothing
//! - **Series math**: variance, slope, correlation, autocorrelation, entropy
//! - **Time**: [`Clock`] with a wall-clock and a manually driven source
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on locks, threads or logging. Everything
//! in here is a pure function of its inputs.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod action;
pub mod constants;
pub mod math;
pub mod series;
pub mod stats;
pub mod time;
pub mod window;

pub use action::{ActionType, MetaValue, Metadata, PlayerAction, PlayerId};
pub use math::{Vec3, ViewAngle};
pub use stats::{PlayerStatistics, StatMetric};
pub use time::{Clock, ManualClock, SystemClock};
pub use window::{BoundedWindow, Ema};
