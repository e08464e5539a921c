//! # VIGIL Security - The Detection Core
//!
//! Server-side cheat detection over player actions and periodic
//! statistics snapshots.
//!
//! ## Features
//!
//! - **Real-Time Detection**: Aimbot, speedhack, triggerbot, no-recoil, ESP
//! - **Statistical Analysis**: Accuracy, headshots, performance,
//!   consistency and population outliers
//! - **Verdicts**: Confidence-scored evidence with a recommended action
//! - **Worker Pool**: Per-player FIFO routing across threads
//!
//! ## Architecture
//!
//! ```text
//! GAME SESSION                          DETECTION CORE
//!     │                                       │
//!     │─── PlayerAction ─────────────────────►│ RealtimeCheatDetector
//!     │─── PlayerStatistics ─────────────────►│ StatisticalAnalysisEngine
//!     │                                       │
//!     │                                       ▼
//!     │                              ┌──────────────────┐
//!     │                              │ PlayerRegistry   │
//!     │                              │ (sharded, TTL)   │
//!     │                              └──────────────────┘
//!     │                                       │
//!     │◄─── Verdict (to_map) ─────────────────┤ Moderation
//!     │                                       │
//! ```
//!
//! ## CRITICAL RULE
//!
//! Detection never crashes the host. Missing data is "no signal" and an
//! internal fault becomes one `SYSTEM_ERROR` item on the verdict.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod check;
pub mod config;
pub mod error;
pub mod evidence;
mod guard;
pub mod realtime;
pub mod registry;
pub mod service;
pub mod statistical;
pub mod verdict;

pub use check::CheckOutcome;
pub use config::{AdmissionPolicy, DetectionConfig, RealtimeConfig, RegistryConfig, ServiceConfig, StatisticalConfig};
pub use error::{SecurityError, SecurityResult};
pub use evidence::{CheatDetection, Priority, StatisticalViolation, StatisticalViolationType, ViolationType};
pub use realtime::{RealtimeCheatDetector, RealtimeStatistics};
pub use service::{DetectionService, MaintenanceReport, ServiceStatistics};
pub use statistical::{PopulationStatistics, StatisticalAnalysisEngine, StatisticalEngineStatistics};
pub use verdict::{RealtimeDetectionResult, RecommendedAction, StatisticalAnalysisResult};
