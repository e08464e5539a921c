//! # Session Analyzer
//!
//! Command-line tool that runs a recorded session through the detection
//! service and prints a verdict per player.
//!
//! Input is JSON lines, one record per line:
//!
//! ```text
//! {"action": { "player_id": 7, "action_type": "Aim", ... }}
//! {"statistics": { "player_id": 7, "average_accuracy": 0.31, ... }}
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process::ExitCode;

use serde::Deserialize;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use vigil_security::{
    DetectionConfig, DetectionService, RealtimeDetectionResult, RecommendedAction, StatisticalAnalysisResult,
};
use vigil_shared::{PlayerAction, PlayerId, PlayerStatistics};

/// One line of a session recording.
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum SessionRecord {
    Action(PlayerAction),
    Statistics(PlayerStatistics),
}

enum Pending {
    Action(oneshot::Receiver<RealtimeDetectionResult>),
    Statistics(oneshot::Receiver<StatisticalAnalysisResult>),
}

/// Per-player tally over the whole session.
#[derive(Default)]
struct PlayerSummary {
    actions: usize,
    snapshots: usize,
    detections: usize,
    violations: usize,
    anomaly_level: f64,
    worst: Option<RecommendedAction>,
    flagged: Vec<String>,
}

impl PlayerSummary {
    fn escalate(&mut self, action: RecommendedAction) {
        self.worst = Some(self.worst.map_or(action, |worst| worst.max(action)));
    }

    fn add_action(&mut self, result: &RealtimeDetectionResult) {
        self.actions += 1;
        self.detections += result.detections.len();
        if result.action_required() {
            self.escalate(result.recommended_action());
        }
        if let Some(top) = result.top_detection() {
            self.flagged.push(format!(
                "t={} {} ({:.0}%) {}",
                result.timestamp_ms,
                top.violation_type.as_str(),
                top.confidence * 100.0,
                top.description
            ));
        }
    }

    fn add_snapshot(&mut self, result: &StatisticalAnalysisResult) {
        self.snapshots += 1;
        self.violations += result.violations.len();
        self.anomaly_level = result.anomaly_level;
        if result.action_required() {
            self.escalate(result.recommended_action());
        }
        if let Some(top) = result.violations.first() {
            self.flagged.push(format!(
                "t={} {} ({:.0}%) {}",
                result.timestamp_ms,
                top.violation_type.as_str(),
                top.confidence * 100.0,
                top.description
            ));
        }
    }
}

struct Options {
    session: String,
    config: Option<String>,
    verbose: bool,
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .cloned();
    let session = args
        .iter()
        .enumerate()
        .find(|(i, a)| !a.starts_with("--") && (*i == 0 || args[*i - 1] != "--config"))
        .map(|(_, a)| a.clone())?;
    Some(Options {
        session,
        config,
        verbose: args.iter().any(|a| a == "--verbose"),
    })
}

fn load_config(path: Option<&str>) -> Result<DetectionConfig, String> {
    let Some(path) = path else {
        return Ok(DetectionConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| format!("could not read {path}: {e}"))?;
    toml::from_str(&text).map_err(|e| format!("could not parse {path}: {e}"))
}

fn run(options: &Options) -> Result<BTreeMap<PlayerId, PlayerSummary>, String> {
    let config = load_config(options.config.as_deref())?;
    let service = DetectionService::new(config).map_err(|e| e.to_string())?;

    let file = File::open(&options.session).map_err(|e| format!("could not open {}: {e}", options.session))?;
    let mut pending = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| format!("read failed at line {}: {e}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SessionRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line = number + 1, "skipping malformed record: {}", e);
                continue;
            }
        };
        let submitted = match record {
            SessionRecord::Action(action) => service.submit_action(action).map(Pending::Action),
            SessionRecord::Statistics(stats) => service
                .submit_statistics(stats.player_id, stats)
                .map(Pending::Statistics),
        };
        pending.push(submitted.map_err(|e| e.to_string())?);
    }

    let mut players: BTreeMap<PlayerId, PlayerSummary> = BTreeMap::new();
    for job in pending {
        match job {
            Pending::Action(receiver) => {
                let result = receiver.blocking_recv().map_err(|e| e.to_string())?;
                players.entry(result.player_id).or_default().add_action(&result);
            }
            Pending::Statistics(receiver) => {
                let result = receiver.blocking_recv().map_err(|e| e.to_string())?;
                players.entry(result.player_id).or_default().add_snapshot(&result);
            }
        }
    }

    if options.verbose {
        match serde_json::to_string_pretty(&service.statistics()) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!("could not render statistics: {}", e),
        }
    }
    service.shutdown();
    Ok(players)
}

fn print_report(players: &BTreeMap<PlayerId, PlayerSummary>, verbose: bool) -> usize {
    println!("┌─ SESSION VERDICTS ─────────────────────────────────────────────┐");
    let mut actionable = 0;
    for (player_id, summary) in players {
        println!(
            "│ Player {player_id}: {} actions, {} snapshots, {} detections, {} violations, anomaly {:.2}",
            summary.actions, summary.snapshots, summary.detections, summary.violations, summary.anomaly_level
        );
        if let Some(worst) = summary.worst {
            actionable += 1;
            println!("│   ⚠ action required: {worst}");
        }
        let shown = if verbose { summary.flagged.len() } else { summary.flagged.len().min(3) };
        for line in summary.flagged.iter().take(shown) {
            println!("│     - {line}");
        }
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    actionable
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let Some(options) = parse_args() else {
        println!("Usage: session_analyzer <session.jsonl> [--config <file.toml>] [--verbose]");
        return ExitCode::from(2);
    };

    match run(&options) {
        Ok(players) => {
            let actionable = print_report(&players, options.verbose);
            if actionable == 0 {
                println!("✓ No cheating detected");
            } else {
                println!("⚠ {actionable} players need review");
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}
