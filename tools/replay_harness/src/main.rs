use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use zone_core::{
    DecisionEngine, EngineConfig, Position, TeamId, TurnMetrics, ZoneCommitment,
};
use zone_protocol::read_dump;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replays a captured zone-control turn through the decision engine", long_about = None)]
struct Args {
    /// Dump file holding the setup and one turn, as printed by `zone_bot --dump`
    dump: PathBuf,

    /// Engine config JSON (defaults to the builtin copy)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Search deadline (milliseconds); overrides the config
    #[arg(long, conflicts_with = "unbounded")]
    deadline_ms: Option<u64>,

    /// Search without a deadline
    #[arg(long)]
    unbounded: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    my_team: TeamId,
    deadline_ms: Option<u64>,
    targets: &'a [Position],
    commitments: &'a [ZoneCommitment],
    score: f64,
    nodes: u64,
    width: usize,
    metrics: &'a TurnMetrics,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let text = fs::read_to_string(&args.dump)
        .with_context(|| format!("Failed to read dump at {}", args.dump.display()))?;
    let (setup, turn) = read_dump(&text)
        .with_context(|| format!("Failed to parse dump at {}", args.dump.display()))?;

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load engine config {}", path.display()))?,
        None => EngineConfig::builtin(),
    };
    let deadline = if args.unbounded {
        None
    } else {
        Some(
            args.deadline_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.search.deadline()),
        )
    };

    let mut engine = DecisionEngine::new(&setup, config)
        .context("Dump describes an unsupported game")?
        .with_deadline(deadline);
    let width = engine.width();
    let decision = engine
        .decide(&turn)
        .context("Dump turn does not match its setup")?;

    let report = Report {
        my_team: setup.my_team,
        deadline_ms: deadline.map(|d| d.as_millis() as u64),
        targets: &decision.targets,
        commitments: &decision.assignment.commitments,
        score: decision.assignment.score,
        nodes: decision.metrics.nodes,
        width,
        metrics: &decision.metrics,
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(())
}
