use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use zone_core::{load_engine_config_from_env, DecisionEngine, EngineConfig};
use zone_protocol::{render_dump, write_targets, TokenReader, DUMP_BEGIN, DUMP_END};

#[derive(Parser, Debug)]
#[command(author, version, about = "Zone-control bot speaking the referee protocol on stdin/stdout", long_about = None)]
struct Args {
    /// Engine config JSON (defaults to $ZONE_ENGINE_CONFIG_PATH, then the builtin copy)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the per-turn search deadline (milliseconds)
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Echo every observed turn to stderr in replayable form
    #[arg(long)]
    dump: bool,

    /// Stop after the first turn
    #[arg(long)]
    oneshot: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load engine config {}", path.display()))?,
        None => load_engine_config_from_env().0,
    };
    if let Some(deadline_ms) = args.deadline_ms {
        config.search.deadline_ms = deadline_ms;
    }

    let stdin = io::stdin();
    let mut reader = TokenReader::new(BufReader::new(stdin.lock()));
    let mut stdout = io::stdout().lock();

    let setup = reader.read_setup().context("Failed to read game setup")?;
    info!(
        target: "zone_control::bot",
        teams = setup.team_count,
        my_team = %setup.my_team,
        agents_per_team = setup.agents_per_team,
        zones = setup.zones.len(),
        deadline_ms = config.search.deadline_ms,
        "bot.ready"
    );
    let mut engine = DecisionEngine::new(&setup, config).context("Unsupported game setup")?;

    while let Some(observation) = reader.read_turn(&setup).context("Failed to read turn")? {
        if args.dump {
            eprint!(
                "{DUMP_BEGIN}\n{}{DUMP_END}\n",
                render_dump(&setup, &observation)
            );
        }
        let decision = engine
            .decide(&observation)
            .context("Turn does not match the game setup")?;
        write_targets(&mut stdout, &decision.targets).context("Failed to write targets")?;
        if args.oneshot {
            break;
        }
    }

    info!(target: "zone_control::bot", turns = engine.world().turn(), "bot.finished");
    Ok(())
}
