//! `gk` — drive the groundskeeper engine against a simulated server.
//!
//! The engine itself is host-agnostic; this binary wires it to the
//! in-memory `SimHost` so configs and schedules can be exercised and
//! observed without a game server.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use groundskeeper_core::commands::{dispatch, CleanCommand};
use groundskeeper_core::config::CleanerConfig;
use groundskeeper_core::host::{ChunkSnapshot, EntityKind};
use groundskeeper_core::logging::{init_logging, LogConfig, LogFormat};
use groundskeeper_core::plugin::Groundskeeper;
use groundskeeper_core::simulation::SimHost;

/// Milliseconds of wall time per simulated tick at full speed.
const TICK_MS: u64 = 50;

#[derive(Parser)]
#[command(name = "gk", version, about = "Adaptive cleanup scheduler simulator")]
struct Cli {
    /// Path to a groundskeeper.toml; defaults apply when omitted
    #[arg(long, global = true, env = "GK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit JSON log lines instead of pretty output
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a populated server for a stretch of game time
    Run(RunArgs),
    /// Run one operator action against a freshly populated world
    Clean(CleanArgs),
    /// Load and validate a configuration file
    CheckConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Seconds of game time to simulate
    #[arg(long, default_value_t = 660)]
    seconds: u64,

    #[command(flatten)]
    world: WorldArgs,

    /// Print the engine status as JSON when the run ends
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CleanArgs {
    /// Action: items, entities, all, chunks, check, or status
    action: String,

    #[command(flatten)]
    world: WorldArgs,
}

#[derive(Args)]
struct WorldArgs {
    /// Dropped items to scatter in the main world
    #[arg(long, default_value_t = 500)]
    items: u64,

    /// Hostile mobs to spawn
    #[arg(long, default_value_t = 200)]
    mobs: u64,

    /// Side length of the loaded chunk grid
    #[arg(long, default_value_t = 16)]
    chunk_grid: i32,

    /// Players standing near the origin
    #[arg(long, default_value_t = 2)]
    players: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig {
        level: cli.log_level.clone(),
        format: if cli.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
    })
    .context("failed to initialize logging")?;

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Run(args) => run(config, &args),
        Command::Clean(args) => clean(config, &args),
        Command::CheckConfig => check_config(&config),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<CleanerConfig> {
    match path {
        Some(path) => CleanerConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(CleanerConfig::default()),
    }
}

fn populate(args: &WorldArgs) -> SimHost {
    let mut host = SimHost::new();
    host.add_world("world");

    let materials = ["DIRT", "COBBLESTONE", "ROTTEN_FLESH", "DIAMOND", "ARROW"];
    for i in 0..args.items {
        let material = materials[(i % materials.len() as u64) as usize];
        // Every fourth stack is freshly dropped.
        let age = if i % 4 == 0 { 0 } else { 100_000 };
        host.spawn_item("world", material, false, age);
    }

    let kinds = [
        EntityKind::Zombie,
        EntityKind::Skeleton,
        EntityKind::Creeper,
        EntityKind::Phantom,
        EntityKind::Cow,
        EntityKind::Villager,
    ];
    for i in 0..args.mobs {
        host.spawn_mob("world", kinds[(i % kinds.len() as u64) as usize]);
    }

    for x in 0..args.chunk_grid {
        for z in 0..args.chunk_grid {
            host.add_chunk(
                "world",
                ChunkSnapshot {
                    x,
                    z,
                    force_kept: false,
                    in_use: false,
                    entities_loaded: true,
                    has_player: false,
                },
            );
        }
    }

    for i in 0..args.players {
        host.add_player("world", i as i32, 0, i == 0);
    }
    host
}

fn run(config: CleanerConfig, args: &RunArgs) -> Result<()> {
    let mut gk = Groundskeeper::new(config);
    let mut host = populate(&args.world);
    gk.init(&host);
    tracing::info!(seconds = args.seconds, "simulation starting");

    let mut now = 0_u64;
    for _ in 0..args.seconds * 20 {
        now += TICK_MS;
        gk.on_tick(&mut host, now);
    }

    for message in host.broadcasts() {
        println!("[broadcast] {message}");
    }
    for message in host.op_notices() {
        println!("[ops] {message}");
    }

    if args.json {
        let status = gk.status(&host);
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in dispatch(&mut gk, &mut host, CleanCommand::Status, now) {
            println!("{line}");
        }
    }
    Ok(())
}

fn clean(config: CleanerConfig, args: &CleanArgs) -> Result<()> {
    let command = CleanCommand::from_str(&args.action).map_err(|err| anyhow::anyhow!(err))?;
    let mut gk = Groundskeeper::new(config);
    let mut host = populate(&args.world);
    gk.init(&host);

    for line in dispatch(&mut gk, &mut host, command, TICK_MS) {
        println!("{line}");
    }

    // Batches drain across ticks; give the engine room to finish.
    let mut now = TICK_MS;
    while gk.in_progress() {
        now += TICK_MS;
        gk.on_tick(&mut host, now);
    }
    for message in host.broadcasts() {
        println!("[broadcast] {message}");
    }
    Ok(())
}

fn check_config(config: &CleanerConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("failed to render config")?;
    println!("{rendered}");
    Ok(())
}
