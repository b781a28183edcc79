//! Planetside CLI - create, check and run planet worlds headlessly

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use planetside::config::WorldConfig;
use planetside::game::input::{FrameInput, InputScript, ScriptedInput};
use planetside::game::GameInstance;
use planetside::logging;

#[derive(Parser)]
#[command(name = "planetside")]
#[command(about = "Planet-surface world simulator", long_about = None)]
struct Cli {
    /// Print debug logs (RUST_LOG overrides)
    #[arg(short, long, global = true, env = "PLANETSIDE_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new world project
    Init {
        /// Name for the new project (creates subdirectory). Omit to init in current directory.
        name: Option<String>,
    },
    /// Validate a world without running it
    Check {
        /// Path to a world directory or world.toml
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Run a world with scripted input and print observations
    Run {
        /// Path to a world directory or world.toml
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Input script (default: input.toml next to world.toml)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Frames to run; defaults to the script length
        #[arg(short, long)]
        frames: Option<u64>,
        /// Print one JSON observation per tick instead of a summary
        #[arg(long)]
        json: bool,
        /// Pace ticks at the world tick rate
        #[arg(long)]
        realtime: bool,
    },
}

static SAMPLE_WORLD: &str = include_str!("../../games/mining-outpost/world.toml");
static SAMPLE_INPUT: &str = include_str!("../../games/mining-outpost/input.toml");

/// Frames simulated when there is neither a script nor --frames.
const DEFAULT_IDLE_FRAMES: u64 = 300;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Init { name } => init_project(name),
        Commands::Check { path } => check_world(&path),
        Commands::Run {
            path,
            input,
            frames,
            json,
            realtime,
        } => run_world(&path, input, frames, json, realtime),
    }
}

// =============================================================================
// Init Command
// =============================================================================

fn init_project(name: Option<String>) -> Result<()> {
    let (project_name, project_dir) = match name {
        Some(n) => {
            let dir = PathBuf::from(&n);
            if dir.exists() {
                bail!("Directory '{}' already exists", n);
            }
            (n, dir)
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            let dir_name = cwd
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "planet".to_string());
            if cwd.join("world.toml").exists() {
                bail!("world.toml already exists in current directory");
            }
            (dir_name, cwd)
        }
    };

    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let world_toml = SAMPLE_WORLD.replace("Mining Outpost", &project_name);
    std::fs::write(project_dir.join("world.toml"), world_toml).context("Failed to create world.toml")?;
    std::fs::write(project_dir.join("input.toml"), SAMPLE_INPUT).context("Failed to create input.toml")?;

    println!("Created world '{}' in {}", project_name, project_dir.display());
    println!("  world.toml  - planet, player, ores and NPCs");
    println!("  input.toml  - scripted input for `planetside run`");
    Ok(())
}

// =============================================================================
// Check / Run Commands
// =============================================================================

/// Accepts either a world directory or a path to the TOML file itself.
fn load_world(path: &Path) -> Result<(WorldConfig, PathBuf)> {
    let (config, dir) = if path.is_dir() {
        (WorldConfig::from_game_dir(path)?, path.to_path_buf())
    } else {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        (WorldConfig::from_file(path)?, dir)
    };
    config.validate().with_context(|| format!("Invalid world '{}'", config.name))?;
    Ok((config, dir))
}

fn check_world(path: &Path) -> Result<()> {
    let (config, _) = load_world(path)?;
    let instance = GameInstance::new(config)?;
    println!(
        "{}: ok ({} ores, {} NPCs, {} Hz)",
        instance.name,
        instance.ores.len(),
        instance.npcs.len(),
        instance.config.tick_rate
    );
    Ok(())
}

fn run_world(path: &Path, input: Option<PathBuf>, frames: Option<u64>, json: bool, realtime: bool) -> Result<()> {
    let (config, dir) = load_world(path)?;

    let script_path = input.unwrap_or_else(|| dir.join("input.toml"));
    let script = if script_path.exists() {
        InputScript::from_file(&script_path)?
    } else {
        warn!("No input script at {}, running idle", script_path.display());
        InputScript::default()
    };
    let frames = frames.unwrap_or_else(|| match script.frame_count() {
        0 => DEFAULT_IDLE_FRAMES,
        n => n,
    });

    let mut instance = GameInstance::new(config)?;
    let dt = instance.timestep();
    let mut scripted = ScriptedInput::new(script);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    info!("Running '{}' for {} frames at {:.1} Hz", instance.name, frames, 1.0 / dt);
    let started = Instant::now();

    for frame in 0..frames {
        let tick_start = Instant::now();

        // Past the end of the script the player idles.
        let input = match scripted.advance() {
            Some(queued) => {
                for action in queued {
                    instance.queue_action(action);
                }
                FrameInput::sample(&mut scripted, dt)
            }
            None => FrameInput::idle(dt),
        };
        instance.tick(&input);

        let observation = instance.get_player_observation();
        if json {
            serde_json::to_writer(&mut out, &observation)?;
            writeln!(out)?;
        } else if !observation.events.is_empty() || frame % u64::from(instance.config.tick_rate) == 0 {
            writeln!(
                out,
                "tick {:>5}  alt {:>7.3}  grounded {:<5}  money {:>4}  focus {:?}  events {:?}",
                observation.tick,
                observation.altitude,
                observation.grounded,
                observation.money,
                observation.focus,
                observation.events
            )?;
        }

        if realtime {
            let budget = Duration::from_secs_f32(dt);
            if let Some(remaining) = budget.checked_sub(tick_start.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }

    let observation = instance.get_player_observation();
    info!(
        "Finished {} ticks in {:.2?}: money {}, ore {:?}",
        observation.tick,
        started.elapsed(),
        observation.money,
        observation.ore_chunks
    );
    Ok(())
}
