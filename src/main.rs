//! # Delve Command Line
//!
//! Generates one level and prints it as ASCII or JSON.

use clap::Parser;
use delve::{generation::utils, DelveResult, GenerationConfig, Generator, LevelGenerator};
use log::{error, info, LevelFilter};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command line arguments for the level generator.
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Procedural cave-and-vault level generator")]
#[command(version)]
struct Args {
    /// Random seed for level generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Grid width in cells; the acceptance threshold scales with it
    #[arg(long)]
    width: Option<i32>,

    /// Grid height in cells
    #[arg(long)]
    height: Option<i32>,

    /// JSON generation config; command line values override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the whole level as JSON instead of ASCII
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initializes `env_logger`. `RUST_LOG` wins over the command line level.
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .parse_default_env()
        .init();
}

fn load_config(args: &Args) -> DelveResult<GenerationConfig> {
    let mut config = match &args.config {
        Some(path) => GenerationConfig::from_json_file(path)?,
        None => GenerationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.width.is_some() || args.height.is_some() {
        // Resizing scales the acceptance threshold with the playable area.
        let width = args.width.unwrap_or(config.width);
        let height = args.height.unwrap_or(config.height);
        config = config.with_size(width, height);
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> DelveResult<()> {
    let config = load_config(args)?;
    info!(
        "Delve v{}: generating {}x{} level with seed {}",
        delve::VERSION,
        config.width,
        config.height,
        config.seed
    );

    let generator = LevelGenerator::new();
    let mut rng = utils::create_rng(&config);
    let level = generator.generate(&config, &mut rng)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&level)?);
    } else {
        print!("{}", level.terrain);
        println!("{}", level.summary());
    }
    Ok(())
}
