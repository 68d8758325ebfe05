// plc-logtrace - main.rs
//
// Thin CLI binary. Handles:
// 1. CLI argument parsing
// 2. Logging initialisation (debug mode support)
// 3. Config loading
// 4. Registry-driven parse of the given path, with a summary printed to
//    stdout (the one place in this crate that's allowed to print).

pub use plc_logtrace::core;
pub use plc_logtrace::util;

use clap::Parser as ClapParser;
use core::parser::registry::ParserRegistry;
use core::parser::traits::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// plc-logtrace - PLC log ingestion and time-indexed storage engine.
///
/// Point it at a log file to detect its format, parse it, and print a
/// summary of the signals and time range found.
#[derive(ClapParser, Debug)]
#[command(name = "logtrace", version, about)]
struct Cli {
    /// Log file to parse.
    path: PathBuf,

    /// Explicit parser name, bypassing auto-detection.
    #[arg(short = 'p', long = "parser")]
    parser: Option<String>,

    /// Path to an EngineConfig TOML file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match util::config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: failed to load config '{}': {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => core::model::EngineConfig::default(),
    };

    util::logging::init(cli.debug, None);

    tracing::info!(
        version = util::constants::APP_VERSION,
        path = %cli.path.display(),
        "plc-logtrace starting"
    );

    let registry = ParserRegistry::builtin();
    let result = registry.parse(&cli.path, cli.parser.as_deref(), config.worker_count, config.use_processes);

    for error in &result.errors {
        tracing::warn!(%error, "parse error");
    }

    let Some(data) = result.data else {
        eprintln!("Error: no data parsed from '{}'", cli.path.display());
        if let Some(first) = result.errors.first() {
            eprintln!("  {first}");
        }
        return ExitCode::FAILURE;
    };

    println!("file:      {}", cli.path.display());
    println!("entries:   {}", data.entries.len());
    println!("signals:   {}", data.signals.len());
    println!("devices:   {}", data.devices.len());
    if let Some((start, end)) = data.time_range {
        println!("time range: {start} .. {end}");
    }
    if !result.errors.is_empty() {
        println!("parse errors: {}", result.errors.len());
    }

    ExitCode::SUCCESS
}
