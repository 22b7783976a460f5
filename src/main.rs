//! ttsave CLI - split and merge tabletop save files

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ttsave::commands;
use ttsave::config::EnvOverrides;
use ttsave::interface::Context;

#[derive(Parser)]
#[command(name = "ttsave")]
#[command(author, version, about = "Split and merge tabletop save files", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra merge diagnostics (manifest groups, bundling)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a save file into per-object sources
    Split {
        /// Save file to split (default: INPUT_SAVE or Save.json)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,

        /// Output directory (default: SRC_DIR or src)
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Dry run - show what would be done without doing it
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Merge the sources back into a save file
    Merge {
        /// Version tag, e.g. v1.2.0
        #[arg(long = "version", value_name = "TAG")]
        tag: String,

        /// Output directory (default: BUILD_DIR or build)
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Dry run - show what would be done without doing it
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Watch the sources and rebuild a development save on change
    Watch {
        /// Debounce delay in milliseconds
        #[arg(short, long, default_value = "0")]
        debounce: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Determine working directory
    let base_dir = cli
        .directory
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    // .env is optional
    if let Err(e) = dotenvy::from_path(base_dir.join(".env")) {
        if !e.not_found() {
            eprintln!("Error loading .env: {}", e);
            return ExitCode::FAILURE;
        }
    }

    // Read configuration from file or use defaults
    let config = match cli.config {
        Some(ref path) => ttsave::config::read_config_file(path),
        None => ttsave::config::read_config(&base_dir),
    };
    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.debug |= cli.debug;

    let ctx = Context::new(config, EnvOverrides::from_env(), base_dir);
    let debug = ctx.config.debug;

    // Execute command
    let result = match cli.command {
        Commands::Split {
            input,
            out,
            dry_run,
        } => {
            let options = commands::SplitOptions {
                input,
                out_dir: out,
                dry_run,
            };
            commands::split(&ctx, options)
        }

        Commands::Merge { tag, out, dry_run } => {
            let options = commands::MergeOptions {
                version: tag,
                out_dir: out,
                dry_run,
                debug,
            };
            commands::merge(&ctx, options).map(|_| ())
        }

        Commands::Watch { debounce } => {
            let options = commands::WatchOptions {
                debounce_ms: debounce,
                debug,
            };
            commands::watch(&ctx, options)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
