//! AudioFS CLI
//!
//! Command-line tools for exercising AudioFS virtual files.
//!
//! # Commands
//!
//! - `copy` - Stream a file through a memory or disk virtual file and verify it
//! - `growth` - Show the size classes a memory file walks through
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `--log-level` is not given.
const LOG_LEVEL_ENV: &str = "AUDIOFS_LOGLEVEL";

/// AudioFS virtual file tools.
#[derive(Parser)]
#[command(name = "audiofs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(global = true, short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a file into a virtual file and read it back
    Copy {
        /// File to read
        input: PathBuf,

        /// `memory` or a path to create
        target: String,

        /// Bytes per write call
        #[arg(short, long, default_value = "4096")]
        chunk: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the size-class schedule for growing a memory file
    Growth {
        /// Capacity to reach
        bytes: u64,

        /// Starting capacity
        #[arg(long, default_value = "1024")]
        from: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

/// Picks the log filter from the flag, then the environment.
///
/// Returns the filter and the rejected value, if any. Unknown values fall
/// back to `warn`.
fn resolve_log_level(flag: Option<&str>, env: Option<&str>) -> (&'static str, Option<String>) {
    let Some(raw) = flag.or(env) else {
        return ("info", None);
    };
    let level = match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "fatal" | "panic" => "error",
        _ => return ("warn", Some(raw.to_string())),
    };
    (level, None)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let env_level = std::env::var(LOG_LEVEL_ENV).ok();
    let (level, rejected) = resolve_log_level(cli.log_level.as_deref(), env_level.as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();
    if let Some(rejected) = rejected {
        warn!(value = %rejected, "unknown log level, using warn");
    }

    match cli.command {
        Commands::Copy {
            input,
            target,
            chunk,
            format,
        } => {
            commands::copy::run(&input, &target, chunk, &format)?;
        }
        Commands::Growth {
            bytes,
            from,
            format,
        } => {
            commands::growth::run(bytes, from, &format)?;
        }
        Commands::Version => {
            println!("AudioFS CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
