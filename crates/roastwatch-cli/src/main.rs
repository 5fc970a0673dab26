use anyhow::Result;
use clap::{Parser, Subcommand};
use roastwatch_cli::OutputFormat;
use roastwatch_cli::commands::{self, ExportKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roastwatch")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Analyze web-vitals telemetry captured from the tasting journal",
    long_about = "Roastwatch works with cached page-view reports: run real-user-monitoring \
                  analysis, export history, audit resource weight from HAR captures and replay \
                  recorded vital events through the debounced aggregator."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Telemetry configuration file (JSON)
    #[arg(short, long, global = true, env = "ROASTWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run RUM analysis over a report cache directory
    Analyze {
        /// Directory holding cached reports
        #[arg(value_name = "CACHE_DIR")]
        cache: PathBuf,

        /// Resource-monitor history (JSON array of snapshots, oldest first)
        #[arg(long, value_name = "FILE")]
        bundle_history: Option<PathBuf>,
    },

    /// Export cached reports as JSON or CSV
    Export {
        /// Directory holding cached reports
        #[arg(value_name = "CACHE_DIR")]
        cache: PathBuf,

        /// Export encoding
        #[arg(long = "as", value_enum, default_value = "json")]
        kind: ExportKind,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Audit resource weight and timing of a HAR capture
    Bundle {
        /// Path to the HAR file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Replay recorded vital events through the aggregator into a cache
    Ingest {
        /// Recorded page views (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory to persist reports in
        #[arg(long, value_name = "CACHE_DIR")]
        cache: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            cache,
            bundle_history,
        } => commands::analyze::execute(&cache, bundle_history.as_deref(), &config, cli.format),
        Commands::Export {
            cache,
            kind,
            output,
        } => commands::export::execute(&cache, kind, output.as_deref(), &config),
        Commands::Bundle { file } => commands::bundle::execute(&file, &config, cli.format),
        Commands::Ingest { file, cache } => {
            commands::ingest::execute(&file, &cache, &config, cli.format)
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "roastwatch=debug,roastwatch_cli=debug,roastwatch_core=debug,roastwatch_collector=debug,roastwatch_sink=debug",
        )
    } else {
        EnvFilter::new("roastwatch=info,roastwatch_cli=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
