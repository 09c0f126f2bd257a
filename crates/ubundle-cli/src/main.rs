use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use ubundle_cli::{ExtractArgs, InfoArgs, OutputFormat, commands};

#[derive(Parser)]
#[command(
    name = "ubundle",
    about = "Inspect and extract UnityFS asset bundles",
    version,
    long_about = "A command-line tool for UnityFS asset bundles: prints the header, the computed offsets, the storage blocks and the directory, and extracts entries. UnityCN-encrypted bundles are decrypted with --key."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the header, offsets, blocks and directory of a bundle
    Info(InfoArgs),

    /// Write the entries of a bundle to a directory
    Extract(ExtractArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG directives override --log-level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.log_level.into()).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info(args) => commands::info::handle(&args, cli.format, cli.no_color)?,
        Commands::Extract(args) => commands::extract::handle(&args, cli.format, cli.no_color)?,
    }

    Ok(())
}
