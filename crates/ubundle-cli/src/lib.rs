//! ubundle command-line library
//!
//! Argument types, command handlers and output helpers for the `ubundle`
//! binary.

pub mod commands;
pub mod output;

pub use crate::commands::{extract::handle as handle_extract, info::handle as handle_info};

use clap::Args;
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// Options shared by every command that opens a bundle
#[derive(Debug, Clone, Args)]
pub struct BundleArgs {
    /// Path to the bundle
    pub bundle: PathBuf,

    /// UnityCN key as 32 hex characters, for encrypted bundles
    #[arg(short, long, env = "UBUNDLE_KEY", hide_env_values = true)]
    pub key: Option<String>,
}

/// Arguments of the `info` command
#[derive(Debug, Clone, Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    /// List every storage block
    #[arg(short, long)]
    pub blocks: bool,
}

/// Arguments of the `extract` command
#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    /// Directory to write the entries to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Only extract entries whose path contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Skip resource entries, keeping serialized files only
    #[arg(long)]
    pub serialized_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_debug() {
        assert_eq!(format!("{:?}", OutputFormat::Text), "Text");
        assert_eq!(format!("{:?}", OutputFormat::Json), "Json");
        assert_eq!(format!("{:?}", OutputFormat::JsonPretty), "JsonPretty");
    }
}
