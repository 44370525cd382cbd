use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed project estimation CLI.
/// Storage defaults to ~/.pe/<project>_estimates.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "pe", version, about = "Project estimation and proposal CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
