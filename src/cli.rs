use std::path::PathBuf;

use clap::Parser;

/// Fuzzy-pick a directory below the project root and print its path.
#[derive(Debug, Parser)]
#[command(name = "burrow", version)]
pub struct Cli {
    /// Directory to search instead of the detected project root.
    pub path: Option<PathBuf>,

    /// Show captured log output at the bottom of the screen.
    #[arg(long)]
    pub debug: bool,

    /// Extra config file, merged after the standard locations.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the JSON schema of the config file and exit.
    #[arg(long)]
    pub print_config_schema: bool,
}
