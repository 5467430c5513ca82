mod commands;
mod logging;
mod plugin;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kuduflow",
    version,
    about = "Check Kudu source and sink plugin properties before deployment"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate plugin properties and report every problem
    Check {
        /// Path to the plugin properties file (YAML or JSON)
        plugin: PathBuf,
    },
    /// Show what a plugin would do: the table it creates or the scan it runs
    Plan {
        /// Path to the plugin properties file (YAML or JSON)
        plugin: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Check { plugin } => commands::check::execute(&plugin),
        Commands::Plan { plugin } => commands::plan::execute(&plugin),
    }
}
