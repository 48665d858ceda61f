//! qtiforge CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "qtiforge", version, about = "QTI test compiler and delivery toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an authored test into a compact artifact
    Compile {
        /// Path to the authored test .toml file
        #[arg(long)]
        test: PathBuf,

        /// Directory item hrefs are resolved against (default: the test
        /// file's directory)
        #[arg(long)]
        items_dir: Option<PathBuf>,

        /// Destination directory for the storage areas and descriptor
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate an authored test file
    Validate {
        /// Path to the authored test .toml file
        #[arg(long)]
        test: PathBuf,
    },

    /// Summarize a compiled artifact
    Inspect {
        /// Path to the invocation descriptor JSON
        #[arg(long)]
        artifact: PathBuf,
    },

    /// Create starter config and an example test
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qtiforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            test,
            items_dir,
            output,
            config,
        } => commands::compile::execute(test, items_dir, output, config),
        Commands::Validate { test } => commands::validate::execute(test),
        Commands::Inspect { artifact } => commands::inspect::execute(artifact),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
