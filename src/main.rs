//! dotres CLI entry point

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "dotres")]
#[command(about = "Definition outlines and type relationships for C# and Visual Basic projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Workspace root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Workspace manifest (defaults to dotres.toml or dotres.yaml under the root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the definition tree of a source file
    Outline {
        file: PathBuf,
    },
    /// Show what a type inherits from
    Bases {
        file: PathBuf,
        /// Identifier offset or type name
        target: String,
    },
    /// Show the types that inherit from a type
    Derived {
        file: PathBuf,
        /// Identifier offset or type name
        target: String,
    },
    /// Find where the name at a byte offset is declared
    Goto {
        file: PathBuf,
        offset: usize,
    },
    /// Show project references, for one project or the whole workspace
    Projects {
        name: Option<String>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("dotres={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Version = cli.command {
        println!("dotres v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    tracing::debug!("Workspace root: {}", cli.root.display());
    let session = commands::load_session(&cli.root, cli.config.as_deref()).await?;

    match cli.command {
        Commands::Outline { file } => commands::outline(&session, &file, cli.format),
        Commands::Bases { file, target } => {
            commands::bases(&session, &file, &target, cli.format)
        }
        Commands::Derived { file, target } => {
            commands::derived(&session, &file, &target, cli.format)
        }
        Commands::Goto { file, offset } => commands::goto(&session, &file, offset, cli.format),
        Commands::Projects { name } => commands::projects(&session, name.as_deref(), cli.format),
        Commands::Version => Ok(()),
    }
}
