mod app;
mod commands;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "marginalia-cli", about = "Inspect and manage reader annotations", version)]
struct Cli {
    /// Annotation settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Annotation store file (overrides the settings)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List stored annotations
    List {
        /// Only annotations of this chapter (absolute URL)
        #[arg(long)]
        href: Option<String>,
    },

    /// Show annotations grouped by chapter
    Tree {
        /// Web publication manifest (JSON)
        #[arg(long)]
        manifest: PathBuf,
        /// URL the manifest is served from
        #[arg(long)]
        base_url: String,
    },

    /// Delete an annotation, confirming with the remote first when configured
    Delete {
        /// Annotation id
        id: String,
    },

    /// Replace the store with annotations from a JSON file
    Seed {
        /// Array of annotations, or an object with a `highlights` array
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.config.as_deref(), cli.store)?;

    match cli.command {
        Command::List { href } => {
            commands::list::run(&app, href.as_deref(), &cli.format).await?;
        }
        Command::Tree { manifest, base_url } => {
            commands::tree::run(&app, &manifest, &base_url, &cli.format, use_color).await?;
        }
        Command::Delete { id } => {
            commands::delete::run(&app, &id, &cli.format).await?;
        }
        Command::Seed { file } => {
            commands::seed::run(&app, &file, &cli.format).await?;
        }
    }

    Ok(())
}
