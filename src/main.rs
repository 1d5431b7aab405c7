//! `fieldlens` CLI - extract document fields and locate them on the page

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fieldlens")]
#[command(about = "Extract labeled fields from documents and locate them on the page")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/fieldlens/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Full pipeline output as JSON
    #[default]
    Json,
    /// Human-readable per-page and per-field summary
    Summary,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extraction, structuring and mapping on a document
    Extract {
        /// PDF or UTF-8 text document
        file: PathBuf,

        /// Write raw text, layout and extracted fields into this directory
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Skip the language model (text and layout only)
        #[arg(long)]
        no_llm: bool,
    },

    /// Re-run the coordinate mapper on saved artifacts
    Map {
        /// Raw text file
        #[arg(long, value_name = "FILE")]
        text: PathBuf,

        /// Layout JSON file
        #[arg(long, value_name = "FILE")]
        layout: PathBuf,

        /// Fields JSON file (array of {label, value, snippet?})
        #[arg(long, value_name = "FILE")]
        fields: PathBuf,
    },

    /// Show the config file location and effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fieldlens=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cmd::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract {
            file,
            output_dir,
            format,
            no_llm,
        } => {
            cmd::extract::cmd_extract(&config, &file, output_dir.as_deref(), format, no_llm).await?;
        }
        Commands::Map {
            text,
            layout,
            fields,
        } => {
            cmd::map::cmd_map(&config, &text, &layout, &fields)?;
        }
        Commands::Config => {
            cmd::config::cmd_config(&config, cli.config.as_deref())?;
        }
    }

    Ok(())
}
