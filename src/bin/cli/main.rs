mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "recall-cli", about = "Vocabulary flashcards with spaced repetition", version)]
struct Cli {
    /// Data directory (default: platform data dir + /recall)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

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
    /// Add a vocabulary item
    Add {
        /// The word or phrase to learn
        term: String,
        /// Its meaning
        definition: String,
        /// Example sentence
        #[arg(long)]
        example: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// List items with their review progress
    List,

    /// Show items due for review, in review order
    Due {
        /// Maximum items to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run an interactive review session
    Review {
        /// Maximum items in the session (default from config)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Grade a single due item without an interactive session
    Grade {
        /// Item id (or unique prefix) or term
        item: String,
        /// fail/again, hard, good, easy, or a 1-4 rating
        grade: String,
    },

    /// Remove an item and its progress
    Remove {
        /// Item id (or unique prefix) or term
        item: String,
    },

    /// Show progress summary and upcoming reviews
    Stats {
        /// Days to forecast
        #[arg(long, default_value = "7")]
        days: u32,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.data_dir.as_deref())?;

    match cli.command {
        Command::Add { term, definition, example, tags } => {
            commands::add::run(&app, term, definition, example, tags.as_deref(), &cli.format)?;
        }
        Command::List => {
            commands::list::run(&app, &cli.format, use_color)?;
        }
        Command::Due { limit } => {
            commands::due::run(&app, limit, &cli.format, use_color)?;
        }
        Command::Review { limit } => {
            commands::review::run(&app, limit, &cli.format, use_color)?;
        }
        Command::Grade { item, grade } => {
            commands::grade::run(&app, &item, &grade, &cli.format, use_color)?;
        }
        Command::Remove { item } => {
            commands::remove::run(&app, &item, &cli.format)?;
        }
        Command::Stats { days } => {
            commands::stats::run(&app, days, &cli.format, use_color)?;
        }
    }

    Ok(())
}
