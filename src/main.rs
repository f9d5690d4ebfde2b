use campus_rag::Result;
use campus_rag::commands::{clear_knowledge, run_ingest, run_query, show_stats};
use campus_rag::config::{run_interactive_config, show_config};
use campus_rag::generation::StudentProfile;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "campus-rag")]
#[command(about = "Retrieval-augmented campus assistant over a local knowledge base")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the generation provider and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest category folders of documents into the knowledge base
    Ingest {
        /// Root folder holding one sub-folder per category. Defaults to the
        /// knowledge folder in the configuration directory
        dir: Option<PathBuf>,
        /// Category to ingest; may be repeated. Defaults to all standard categories
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,
    },
    /// Ask a question
    Query {
        /// The question
        text: String,
        /// Student branch, e.g. "CSE"
        #[arg(long)]
        branch: Option<String>,
        /// Year of study
        #[arg(long)]
        year: Option<String>,
        /// Accommodation, e.g. "hostel" or "day scholar"
        #[arg(long)]
        accommodation: Option<String>,
    },
    /// Show knowledge base statistics
    Stats,
    /// Remove every document from the knowledge base
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

fn profile_from(
    branch: Option<String>,
    year: Option<String>,
    accommodation: Option<String>,
) -> Option<StudentProfile> {
    if branch.is_none() && year.is_none() && accommodation.is_none() {
        return None;
    }

    Some(StudentProfile {
        branch,
        year,
        accommodation,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { dir, categories } => {
            run_ingest(dir, categories).await?;
        }
        Commands::Query {
            text,
            branch,
            year,
            accommodation,
        } => {
            run_query(&text, profile_from(branch, year, accommodation)).await?;
        }
        Commands::Stats => {
            show_stats().await?;
        }
        Commands::Clear { yes } => {
            clear_knowledge(yes).await?;
        }
    }

    Ok(())
}
