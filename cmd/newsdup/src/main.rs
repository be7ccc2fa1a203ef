//! newsdup CLI - near-duplicate clustering and categorization of news
//! article embeddings.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    AssignCommand, ClassifyCommand, ClustersCommand, EvaluateCommand, ImportCommand,
    RelatedCommand,
};

/// newsdup - cluster near-duplicate news articles and classify them by
/// their nearest labeled neighbors.
///
/// State lives in a single redb file. Every command runs as one pipeline run
/// for `--run-date`; clusters founded within the configured lookback window
/// stay open for new members.
#[derive(Parser)]
#[command(name = "newsdup")]
#[command(about = "News near-duplicate clustering and KNN categorization")]
#[command(version)]
pub struct Cli {
    /// Engine config file (YAML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database file
    #[arg(long, global = true, default_value = "newsdup.redb")]
    pub db: String,

    /// Run date (YYYY-MM-DD), default is today in UTC
    #[arg(long, global = true)]
    pub run_date: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import articles and embeddings from a JSONL file
    Import(ImportCommand),
    /// Assign articles to clusters
    Assign(AssignCommand),
    /// List articles related to an article
    Related(RelatedCommand),
    /// Classify an article
    Classify(ClassifyCommand),
    /// Evaluate the classifier on held-out articles
    Evaluate(EvaluateCommand),
    /// List the clusters open in this run
    Clusters(ClustersCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG overrides the default level.
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Import(cmd) => cmd.run(&cli),
        Commands::Assign(cmd) => cmd.run(&cli),
        Commands::Related(cmd) => cmd.run(&cli),
        Commands::Classify(cmd) => cmd.run(&cli),
        Commands::Evaluate(cmd) => cmd.run(&cli),
        Commands::Clusters(cmd) => cmd.run(&cli),
    }
}
