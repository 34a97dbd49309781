//! vecgraph CLI
//!
//! Main entry point for the vecgraph command-line tool.
//! Ingests documents into namespaces of a graph-augmented vector store and
//! runs hybrid similarity searches against them.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AddCommand, DeleteDocCommand, DeleteNamespaceCommand, HeartbeatCommand, ListCommand,
    MaintainCommand, ResetCommand, SearchCommand, StatsCommand,
};
use std::path::PathBuf;
use vecgraph_core::{config::AppConfig, logging, AppResult};

/// vecgraph - graph-augmented vector search over your documents
#[derive(Parser, Debug)]
#[command(name = "vecgraph")]
#[command(about = "Graph-augmented vector store with hybrid similarity search", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "VECGRAPH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "VECGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Store URI (sqlite://path/graph.db or sqlite::memory:)
    #[arg(long, global = true, env = "VECGRAPH_URI")]
    uri: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add files or directories to a namespace
    Add(AddCommand),

    /// Hybrid similarity search in a namespace
    Search(SearchCommand),

    /// Show namespace statistics
    Stats(StatsCommand),

    /// List namespaces or the documents in one
    List(ListCommand),

    /// Delete one document from a namespace
    DeleteDoc(DeleteDocCommand),

    /// Delete a namespace
    DeleteNamespace(DeleteNamespaceCommand),

    /// Delete every namespace
    Reset(ResetCommand),

    /// Check store connectivity
    Heartbeat(HeartbeatCommand),

    /// Rebuild vector index, projection and KNN edges
    Maintain(MaintainCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Add(_) => "add",
            Commands::Search(_) => "search",
            Commands::Stats(_) => "stats",
            Commands::List(_) => "list",
            Commands::DeleteDoc(_) => "delete-doc",
            Commands::DeleteNamespace(_) => "delete-namespace",
            Commands::Reset(_) => "reset",
            Commands::Heartbeat(_) => "heartbeat",
            Commands::Maintain(_) => "maintain",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.uri,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.json_logs,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.json_logs)?;

    tracing::info!("vecgraph CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Store: {:?}", config.store);
    tracing::debug!(
        "Embedding: {} / {} ({} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    // The default database and chunk cache live under .vecgraph
    config.ensure_state_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Add(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::List(cmd) => cmd.execute(&config).await,
        Commands::DeleteDoc(cmd) => cmd.execute(&config).await,
        Commands::DeleteNamespace(cmd) => cmd.execute(&config).await,
        Commands::Reset(cmd) => cmd.execute(&config).await,
        Commands::Heartbeat(cmd) => cmd.execute(&config).await,
        Commands::Maintain(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("[{}] Command failed: {}", e.category(), e),
    }

    result
}
