//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "echorag")]
#[command(about = "Persona-style chat replies from your own message history")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to the configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the knowledge store schema
    Init {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Import messages into the knowledge store
    Import {
        /// JSON array or JSON lines file of messages
        file: PathBuf,
    },
    /// Generate embeddings for messages that do not have one
    Backfill,
    /// Generate a reply to a query
    Ask {
        /// The query text
        query: String,
        /// Number of similar messages to retrieve (default: retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Also print the transport-sized chunks
        #[arg(long)]
        chunks: bool,
    },
    /// Show the stored messages most similar to a query
    Search {
        /// The query text
        query: String,
        /// Number of results
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },
    /// Persona profile commands
    #[command(subcommand)]
    Persona(PersonaCommands),
    /// Show knowledge store and LLM status
    Status,
    /// Show current configuration
    Config,
    /// Start the HTTP API server
    Serve {
        /// Host to bind (default: server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable CORS for all origins
        #[arg(long)]
        cors: bool,
    },
}

#[derive(Subcommand)]
pub enum PersonaCommands {
    /// Build a persona profile from the stored messages
    Analyze {
        /// Output path (default: bot.persona_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the current persona profile
    Show,
}
