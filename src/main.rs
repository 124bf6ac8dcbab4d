use clap::Parser;
use echorag::cli::handlers;
use echorag::cli::output::print_error;
use echorag::cli::Cli;
use echorag::cli::Commands;
use echorag::cli::PersonaCommands;
use echorag::config::AppConfig;
use echorag::database::KnowledgeStore;
use echorag::Result;
use tracing::info;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    // Initialize logging
    if cli.verbose {
        echorag::logging::init_logging_with_level("debug")?;
    } else {
        echorag::logging::init_logging_with_config(&config)?;
    }
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Init { force } => {
            let store = KnowledgeStore::from_config(&config).await?;
            handlers::handle_init_command(&store, force).await
        }
        Commands::Import { file } => {
            let store = open_store(&config).await?;
            handlers::handle_import_command(&store, &file).await
        }
        Commands::Backfill => {
            let store = open_store(&config).await?;
            handlers::handle_backfill_command(&config, &store).await
        }
        Commands::Ask {
            query,
            top_k,
            chunks,
        } => handlers::handle_ask_command(&config, &query, top_k, chunks).await,
        Commands::Search { query, top_k } => {
            handlers::handle_search_command(&config, &query, top_k).await
        }
        Commands::Persona(PersonaCommands::Analyze { output }) => {
            let store = open_store(&config).await?;
            handlers::handle_persona_analyze(&config, &store, output).await
        }
        Commands::Persona(PersonaCommands::Show) => handlers::handle_persona_show(&config).await,
        Commands::Status => {
            let store = open_store(&config).await?;
            handlers::handle_status_command(&config, &store).await
        }
        Commands::Config => handlers::handle_config_command(&config),
        Commands::Serve { host, port, cors } => {
            handlers::handle_serve_api(&config, host, port, cors).await
        }
    }
}

/// Connect and make sure the schema exists
async fn open_store(config: &AppConfig) -> Result<KnowledgeStore> {
    let store = KnowledgeStore::from_config(config).await?;
    store.init_schema().await?;
    Ok(store)
}
