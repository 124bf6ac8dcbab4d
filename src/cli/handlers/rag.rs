//! Reply and similarity search handlers

use crate::chunking::split_message;
use crate::cli::output::print_info;
use crate::cli::output::print_reply;
use crate::cli::output::print_search_header;
use crate::cli::output::print_search_results;
use crate::rag::ResponseService;
use crate::AppConfig;
use crate::Result;

/// Handle ask command
pub async fn handle_ask_command(
    config: &AppConfig,
    query: &str,
    top_k: Option<usize>,
    show_chunks: bool,
) -> Result<()> {
    let service = ResponseService::from_config(config).await?;
    service
        .ensure_initialized_with(|| print_info("Loading knowledge data..."))
        .await?;

    let reply = match top_k {
        Some(top_k) => service.generate_response(query, top_k).await?,
        None => service.generate_response_default(query).await?,
    };

    let chunks = show_chunks.then(|| split_message(&reply, config.bot.max_message_length));
    print_reply(&reply, chunks.as_deref());
    Ok(())
}

/// Handle search command
pub async fn handle_search_command(config: &AppConfig, query: &str, top_k: usize) -> Result<()> {
    let service = ResponseService::from_config(config).await?;
    print_search_header(query, top_k);
    let results = service.search(query, top_k).await?;
    print_search_results(&results);
    Ok(())
}
