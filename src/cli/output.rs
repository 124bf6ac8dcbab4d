//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `echorag` CLI

use crate::models::KnowledgeStats;
use crate::persona::PersonaProfile;
use crate::rag::ServiceStatus;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// Multi-byte text (Japanese, emoji) is counted in characters, so this never
/// splits a code point.
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Print search header
pub fn print_search_header(query: &str, top_k: usize) {
    println!("🔍 Searching messages for: \"{query}\" (top {top_k})");
    println!();
}

/// Print retrieved messages, best match first
pub fn print_search_results(results: &[String]) {
    if results.is_empty() {
        print_warning("No similar messages found");
        return;
    }

    println!("Found {} messages:", results.len());
    for (idx, text) in results.iter().enumerate() {
        println!("  {}. {}", idx + 1, truncate_str(&text.replace('\n', " "), 120));
    }
}

/// Print a generated reply
pub fn print_reply(reply: &str, chunks: Option<&[String]>) {
    println!("💬 Reply:");
    println!("{reply}");

    if let Some(chunks) = chunks {
        println!();
        println!("📦 {} chunk(s):", chunks.len());
        for (idx, chunk) in chunks.iter().enumerate() {
            println!("  [{}] {} chars", idx + 1, chunk.chars().count());
        }
    }
}

/// Print knowledge store and service status
pub fn print_status(stats: &KnowledgeStats, status: &ServiceStatus) {
    println!("📊 echorag Status");
    println!("=================");
    println!();

    println!("🗄️  Knowledge store:");
    println!("  Messages: {}", stats.message_count);
    println!("  Embeddings: {}", stats.embedding_count);
    if stats.message_count > stats.embedding_count {
        println!(
            "  Pending embeddings: {} (run: echorag backfill)",
            stats.message_count - stats.embedding_count
        );
    }
    println!();

    println!("🧠 Reply pipeline:");
    println!("  Indexed messages: {}", status.indexed_messages);
    println!("  Persona loaded: {}", status.persona_loaded);
    println!(
        "  LLM mode: {}",
        if status.llm_configured {
            "enabled"
        } else {
            "disabled (heuristic replies only)"
        }
    );
    println!("  Fallback mode: {}", status.fallback_mode);
}

/// Print a persona profile
pub fn print_persona(profile: &PersonaProfile) {
    println!("🎭 Persona profile:");
    println!("  Average message length: {:.1}", profile.avg_message_length);
    println!("  Common endings: {}", profile.common_endings.join(", "));
    println!("  Sample greetings: {}", profile.sample_greetings.len());
    for greeting in &profile.sample_greetings {
        println!("    - {}", truncate_str(greeting, 60));
    }
}

/// Print configuration
pub fn print_config(config: &AppConfig) {
    println!("📋 echorag Configuration:");
    println!();

    println!("🗄️  Database:");
    println!("  URL: {}", config.database_url());
    println!("  Max connections: {}", config.database.max_connections);
    println!("  Connection timeout: {}s", config.database.connection_timeout);
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embeddings.model);
    println!("  Dimension: {}", config.embedding_dimension());
    println!();

    println!("🤖 LLM:");
    println!("  Endpoint: {}", config.llm.endpoint);
    println!("  Model: {}", config.llm.model);
    println!("  Key: {}", mask_key(config.llm_api_key().as_deref()));
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max output tokens: {}", config.llm.max_output_tokens);
    println!("  Timeout: {}s", config.llm.timeout_secs);
    println!();

    println!("🔍 Retrieval:");
    println!("  Top K: {}", config.retrieval.top_k);
    println!("  Max context messages: {}", config.retrieval.max_context_messages);
    println!();

    println!("💬 Bot:");
    println!("  Fallback mode: {}", config.fallback_mode());
    println!("  Persona: {}", config.bot.persona_path.display());
    println!("  Prompts: {}", config.bot.prompts_path.display());
    println!("  Max message length: {}", config.bot.max_message_length);
}

/// Show only the last four characters of a secret
fn mask_key(key: Option<&str>) -> String {
    match key {
        None => "(not set)".to_string(),
        Some(key) => {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 4 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{tail}")
            }
        }
    }
}

/// Print colored output functions
pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
