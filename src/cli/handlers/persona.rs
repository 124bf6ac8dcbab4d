//! Persona profile handlers

use std::path::PathBuf;

use crate::cli::output::print_info;
use crate::cli::output::print_persona;
use crate::cli::output::print_success;
use crate::cli::output::print_warning;
use crate::database::KnowledgeStore;
use crate::models::LoadFilter;
use crate::persona::PersonaProfile;
use crate::AppConfig;
use crate::Result;

/// Handle persona analyze command
pub async fn handle_persona_analyze(
    config: &AppConfig,
    store: &KnowledgeStore,
    output: Option<PathBuf>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| config.bot.persona_path.clone());
    print_info("🎭 Analyzing stored messages...");

    let texts: Vec<String> = store
        .load_embedded_messages(&LoadFilter::default())
        .await?
        .into_iter()
        .map(|m| m.text)
        .collect();

    if texts.is_empty() {
        print_warning("No embedded messages found. Run: echorag import <file> && echorag backfill");
        return Ok(());
    }

    let profile = PersonaProfile::analyze(&texts, &config.composer.greeting_markers);
    profile.save(&output).await?;

    print_persona(&profile);
    print_success(&format!(
        "Persona profile from {} messages written to {}",
        texts.len(),
        output.display()
    ));
    Ok(())
}

/// Handle persona show command
pub async fn handle_persona_show(config: &AppConfig) -> Result<()> {
    match PersonaProfile::load(&config.bot.persona_path).await? {
        Some(profile) => print_persona(&profile),
        None => print_warning(&format!(
            "No persona profile at {}. Run: echorag persona analyze",
            config.bot.persona_path.display()
        )),
    }
    Ok(())
}
