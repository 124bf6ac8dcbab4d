//! Information display handlers (status, config)

use crate::cli::output::print_config;
use crate::cli::output::print_status;
use crate::cli::output::print_warning;
use crate::database::KnowledgeStore;
use crate::rag::ResponseService;
use crate::AppConfig;
use crate::Result;

/// Handle status command
pub async fn handle_status_command(config: &AppConfig, store: &KnowledgeStore) -> Result<()> {
    let stats = store.stats().await?;

    let service = ResponseService::from_config(config).await?;
    if let Err(e) = service.initialize().await {
        print_warning(&format!("Knowledge data could not be loaded: {e}"));
    }

    print_status(&stats, &service.status());
    Ok(())
}

/// Handle config command
pub fn handle_config_command(config: &AppConfig) -> Result<()> {
    print_config(config);
    Ok(())
}
