use anyhow::{Context, Result};
use dual_invest_core::AppConfig;

const MASK: &str = "***";

/// Prints the merged configuration as JSON with secrets masked.
pub fn show_config(config: &AppConfig) -> Result<()> {
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &AppConfig) -> Result<String> {
    let mut shown = config.clone();
    if !shown.telegram.bot_token.is_empty() {
        shown.telegram.bot_token = MASK.to_string();
    }
    serde_json::to_string_pretty(&shown).context("Failed to serialize configuration")
}
