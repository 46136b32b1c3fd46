//! Config command handlers.

use anyhow::{Context, Result};

use echoclaw::config::validate::{validate_config, DiagnosticLevel};
use echoclaw::config::Config;

use super::ConfigAction;

pub(crate) async fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check => cmd_check(),
        ConfigAction::Show => cmd_show(),
    }
}

/// Validate the config file, then the effective settings.
fn cmd_check() -> Result<()> {
    let config_path = Config::path();
    println!("Config file: {}", config_path.display());

    if config_path.exists() {
        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let raw: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                println!("[ERROR] Invalid JSON: {}", e);
                return Ok(());
            }
        };

        let diagnostics = validate_config(&raw);
        for diag in &diagnostics {
            println!("{}", diag);
        }

        let errors = diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count();
        let warnings = diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warn)
            .count();

        if errors == 0 && warnings == 0 {
            println!("\nConfiguration file looks good!");
        } else {
            println!("\nFound {} error(s), {} warning(s)", errors, warnings);
        }
    } else {
        println!("[OK] No config file found (using defaults)");
    }

    match Config::load().and_then(|c| c.validate()) {
        Ok(()) => println!("[OK] Required settings present"),
        Err(e) => println!("[ERROR] {}", e),
    }
    Ok(())
}

/// Print the effective configuration with secrets redacted.
fn cmd_show() -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    redact(&mut config.gateway.api_key);
    redact(&mut config.generator.api_key);

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn redact(secret: &mut Option<String>) {
    if secret.as_deref().is_some_and(|s| !s.is_empty()) {
        *secret = Some("[redacted]".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_value() {
        let mut secret = Some("sk-123".to_string());
        redact(&mut secret);
        assert_eq!(secret.as_deref(), Some("[redacted]"));
    }

    #[test]
    fn test_redact_leaves_missing() {
        let mut secret = None;
        redact(&mut secret);
        assert!(secret.is_none());
    }
}
