//! `averygate doctor`: Diagnose configuration and credentials.

use averygate_config::AppConfig;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Check {
    pub level: Level,
    pub message: String,
}

impl Check {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            level: Level::Ok,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            level: Level::Fail,
            message: message.into(),
        }
    }
}

/// Offline checks over a loaded configuration.
pub fn diagnose(config: &AppConfig) -> Vec<Check> {
    let mut checks = Vec::new();

    let credentials = [
        ("AIRTABLE_API_KEY", config.records.api_key.is_some(), "record lookups"),
        ("AIRTABLE_BASE_ID", config.records.base_id.is_some(), "record lookups"),
        ("OPENAI_API_KEY", config.completion.api_key.is_some(), "/chat"),
    ];
    for (name, present, needed_by) in credentials {
        if present {
            checks.push(Check::ok(format!("{name} configured")));
        } else {
            checks.push(Check::warn(format!(
                "{name} not set; {needed_by} will fail until it is"
            )));
        }
    }

    if config.gateway.static_dir.is_dir() {
        checks.push(Check::ok(format!(
            "Static UI directory {}",
            config.gateway.static_dir.display()
        )));
    } else {
        checks.push(Check::warn(format!(
            "Static UI directory {} missing; /chat-ui disabled",
            config.gateway.static_dir.display()
        )));
    }

    if config.chat.session_ttl_secs == 0 {
        checks.push(Check::warn(
            "chat.session_ttl_secs = 0; idle sessions never expire",
        ));
    }

    checks
}

pub async fn run(config_path: Option<&Path>, online: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("averygate doctor");
    println!("================\n");

    let path = AppConfig::resolve_path(config_path);
    if path.exists() {
        println!("  ok    Config file {}", path.display());
    } else {
        println!("  warn  No config file at {}; using defaults", path.display());
    }

    let config = match AppConfig::load(config_path) {
        Ok(config) => {
            println!("  ok    Config valid");
            config
        }
        Err(e) => {
            println!("  FAIL  Config error: {e}");
            return Ok(());
        }
    };

    let mut checks = diagnose(&config);

    if online {
        let provider = averygate_providers::build_from_config(&config.completion)?;
        match provider.health_check().await {
            Ok(true) => checks.push(Check::ok("Completion service reachable")),
            Ok(false) => checks.push(Check::fail("Completion service rejected the credential")),
            Err(e) => checks.push(Check::fail(format!("Completion service check failed: {e}"))),
        }
    }

    for check in &checks {
        let tag = match check.level {
            Level::Ok => "ok   ",
            Level::Warn => "warn ",
            Level::Fail => "FAIL ",
        };
        println!("  {tag} {}", check.message);
    }

    let issues = checks.iter().filter(|c| c.level != Level::Ok).count();
    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_warnings() {
        let mut config = AppConfig::default();
        config.gateway.static_dir = "no-such-dir".into();
        let checks = diagnose(&config);

        let warnings: Vec<&str> = checks
            .iter()
            .filter(|c| c.level == Level::Warn)
            .map(|c| c.message.as_str())
            .collect();
        assert!(warnings.iter().any(|m| m.starts_with("OPENAI_API_KEY")));
        assert!(warnings.iter().any(|m| m.starts_with("AIRTABLE_API_KEY")));
        assert!(warnings.iter().any(|m| m.contains("/chat-ui disabled")));
        assert!(checks.iter().all(|c| c.level != Level::Fail));
    }

    #[test]
    fn complete_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.records.api_key = Some("pat".into());
        config.records.base_id = Some("app123".into());
        config.completion.api_key = Some("sk".into());
        config.gateway.static_dir = dir.path().to_path_buf();

        assert!(diagnose(&config).iter().all(|c| c.level == Level::Ok));
    }
}
