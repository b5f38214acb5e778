//! Config command handlers

use anyhow::{bail, Context, Result};

use daybook_core::{CascadePolicy, Config};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => output.json(&config),
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  autosave_debounce_ms: {}", config.autosave_debounce_ms);
            println!("  cascade_policy:       {}", config.cascade_policy);
            println!("  log_level:            {}", config.log_level);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(stderr)".to_string())
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    config.save().context("Failed to save configuration")?;
    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "autosave_debounce_ms" => {
            config.autosave_debounce_ms = value
                .parse()
                .context("Invalid value for autosave_debounce_ms. Use milliseconds, e.g. 2000.")?;
        }
        "cascade_policy" => {
            config.cascade_policy = value
                .parse::<CascadePolicy>()
                .map_err(anyhow::Error::msg)?;
        }
        "log_level" => {
            if !["trace", "debug", "info", "warn", "error"].contains(&value) {
                bail!("Invalid log_level '{}'. Use trace, debug, info, warn or error.", value);
            }
            config.log_level = value.to_string();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, autosave_debounce_ms, cascade_policy, log_level, log_file",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::with_data_dir("/tmp/daybook");

        apply(&mut config, "autosave_debounce_ms", "750").unwrap();
        apply(&mut config, "cascade_policy", "Orphan").unwrap();
        apply(&mut config, "log_level", "debug").unwrap();
        apply(&mut config, "log_file", "/tmp/daybook.log").unwrap();

        assert_eq!(config.autosave_debounce_ms, 750);
        assert_eq!(config.cascade_policy, CascadePolicy::Orphan);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/daybook.log")));

        apply(&mut config, "log_file", "none").unwrap();
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::with_data_dir("/tmp/daybook");

        assert!(apply(&mut config, "autosave_debounce_ms", "soon").is_err());
        assert!(apply(&mut config, "cascade_policy", "shred").is_err());
        assert!(apply(&mut config, "log_level", "loud").is_err());
        assert!(apply(&mut config, "sync_url", "ws://x").is_err());
        assert_eq!(config.cascade_policy, CascadePolicy::Delete);
    }
}
