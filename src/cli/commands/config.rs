//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: Option<&PathBuf>, settings: Settings) -> Result<()> {
    let path = config_path.cloned().unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&redacted(settings))
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            // Start from the file alone so environment secrets are never written out.
            let mut on_disk = Settings::load_file(Some(&path))?;
            on_disk.set_value(key, value)?;
            on_disk.save_to(&path)?;
            Output::success(&format!("Set {} = {} in {}", key, value, path.display()));
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn redacted(mut settings: Settings) -> Settings {
    for key in [&mut settings.openai.api_key, &mut settings.youtube.api_key] {
        if key.as_deref().is_some_and(|k| !k.is_empty()) {
            *key = Some("<redacted>".to_string());
        }
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_writes_only_file_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut env_loaded = Settings::default();
        env_loaded.openai.api_key = Some("sk-from-env".to_string());

        let action = ConfigAction::Set {
            key: "tutor.model".to_string(),
            value: "gpt-4o".to_string(),
        };
        run_config(&action, Some(&path), env_loaded).unwrap();

        let saved = Settings::load_file(Some(&path)).unwrap();
        assert_eq!(saved.tutor.model, "gpt-4o");
        assert_eq!(saved.openai.api_key, None);
    }

    #[test]
    fn test_show_redacts_keys() {
        let mut settings = Settings::default();
        settings.youtube.api_key = Some("secret".to_string());
        let shown = redacted(settings);
        assert_eq!(shown.youtube.api_key.as_deref(), Some("<redacted>"));
        assert_eq!(shown.openai.api_key, None);
    }
}
