use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;

const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudioConfig {
    pub version: u32,
    pub model: String,
    pub max_tokens: u32,
    pub api_base: String,
    /// Archive name used when exporting without an explicit file name.
    pub project_name: String,
    pub theme: Theme,
    pub log_level: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            version: 1,
            model: "claude-3-5-sonnet-20241022".into(),
            max_tokens: 4096,
            api_base: "https://api.anthropic.com".into(),
            project_name: "ai-generated-project".into(),
            theme: Theme::Dark,
            log_level: "info".into(),
        }
    }
}

fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Reads `config.json` from `data_dir`. A missing file gives the defaults;
/// an unreadable one is logged and also gives the defaults.
pub fn load_config(data_dir: &Path) -> StudioConfig {
    let path = config_path(data_dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return StudioConfig::default(),
    };
    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            StudioConfig::default()
        }
    }
}

pub fn save_config(data_dir: &Path, config: &StudioConfig) -> Result<()> {
    let path = config_path(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()), StudioConfig::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "model": "claude-test", "theme": "light" }"#,
        )
        .unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn corrupt_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(load_config(dir.path()), StudioConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let config = StudioConfig {
            project_name: "demo".into(),
            ..StudioConfig::default()
        };
        save_config(&nested, &config).unwrap();
        assert_eq!(load_config(&nested), config);
    }

    #[test]
    fn theme_toggles() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }
}
