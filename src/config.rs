use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const APP_DIR_NAME: &str = "codemate";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "codellama:7b-instruct";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: std::collections::BTreeMap<String, Profile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Language id used for annotation comments when none can be inferred.
    pub language: Option<String>,
}

/// Per-invocation partial overrides, highest precedence. Replaces the
/// ambient-defaults pattern: callers hand this in, nothing is global.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverride {
    pub profile: Option<String>,
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub language: Option<String>,
}

pub fn default_config_path() -> Result<PathBuf> {
    let base = config_dir().context("unable to resolve OS config directory")?;
    Ok(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn ensure_config_parent_exists(path: &PathBuf) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config dir: {}", parent.display()))?;
    }
    Ok(())
}

pub fn load_config_if_exists(path: &PathBuf) -> Result<Option<AppConfig>> {
    if path.exists() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&text).context("parsing config TOML")?;
        Ok(Some(cfg))
    } else {
        Ok(None)
    }
}

pub fn write_config(path: &PathBuf, cfg: &AppConfig) -> Result<()> {
    ensure_config_parent_exists(path)?;
    let text = toml::to_string_pretty(cfg).context("serializing config to TOML")?;
    fs::write(path, text).with_context(|| format!("writing config file: {}", path.display()))?;
    Ok(())
}

/// Merge config file, environment, and CLI overrides into one settings
/// value. Precedence: file profile < `CODEMATE_ENDPOINT` < overrides.
pub fn resolve_effective_settings(overrides: &SettingsOverride) -> Result<EffectiveSettings> {
    let path = default_config_path()?;
    let cfg = load_config_if_exists(&path)?;

    let mut provider: Option<String> = None;
    let mut endpoint: Option<String> = None;
    let mut model: Option<String> = None;
    let mut language: Option<String> = None;

    if let Some(cfg) = cfg {
        let profile_name = overrides
            .profile
            .clone()
            .or(cfg.default_profile)
            .unwrap_or_else(|| "default".to_string());
        if let Some(p) = cfg.profiles.get(&profile_name) {
            provider = p.provider.clone();
            endpoint = p.endpoint.clone();
            model = p.model.clone();
            language = p.language.clone();
        }
    }

    if let Ok(env_endpoint) = std::env::var("CODEMATE_ENDPOINT") {
        if !env_endpoint.trim().is_empty() {
            endpoint = Some(env_endpoint);
        }
    }

    if let Some(p) = &overrides.provider {
        provider = Some(p.clone());
    }
    if let Some(e) = &overrides.endpoint {
        endpoint = Some(e.clone());
    }
    if let Some(m) = &overrides.model {
        model = Some(m.clone());
    }

    Ok(EffectiveSettings {
        provider: provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
        endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_toml() {
        let mut cfg = AppConfig::default();
        cfg.default_profile = Some("local".to_string());
        cfg.profiles.insert(
            "local".to_string(),
            Profile {
                provider: Some("ollama".to_string()),
                endpoint: Some("http://127.0.0.1:11434".to_string()),
                model: Some("codellama:7b-instruct".to_string()),
                language: Some("typescript".to_string()),
            },
        );
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.default_profile.as_deref(), Some("local"));
        let p = back.profiles.get("local").unwrap();
        assert_eq!(p.endpoint.as_deref(), Some("http://127.0.0.1:11434"));
        assert_eq!(p.language.as_deref(), Some("typescript"));
    }
}
