use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CliError;
use crate::relay::gemini::DEFAULT_UPSTREAM_URL;
use crate::render::DEFAULT_MAX_CHARS;

pub const DEFAULT_PRIMARY_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-2.0-flash";

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const PRIMARY_MODEL_ENV: &str = "GEMINI_MODEL";
pub const FALLBACK_MODEL_ENV: &str = "GEMINI_FALLBACK_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileConfig {
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub primary_model: String,
    pub fallback_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    pub max_render_chars: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: None,
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            proxy_url: None,
            max_render_chars: DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub profile: String,
    pub profiles: HashMap<String, ProfileConfig>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), ProfileConfig::default());
        Self {
            profile: "default".to_string(),
            profiles,
        }
    }
}

pub fn config_path() -> Result<PathBuf, CliError> {
    let base = dirs::config_dir().ok_or_else(|| {
        CliError::Config("Could not resolve config directory for this OS.".to_string())
    })?;
    Ok(base.join("chatrelay").join("config.json"))
}

pub fn load_config() -> Result<CliConfig, CliError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let text = fs::read_to_string(&path)?;
    parse_config(&text)
}

fn parse_config(text: &str) -> Result<CliConfig, CliError> {
    let mut config: CliConfig = serde_json::from_str(text)
        .map_err(|e| CliError::Config(format!("Invalid config file: {e}")))?;
    let profile = config.profile.clone();
    ensure_profile(&mut config, &profile);
    Ok(config)
}

pub fn save_config(config: &CliConfig) -> Result<PathBuf, CliError> {
    let path = config_path()?;
    let parent = path
        .parent()
        .ok_or_else(|| CliError::Config("Invalid config path.".to_string()))?;
    fs::create_dir_all(parent)?;
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    Ok(path)
}

pub fn active_profile_name(config: &CliConfig, profile_override: Option<&str>) -> String {
    profile_override
        .map(|s| s.to_string())
        .unwrap_or_else(|| config.profile.clone())
}

pub fn ensure_profile(config: &mut CliConfig, profile_name: &str) {
    if !config.profiles.contains_key(profile_name) {
        config
            .profiles
            .insert(profile_name.to_string(), ProfileConfig::default());
    }
}

pub fn profile_ref<'a>(config: &'a CliConfig, profile_name: &str) -> Option<&'a ProfileConfig> {
    config.profiles.get(profile_name)
}

pub fn profile_mut<'a>(
    config: &'a mut CliConfig,
    profile_name: &str,
) -> Option<&'a mut ProfileConfig> {
    config.profiles.get_mut(profile_name)
}

fn require_profile<'a>(
    config: &'a CliConfig,
    profile_name: &str,
) -> Result<&'a ProfileConfig, CliError> {
    profile_ref(config, profile_name)
        .ok_or_else(|| CliError::Usage(format!("Profile '{profile_name}' does not exist.")))
}

pub fn resolve_api_url(
    config: &CliConfig,
    profile_name: &str,
    api_override: Option<&str>,
) -> Result<String, CliError> {
    if let Some(url) = api_override {
        validate_url(url)?;
        return Ok(url.to_string());
    }

    let profile = require_profile(config, profile_name)?;
    validate_url(&profile.api_url)?;
    Ok(profile.api_url.clone())
}

pub fn resolve_proxy_url(config: &CliConfig, profile_name: &str) -> Result<Option<String>, CliError> {
    let profile = require_profile(config, profile_name)?;
    match profile.proxy_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            validate_url(url)?;
            Ok(Some(url.to_string()))
        }
        _ => Ok(None),
    }
}

pub fn resolve_api_key(config: &CliConfig, profile_name: &str) -> Option<String> {
    env_value(API_KEY_ENV).or_else(|| {
        profile_ref(config, profile_name)
            .and_then(|p| p.api_key.clone())
            .filter(|k| !k.trim().is_empty())
    })
}

/// Primary and fallback model identifiers, environment first.
pub fn resolve_models(config: &CliConfig, profile_name: &str) -> (String, String) {
    let profile = profile_ref(config, profile_name).cloned().unwrap_or_default();
    (
        env_value(PRIMARY_MODEL_ENV).unwrap_or(profile.primary_model),
        env_value(FALLBACK_MODEL_ENV).unwrap_or(profile.fallback_model),
    )
}

pub fn resolve_max_chars(config: &CliConfig, profile_name: &str) -> usize {
    profile_ref(config, profile_name)
        .map(|p| p.max_render_chars)
        .unwrap_or(DEFAULT_MAX_CHARS)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_url(value: &str) -> Result<(), CliError> {
    let parsed = Url::parse(value)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CliError::Usage(
            "URL must use http:// or https://.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_profiles_fill_in_defaults() {
        let config = parse_config(
            r#"{ "profile": "work", "profiles": { "default": { "apiKey": "k" } } }"#,
        )
        .expect("config");
        let default = profile_ref(&config, "default").expect("default profile");
        assert_eq!(default.api_key.as_deref(), Some("k"));
        assert_eq!(default.primary_model, DEFAULT_PRIMARY_MODEL);
        assert_eq!(default.max_render_chars, DEFAULT_MAX_CHARS);
        assert!(profile_ref(&config, "work").is_some());
    }

    #[test]
    fn serialises_camel_case_without_empty_secrets() {
        let text = serde_json::to_string(&ProfileConfig::default()).expect("json");
        assert!(text.contains("\"apiUrl\""));
        assert!(text.contains("\"fallbackModel\""));
        assert!(!text.contains("apiKey"));
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        assert!(matches!(parse_config("{"), Err(CliError::Config(_))));
    }

    #[test]
    fn url_validation_requires_http() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn api_url_override_wins() {
        let config = CliConfig::default();
        assert_eq!(
            resolve_api_url(&config, "default", Some("http://localhost:8080")).expect("url"),
            "http://localhost:8080"
        );
        assert_eq!(
            resolve_api_url(&config, "default", None).expect("url"),
            DEFAULT_UPSTREAM_URL
        );
        assert!(resolve_api_url(&config, "missing", None).is_err());
    }

    #[test]
    fn blank_proxy_means_in_process() {
        let mut config = CliConfig::default();
        assert_eq!(resolve_proxy_url(&config, "default").expect("proxy"), None);
        if let Some(p) = profile_mut(&mut config, "default") {
            p.proxy_url = Some("  ".into());
        }
        assert_eq!(resolve_proxy_url(&config, "default").expect("proxy"), None);
        if let Some(p) = profile_mut(&mut config, "default") {
            p.proxy_url = Some("http://relay.local".into());
        }
        assert_eq!(
            resolve_proxy_url(&config, "default").expect("proxy").as_deref(),
            Some("http://relay.local")
        );
    }
}
