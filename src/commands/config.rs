use clap::{Subcommand, ValueEnum};
use serde_json::{Value, json};

use crate::app::Runtime;
use crate::config::{ensure_profile, profile_mut, profile_ref, save_config, validate_url};
use crate::errors::{CliError, redact_secret};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Initialize config file and profile
    Init {
        #[arg(long = "api-url")]
        api_url: Option<String>,
        #[arg(long = "api-key")]
        api_key: Option<String>,
    },
    /// Read a config key from the active profile
    Get {
        key: ConfigKey,
        #[arg(long)]
        show_key: bool,
    },
    /// Set a config key on the active profile
    Set { key: ConfigKey, value: String },
    /// List all profiles
    Profiles,
    /// Switch active profile
    Use { profile: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigKey {
    #[value(name = "apiUrl")]
    ApiUrl,
    #[value(name = "apiKey")]
    ApiKey,
    #[value(name = "primaryModel")]
    PrimaryModel,
    #[value(name = "fallbackModel")]
    FallbackModel,
    #[value(name = "proxyUrl")]
    ProxyUrl,
    #[value(name = "maxRenderChars")]
    MaxRenderChars,
}

impl ConfigKey {
    fn name(self) -> &'static str {
        match self {
            ConfigKey::ApiUrl => "apiUrl",
            ConfigKey::ApiKey => "apiKey",
            ConfigKey::PrimaryModel => "primaryModel",
            ConfigKey::FallbackModel => "fallbackModel",
            ConfigKey::ProxyUrl => "proxyUrl",
            ConfigKey::MaxRenderChars => "maxRenderChars",
        }
    }
}

pub async fn handle(runtime: &mut Runtime, command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Init { api_url, api_key } => init(runtime, api_url, api_key),
        ConfigCommand::Get { key, show_key } => get(runtime, key, show_key),
        ConfigCommand::Set { key, value } => set(runtime, key, value),
        ConfigCommand::Profiles => profiles(runtime),
        ConfigCommand::Use { profile } => use_profile(runtime, profile),
    }
}

fn init(
    runtime: &mut Runtime,
    api_url: Option<String>,
    api_key: Option<String>,
) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    ensure_profile(&mut runtime.config, &profile_name);
    if let Some(profile) = profile_mut(&mut runtime.config, &profile_name) {
        if let Some(url) = api_url {
            validate_url(&url)?;
            profile.api_url = url;
        }

        if let Some(value) = api_key {
            profile.api_key = Some(value);
        } else if !is_ci() && !runtime.output.json && !runtime.output.quiet {
            let maybe_key = rpassword::prompt_password("API key (optional, Enter to skip): ")
                .map_err(|e| CliError::Generic(format!("Failed reading API key: {e}")))?;
            if !maybe_key.trim().is_empty() {
                profile.api_key = Some(maybe_key.trim().to_string());
            }
        }
    }

    runtime.config.profile = profile_name;
    let path = save_config(&runtime.config)?;
    runtime.config_path = path.clone();

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "ok": true, "path": path }))?;
    } else {
        runtime
            .output
            .print_human(&format!("Config initialized: {}", path.display()));
    }
    Ok(())
}

fn get(runtime: &mut Runtime, key: ConfigKey, show_key: bool) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    let profile = profile_ref(&runtime.config, &profile_name).ok_or_else(|| {
        CliError::Usage(format!(
            "Profile '{profile_name}' not found. Run `chatrelay config init` first."
        ))
    })?;

    let value: Value = match key {
        ConfigKey::ApiUrl => json!(profile.api_url),
        ConfigKey::ApiKey => {
            let resolved = runtime.resolved_api_key();
            json!(resolved.as_deref().map(|k| {
                if show_key {
                    k.to_string()
                } else {
                    redact_secret(k)
                }
            }))
        }
        ConfigKey::PrimaryModel => json!(runtime.resolved_models().0),
        ConfigKey::FallbackModel => json!(runtime.resolved_models().1),
        ConfigKey::ProxyUrl => json!(profile.proxy_url),
        ConfigKey::MaxRenderChars => json!(profile.max_render_chars),
    };

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "key": key.name(), "value": value }))?;
        return Ok(());
    }

    match value {
        Value::Null => runtime.output.print_human("(not set)"),
        Value::String(text) => runtime.output.print_human(&text),
        other => runtime.output.print_human(&other.to_string()),
    }
    Ok(())
}

fn set(runtime: &mut Runtime, key: ConfigKey, value: String) -> Result<(), CliError> {
    let profile_name = runtime.active_profile();
    ensure_profile(&mut runtime.config, &profile_name);
    let profile = profile_mut(&mut runtime.config, &profile_name).ok_or_else(|| {
        CliError::Generic(format!(
            "Failed to resolve profile '{profile_name}' while setting config."
        ))
    })?;

    let value = value.trim().to_string();
    match key {
        ConfigKey::ApiUrl => {
            validate_url(&value)?;
            profile.api_url = value;
        }
        ConfigKey::ApiKey => {
            profile.api_key = (!value.is_empty()).then_some(value);
        }
        ConfigKey::PrimaryModel | ConfigKey::FallbackModel if value.is_empty() => {
            return Err(CliError::Usage(format!("{} cannot be empty.", key.name())));
        }
        ConfigKey::PrimaryModel => profile.primary_model = value,
        ConfigKey::FallbackModel => profile.fallback_model = value,
        ConfigKey::ProxyUrl => {
            if value.is_empty() {
                profile.proxy_url = None;
            } else {
                validate_url(&value)?;
                profile.proxy_url = Some(value);
            }
        }
        ConfigKey::MaxRenderChars => {
            profile.max_render_chars = value.parse::<usize>().map_err(|_| {
                CliError::Usage("maxRenderChars must be a non-negative integer.".to_string())
            })?;
        }
    }

    let path = save_config(&runtime.config)?;
    runtime.config_path = path;

    if runtime.output.json {
        runtime.output.print_json(&json!({ "ok": true }))?;
    } else {
        runtime.output.print_human("Config updated.");
    }

    Ok(())
}

fn profiles(runtime: &mut Runtime) -> Result<(), CliError> {
    let active = runtime.active_profile();
    let mut names: Vec<String> = runtime.config.profiles.keys().cloned().collect();
    names.sort();

    if runtime.output.json {
        let payload = names
            .iter()
            .map(|name| {
                let profile = runtime.config.profiles.get(name);
                json!({
                    "name": name,
                    "active": name == &active,
                    "apiUrl": profile.map(|p| p.api_url.clone()).unwrap_or_default(),
                    "primaryModel": profile.map(|p| p.primary_model.clone()).unwrap_or_default(),
                    "hasApiKey": profile
                        .and_then(|p| p.api_key.as_ref())
                        .map(|k| !k.is_empty())
                        .unwrap_or(false)
                })
            })
            .collect::<Vec<_>>();
        runtime.output.print_json(&json!({ "profiles": payload }))?;
        return Ok(());
    }

    runtime
        .output
        .print_verbose(&format!("config: {}", runtime.config_path.display()));
    for name in names {
        let marker = if name == active { "*" } else { " " };
        runtime.output.print_human(&format!("{marker} {name}"));
    }
    Ok(())
}

fn use_profile(runtime: &mut Runtime, profile_name: String) -> Result<(), CliError> {
    ensure_profile(&mut runtime.config, &profile_name);
    runtime.config.profile = profile_name.clone();
    let path = save_config(&runtime.config)?;
    runtime.config_path = path;

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "ok": true, "profile": profile_name }))?;
    } else {
        runtime
            .output
            .print_human(&format!("Active profile: {profile_name}"));
    }

    Ok(())
}

fn is_ci() -> bool {
    std::env::var("CI")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
