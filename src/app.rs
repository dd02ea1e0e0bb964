use std::path::PathBuf;

use crate::api::ApiClient;
use crate::config::{
    CliConfig, active_profile_name, resolve_api_key, resolve_api_url, resolve_max_chars,
    resolve_models, resolve_proxy_url,
};
use crate::errors::CliError;
use crate::output::OutputMode;
use crate::relay::gemini::GeminiBackend;
use crate::relay::handler::Relay;
use crate::session::transport::{HttpTransport, LocalTransport, Transport};

#[derive(Debug, Clone)]
pub struct Runtime {
    pub output: OutputMode,
    pub config: CliConfig,
    pub config_path: PathBuf,
    pub profile_override: Option<String>,
    pub api_url_override: Option<String>,
    pub max_chars_override: Option<usize>,
    pub timeout_ms: u64,
}

impl Runtime {
    pub fn active_profile(&self) -> String {
        active_profile_name(&self.config, self.profile_override.as_deref())
    }

    pub fn resolved_api_url(&self) -> Result<String, CliError> {
        resolve_api_url(
            &self.config,
            &self.active_profile(),
            self.api_url_override.as_deref(),
        )
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_api_key(&self.config, &self.active_profile())
    }

    pub fn resolved_models(&self) -> (String, String) {
        resolve_models(&self.config, &self.active_profile())
    }

    pub fn max_render_chars(&self) -> usize {
        self.max_chars_override
            .unwrap_or_else(|| resolve_max_chars(&self.config, &self.active_profile()))
    }

    /// In-process relay. Without a credential it answers every turn with 503.
    pub fn relay(&self, model_override: Option<&str>) -> Result<Relay<GeminiBackend>, CliError> {
        let (primary, fallback) = self.resolved_models();
        let primary = model_override.map(str::to_string).unwrap_or(primary);
        let backend = match self.resolved_api_key() {
            Some(key) => {
                let api = ApiClient::new(
                    self.resolved_api_url()?,
                    None,
                    self.timeout_ms,
                    self.output.debug,
                )?;
                Some(GeminiBackend::new(api, &key))
            }
            None => None,
        };
        Ok(Relay::new(backend, primary, fallback))
    }

    /// Remote relay when the profile names one, otherwise the in-process relay.
    pub fn transport(&self, model_override: Option<&str>) -> Result<Transport, CliError> {
        let profile = self.active_profile();
        if let Some(proxy_url) = resolve_proxy_url(&self.config, &profile)? {
            if model_override.is_some() {
                self.output
                    .print_verbose("Model selection is decided by the remote relay; --model ignored.");
            }
            let api = ApiClient::new(proxy_url, None, self.timeout_ms, self.output.debug)?;
            return Ok(Transport::Http(HttpTransport::new(api)));
        }
        Ok(Transport::Local(LocalTransport::new(
            self.relay(model_override)?,
        )))
    }
}
