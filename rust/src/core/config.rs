use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::AppCore;
use crate::api::{ProviderKind, DEFAULT_REQUEST_TIMEOUT};

pub(super) const CONFIG_FILE: &str = "cooked_config.json";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:4000/api/v1";
const DEFAULT_MODEL_NAME: &str = "gemini-2.0-flash-lite";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AppConfig {
    pub(super) api_base_url: Option<String>,
    pub(super) request_timeout_secs: Option<u64>,
    pub(super) disable_network: Option<bool>,
    pub(super) default_model: Option<DefaultModel>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(super) struct DefaultModel {
    pub(super) name: String,
    #[serde(rename = "type")]
    pub(super) kind: ProviderKind,
    #[serde(default)]
    pub(super) id: Option<String>,
}

impl Default for DefaultModel {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            kind: ProviderKind::Gemini,
            id: None,
        }
    }
}

pub(super) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE);
    let Ok(bytes) = std::fs::read(&path) else {
        return AppConfig::default();
    };
    match serde_json::from_slice::<AppConfig>(&bytes) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), %e, "config: unreadable, using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn default_app_config_json() -> String {
    serde_json::json!({
        "api_base_url": DEFAULT_API_BASE_URL,
        "request_timeout_secs": DEFAULT_REQUEST_TIMEOUT.as_secs(),
        "disable_network": false,
        "default_model": { "name": DEFAULT_MODEL_NAME, "type": ProviderKind::Gemini },
    })
    .to_string()
}

impl AppConfig {
    /// `COOKED_API_BASE_URL` overrides the file, which overrides the default.
    pub(super) fn api_base_url(&self) -> String {
        self.api_base_url_with_env(std::env::var("COOKED_API_BASE_URL").ok())
    }

    fn api_base_url_with_env(&self, env: Option<String>) -> String {
        [env.as_deref(), self.api_base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL)
            .to_string()
    }

    pub(super) fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub(super) fn default_model(&self) -> DefaultModel {
        self.default_model
            .clone()
            .filter(|m| !m.name.trim().is_empty())
            .unwrap_or_default()
    }
}

impl AppCore {
    pub(super) fn network_enabled(&self) -> bool {
        // Used to keep Rust tests deterministic and offline.
        if let Some(disable) = self.config.disable_network {
            return !disable;
        }
        std::env::var("COOKED_DISABLE_NETWORK").ok().as_deref() != Some("1")
    }
}
