//! Host-supplied configuration.
//!
//! The host hands over a TOML document with a `[shared]` table (secrets the
//! host makes available to every plugin) and a `[notion_comments]` table for
//! this component. Secrets resolve from an inline value first, then from a
//! named environment variable, then from the shared table.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use responder_module::{ChatEndpoint, DEFAULT_MAX_ATTEMPTS};

use crate::dispatcher::ResponderFailurePolicy;
use crate::index_resolver::canonical_page_id;

pub const CONFIG_PATH_ENV: &str = "NOTION_COMMENTS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "notion_comments.toml";
pub const DEFAULT_NOTION_TOKEN_ENV: &str = "NOTION_TOKEN";
pub const DEFAULT_POLL_INTERVAL_MINUTES: f64 = 5.0;
pub const DEFAULT_STATE_PATH: &str = "notion_comments_state.json";
pub const DEFAULT_PRIMARY_ENDPOINT: &str = "http://127.0.0.1:8080/v1/chat/completions";
pub const DEFAULT_PRIMARY_MODEL: &str = "local-model";
pub const DEFAULT_FALLBACK_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_FALLBACK_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("invalid config value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct HostConfigFile {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub notion_comments: NotionCommentsConfigFile,
}

/// Secrets the host shares across plugins.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SharedConfig {
    pub notion_token: Option<String>,
    pub local_llm_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct NotionCommentsConfigFile {
    #[serde(default)]
    pub enabled: bool,
    pub poll_interval_minutes: Option<f64>,
    pub index_page: Option<String>,
    #[serde(default)]
    pub watched_pages: Vec<String>,
    pub integration_user_id: Option<String>,
    pub state_path: Option<PathBuf>,
    #[serde(default)]
    pub responder_failure_policy: ResponderFailurePolicy,
    #[serde(default)]
    pub notion: NotionConfigFile,
    #[serde(default)]
    pub responder: ResponderConfigFile,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct NotionConfigFile {
    pub token: Option<String>,
    pub token_env: Option<String>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ResponderConfigFile {
    pub prefer_primary: Option<bool>,
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub primary: EndpointConfigFile,
    pub fallback: Option<EndpointConfigFile>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EndpointConfigFile {
    pub endpoint: Option<String>,
    pub endpoint_env: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
}

/// Fully resolved settings the poller runs with.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub index_page: Option<String>,
    pub watched_pages: Vec<String>,
    pub integration_user_id: Option<String>,
    pub state_path: PathBuf,
    pub responder_failure_policy: ResponderFailurePolicy,
    pub notion: NotionSettings,
    pub responder: ResponderSettings,
}

#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub token: String,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResponderSettings {
    pub primary: ChatEndpoint,
    pub fallback: Option<ChatEndpoint>,
    pub prefer_primary: bool,
    pub max_attempts: u32,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve a value: inline > named environment variable > shared fallback.
pub fn resolve_value(
    inline: Option<&str>,
    env_name: Option<&str>,
    shared: Option<&str>,
) -> Option<String> {
    non_blank(inline)
        .or_else(|| {
            env_name
                .and_then(|name| env::var(name).ok())
                .and_then(|v| non_blank(Some(&v)))
        })
        .or_else(|| non_blank(shared))
}

impl HostConfigFile {
    pub fn is_enabled(&self) -> bool {
        self.notion_comments.enabled
    }

    /// Resolve the component's settings, failing when no Notion credential
    /// can be found.
    pub fn resolve_poller_config(&self) -> Result<PollerConfig, ConfigError> {
        let file = &self.notion_comments;
        let shared = &self.shared;

        let token_env = file
            .notion
            .token_env
            .as_deref()
            .unwrap_or(DEFAULT_NOTION_TOKEN_ENV);
        let token = resolve_value(
            file.notion.token.as_deref(),
            Some(token_env),
            shared.notion_token.as_deref(),
        )
        .ok_or_else(|| {
            ConfigError::MissingCredential(format!(
                "Notion token (set notion.token, {} or shared.notion_token)",
                token_env
            ))
        })?;

        let poll_minutes = file
            .poll_interval_minutes
            .unwrap_or(DEFAULT_POLL_INTERVAL_MINUTES);
        let poll_interval = Duration::try_from_secs_f64(poll_minutes * 60.0)
            .ok()
            .filter(|interval| !interval.is_zero())
            .ok_or_else(|| ConfigError::Invalid {
                key: "poll_interval_minutes",
                message: format!("must be a positive number of minutes, got {}", poll_minutes),
            })?;

        let primary = resolve_endpoint(
            "primary",
            &file.responder.primary,
            DEFAULT_PRIMARY_ENDPOINT,
            DEFAULT_PRIMARY_MODEL,
            None,
            shared.local_llm_api_key.as_deref(),
        );

        let fallback = file.responder.fallback.as_ref().and_then(|fallback| {
            let endpoint = resolve_endpoint(
                "fallback",
                fallback,
                DEFAULT_FALLBACK_ENDPOINT,
                DEFAULT_FALLBACK_MODEL,
                Some(DEFAULT_FALLBACK_KEY_ENV),
                shared.openai_api_key.as_deref(),
            );
            if endpoint.api_key.is_none() {
                warn!("Fallback responder has no API key configured; disabling it");
                return None;
            }
            Some(endpoint)
        });

        Ok(PollerConfig {
            poll_interval,
            index_page: non_blank(file.index_page.as_deref()).map(|id| canonical_page_id(&id)),
            watched_pages: file
                .watched_pages
                .iter()
                .filter_map(|id| non_blank(Some(id)))
                .map(|id| canonical_page_id(&id))
                .collect(),
            integration_user_id: non_blank(file.integration_user_id.as_deref()),
            state_path: file
                .state_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            responder_failure_policy: file.responder_failure_policy,
            notion: NotionSettings {
                token,
                api_base_url: non_blank(file.notion.api_base_url.as_deref()),
            },
            responder: ResponderSettings {
                primary,
                fallback,
                prefer_primary: file.responder.prefer_primary.unwrap_or(true),
                max_attempts: file
                    .responder
                    .max_attempts
                    .unwrap_or(DEFAULT_MAX_ATTEMPTS)
                    .max(1),
            },
        })
    }
}

fn resolve_endpoint(
    name: &str,
    file: &EndpointConfigFile,
    default_endpoint: &str,
    default_model: &str,
    default_key_env: Option<&str>,
    shared_key: Option<&str>,
) -> ChatEndpoint {
    let endpoint = resolve_value(file.endpoint.as_deref(), file.endpoint_env.as_deref(), None)
        .unwrap_or_else(|| default_endpoint.to_string());
    let model = non_blank(file.model.as_deref()).unwrap_or_else(|| default_model.to_string());
    let key_env = file.api_key_env.as_deref().or(default_key_env);
    let api_key = resolve_value(file.api_key.as_deref(), key_env, shared_key);
    ChatEndpoint::new(name, endpoint, model, api_key)
}

/// Locate the host config file: `NOTION_COMMENTS_CONFIG`, else
/// `notion_comments.toml` in the working directory.
pub fn resolve_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_CONFIG_FILE)
}

/// Read the host config. A missing or malformed file yields the defaults
/// (which leave the component disabled).
pub fn load_host_config(path: &Path) -> HostConfigFile {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No config file at {}; using defaults", path.display());
            return HostConfigFile::default();
        }
        Err(e) => {
            warn!("Failed to read config {}: {}; using defaults", path.display(), e);
            return HostConfigFile::default();
        }
    };

    match toml::from_str::<HostConfigFile>(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config {}: {}; using defaults", path.display(), e);
            HostConfigFile::default()
        }
    }
}

/// Load `.env` into the environment, then the host config file.
pub fn load_host_config_from_env() -> HostConfigFile {
    dotenvy::dotenv().ok();
    load_host_config(&resolve_config_path())
}
