//! Host-facing entry point.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use responder_module::RoutedResponder;

use crate::adapters::notion::NotionClient;
use crate::config::{HostConfigFile, PollerConfig};
use crate::notion_poller::{
    start_poller_thread_with, NotionPoller, PollerControl, PollerError, STARTUP_DELAY,
};

pub const PLUGIN_NAME: &str = "notion-comments";

/// Name and version reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub name: &'static str,
    pub version: &'static str,
}

pub struct NotionCommentsPlugin;

impl NotionCommentsPlugin {
    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor {
            name: PLUGIN_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Start polling. Returns `None` when the component is disabled and an
    /// error when its configuration cannot be resolved.
    ///
    /// Safe to call from an async runtime: the clients are built and the bot
    /// user is looked up on the poller thread.
    pub fn start(host_config: &HostConfigFile) -> Result<Option<PollerControl>, PollerError> {
        if !host_config.is_enabled() {
            info!("Notion comment integration is disabled");
            return Ok(None);
        }

        let config = host_config.resolve_poller_config().map_err(|e| {
            error!("Notion comment integration not started: {}", e);
            e
        })?;

        let interval = config.poll_interval;
        let control = start_poller_thread_with(
            move || Arc::new(Self::build_poller(config)),
            STARTUP_DELAY,
            interval,
        )?;
        info!("{} v{} started", PLUGIN_NAME, env!("CARGO_PKG_VERSION"));
        Ok(Some(control))
    }

    /// Wire the production Notion client and routed responder into a poller.
    pub fn build_poller(config: PollerConfig) -> NotionPoller {
        let client = match &config.notion.api_base_url {
            Some(base_url) => NotionClient::with_base_url(config.notion.token.clone(), base_url),
            None => NotionClient::new(config.notion.token.clone()),
        };

        let settings = &config.responder;
        let responder = RoutedResponder::new(
            Some(settings.primary.clone()),
            settings.fallback.clone(),
            settings.prefer_primary,
        )
        .with_max_attempts(settings.max_attempts);

        NotionPoller::new(config, Arc::new(client), Arc::new(responder))
    }
}
