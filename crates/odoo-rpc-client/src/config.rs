//! Configuration types for odoo-rpc.
//! Parsed from ~/.config/odoo-rpc/config.toml.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::relay::{default_relays, Relay};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default = "default_relays")]
    pub relays: Vec<Relay>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSection {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSection {
    #[serde(default = "default_true")]
    pub use_proxy: bool,
    #[serde(default = "default_15")]
    pub timeout_secs: u64,
    /// Origin of the page hosting the client, e.g. `https://dash.example`.
    /// Enables the mixed-content guard.
    #[serde(default)]
    pub page_origin: Option<String>,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            use_proxy: true,
            timeout_secs: 15,
            page_origin: None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_15() -> u64 {
    15
}

impl ClientConfig {
    /// Config for a server with default transport settings and relays.
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            server: ServerSection {
                url: url.into(),
                database: database.into(),
            },
            ..Self::default()
        }
    }

    /// Load config from file, or fall back to defaults if missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ClientConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Check the settings a call depends on.
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.server.url.to_ascii_lowercase();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "server.url must start with http:// or https:// (got {:?})",
                self.server.url
            );
        }
        if self.server.database.trim().is_empty() {
            anyhow::bail!("server.database is required");
        }
        if self.transport.timeout_secs == 0 {
            anyhow::bail!("transport.timeout_secs must be positive");
        }
        if let Some(relay) = self.relays.iter().find(|r| !r.has_placeholder()) {
            anyhow::bail!(
                "relay {:?} template has no {} placeholder",
                relay.name,
                crate::relay::URL_PLACEHOLDER
            );
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.transport.timeout_secs)
    }

    /// Server URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.server.url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            transport: TransportSection::default(),
            relays: default_relays(),
        }
    }
}
