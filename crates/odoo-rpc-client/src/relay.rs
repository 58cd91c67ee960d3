//! CORS relay descriptors.
//!
//! A relay is a URL template with a `{url}` placeholder; the target URL is
//! percent-encoded into it. Any service that proxies an arbitrary URL and
//! returns the raw body will do.

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the percent-encoded target URL.
pub const URL_PLACEHOLDER: &str = "{url}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub name: String,
    pub template: String,
}

impl Relay {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Route `target` through this relay.
    pub fn rewrite(&self, target: &str) -> String {
        self.template
            .replace(URL_PLACEHOLDER, &urlencoding::encode(target))
    }

    pub fn has_placeholder(&self) -> bool {
        self.template.contains(URL_PLACEHOLDER)
    }
}

/// Public relays tried in order when proxying is enabled.
pub fn default_relays() -> Vec<Relay> {
    vec![
        Relay::new("corsproxy.io", "https://corsproxy.io/?url={url}"),
        Relay::new("allorigins", "https://api.allorigins.win/raw?url={url}"),
        Relay::new("codetabs", "https://api.codetabs.com/v1/proxy?quest={url}"),
    ]
}
