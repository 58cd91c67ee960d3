//! Odoo RPC Client -- XML-RPC over HTTP with CORS relay failover.
//!
//! Layers, leaves first: transport (one POST, direct or via a relay),
//! failover (sequential relay sweep with a sticky preferred relay), and the
//! client facade (authenticate, search_read, create). The wire codec lives
//! in `odoo-rpc-protocol`.

pub mod client;
pub mod config;
pub mod error;
pub mod failover;
pub mod relay;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use client::{OdooClient, Session};
pub use config::ClientConfig;
pub use error::RpcError;
pub use failover::{Failover, FailoverState};
pub use odoo_rpc_protocol::{Struct, Value};
pub use relay::Relay;
pub use transport::{Endpoint, HttpTransport, ReqwestTransport};

use std::path::PathBuf;

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs_or_home() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn dirs_or_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
