//! Single HTTP POST attempt, direct or through one relay.
//!
//! No retries here. The body is sent as `text/xml` with no other custom
//! headers: public relays tend to reject requests carrying headers they do
//! not expect.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::RpcError;
use crate::relay::Relay;

/// Relay label used in errors and logs for direct calls.
pub const DIRECT: &str = "direct";

/// Which Odoo XML-RPC service a call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `version`, `authenticate`.
    Common,
    /// `execute_kw` model calls.
    Object,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Common => "/xmlrpc/2/common",
            Endpoint::Object => "/xmlrpc/2/object",
        }
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum PostError {
    Timeout,
    Network(String),
}

pub type PostFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpReply, PostError>> + Send + 'a>>;

/// The HTTP seam. Production uses reqwest; tests substitute scripted fakes.
pub trait HttpTransport: Send + Sync {
    fn post_xml<'a>(&'a self, url: &'a str, body: String) -> PostFuture<'a>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_xml<'a>(&'a self, url: &'a str, body: String) -> PostFuture<'a> {
        Box::pin(async move {
            let resp = self
                .client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "text/xml")
                .body(body)
                .send()
                .await
                .map_err(classify)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(classify)?;
            Ok(HttpReply { status, body })
        })
    }
}

fn classify(err: reqwest::Error) -> PostError {
    if err.is_timeout() {
        PostError::Timeout
    } else {
        PostError::Network(err.to_string())
    }
}

/// Fail fast when an https:// page would call an http:// server; browsers
/// block that as mixed content anyway.
pub fn check_scheme(page_origin: Option<&str>, target: &str) -> Result<(), RpcError> {
    let Some(origin) = page_origin else {
        return Ok(());
    };
    let secure_page = origin.to_ascii_lowercase().starts_with("https://");
    let insecure_target = target.to_ascii_lowercase().starts_with("http://");
    if secure_page && insecure_target {
        return Err(RpcError::InsecureSchemeMismatch {
            target: target.to_string(),
            origin: origin.to_string(),
        });
    }
    Ok(())
}

/// POST `body` to `url`, through `relay` if given, bounded by `timeout`.
/// Returns the response body of a 2xx reply.
pub async fn post_once(
    transport: &dyn HttpTransport,
    url: &str,
    relay: Option<&Relay>,
    body: String,
    timeout: Duration,
) -> Result<String, RpcError> {
    let relay_name = relay.map_or(DIRECT, |r| r.name.as_str());
    let effective = match relay {
        Some(r) => r.rewrite(url),
        None => url.to_string(),
    };
    tracing::debug!(relay = relay_name, url = %effective, "transport: attempt");

    // Dropping the inner future on expiry aborts the request.
    let reply = match tokio::time::timeout(timeout, transport.post_xml(&effective, body)).await {
        Err(_) | Ok(Err(PostError::Timeout)) => {
            return Err(RpcError::Timeout {
                relay: relay_name.to_string(),
                timeout,
            })
        }
        Ok(Err(PostError::Network(message))) => {
            return Err(RpcError::NetworkFailure {
                relay: relay_name.to_string(),
                message,
            })
        }
        Ok(Ok(reply)) => reply,
    };

    if !(200..300).contains(&reply.status) {
        return Err(RpcError::HttpError {
            relay: relay_name.to_string(),
            status: reply.status,
        });
    }
    Ok(reply.body)
}
