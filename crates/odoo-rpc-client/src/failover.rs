//! Relay failover -- sequential sweep over the relay list.
//!
//! The sweep starts at the preferred relay and walks the list circularly,
//! one full attempt at a time. A success makes that relay preferred for the
//! next call. A remote fault ends the sweep at once: the real server was
//! reached and retrying elsewhere cannot change its answer. Attempts are
//! never raced, so non-idempotent calls go out at most once per relay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use odoo_rpc_protocol::{parse_response, Value};

use crate::error::RpcError;
use crate::relay::Relay;
use crate::transport::{self, HttpTransport, DIRECT};

/// Index of the relay the next sweep starts at.
///
/// One per client by default. Cloning shares the underlying counter, so
/// clients that should learn from each other can be handed the same state.
#[derive(Debug, Clone, Default)]
pub struct FailoverState {
    preferred: Arc<AtomicUsize>,
}

impl FailoverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preferred(&self) -> usize {
        self.preferred.load(Ordering::Relaxed)
    }

    fn set_preferred(&self, index: usize) {
        self.preferred.store(index, Ordering::Relaxed);
    }
}

/// Executes one call with relay failover.
pub struct Failover {
    transport: Arc<dyn HttpTransport>,
    relays: Vec<Relay>,
    use_proxy: bool,
    timeout: Duration,
    page_origin: Option<String>,
    state: FailoverState,
}

impl Failover {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        relays: Vec<Relay>,
        use_proxy: bool,
        timeout: Duration,
        page_origin: Option<String>,
    ) -> Self {
        Self {
            transport,
            relays,
            use_proxy,
            timeout,
            page_origin,
            state: FailoverState::new(),
        }
    }

    pub fn with_state(mut self, state: FailoverState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &FailoverState {
        &self.state
    }

    pub fn relays(&self) -> &[Relay] {
        &self.relays
    }

    /// True when calls go straight to the server.
    pub fn is_direct(&self) -> bool {
        !self.use_proxy || self.relays.is_empty()
    }

    /// POST `body` to `url` and decode the response.
    pub async fn call(&self, url: &str, body: &str) -> Result<Value, RpcError> {
        transport::check_scheme(self.page_origin.as_deref(), url)?;

        if self.is_direct() {
            let text =
                transport::post_once(&*self.transport, url, None, body.to_string(), self.timeout)
                    .await?;
            return Ok(parse_response(&text)?);
        }

        let count = self.relays.len();
        let start = self.state.preferred() % count;
        let mut last_failure: Option<(String, RpcError)> = None;

        for step in 0..count {
            let index = (start + step) % count;
            let relay = &self.relays[index];

            match self.attempt(url, relay, body).await {
                Ok(value) => {
                    if index != start {
                        tracing::info!(
                            relay = %relay.name,
                            index,
                            previous = start,
                            "failover: preferred relay changed"
                        );
                    }
                    self.state.set_preferred(index);
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::debug!(relay = %relay.name, error = %err, "failover: not retrying");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        relay = %relay.name,
                        attempt = step + 1,
                        of = count,
                        error = %err,
                        "failover: relay failed"
                    );
                    last_failure = Some((relay.name.clone(), err));
                }
            }
        }

        let (relay, source) = last_failure.unwrap_or_else(|| {
            (
                DIRECT.to_string(),
                RpcError::NetworkFailure {
                    relay: DIRECT.to_string(),
                    message: "no relay attempted".into(),
                },
            )
        });
        tracing::error!(relay = %relay, attempts = count, error = %source, "failover: all relays failed");
        Err(RpcError::AllRelaysFailed {
            relay,
            attempts: count,
            source: Box::new(source),
        })
    }

    async fn attempt(&self, url: &str, relay: &Relay, body: &str) -> Result<Value, RpcError> {
        let text = transport::post_once(
            &*self.transport,
            url,
            Some(relay),
            body.to_string(),
            self.timeout,
        )
        .await?;
        Ok(parse_response(&text)?)
    }
}
