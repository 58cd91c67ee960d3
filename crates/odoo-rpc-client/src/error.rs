//! Client error taxonomy.
//!
//! Transport-class kinds are retried across relays and only surface inside
//! `AllRelaysFailed`. Remote rejections and the mixed-content guard are
//! returned immediately.

use std::time::Duration;

use odoo_rpc_protocol::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("refusing http:// target {target} from https:// origin {origin}")]
    InsecureSchemeMismatch { target: String, origin: String },
    #[error("request via {relay} timed out after {timeout:?}")]
    Timeout { relay: String, timeout: Duration },
    #[error("network failure via {relay}: {message}")]
    NetworkFailure { relay: String, message: String },
    #[error("http status {status} via {relay}")]
    HttpError { relay: String, status: u16 },
    #[error("empty response body")]
    EmptyResponse,
    #[error("malformed xml response: {0}")]
    MalformedXml(String),
    #[error("relay returned an error page: {excerpt}")]
    RelayError { excerpt: String },
    #[error("incomplete response: missing params/param/value")]
    IncompleteResponse,
    #[error("server fault: {message}")]
    RemoteFault { code: Option<i64>, message: String },
    #[error("authentication failed: invalid username or api key")]
    AuthenticationFailed,
    #[error("unexpected result from {method}: {detail}")]
    UnexpectedResult { method: String, detail: String },
    #[error(
        "all {attempts} relays failed, last via {relay}: {source}. \
         The server may be unreachable or blocking external requests"
    )]
    AllRelaysFailed {
        relay: String,
        attempts: usize,
        source: Box<RpcError>,
    },
}

impl RpcError {
    /// Whether another relay could plausibly succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RpcError::Timeout { .. }
                | RpcError::NetworkFailure { .. }
                | RpcError::HttpError { .. }
                | RpcError::EmptyResponse
                | RpcError::MalformedXml(_)
                | RpcError::RelayError { .. }
                | RpcError::IncompleteResponse
        )
    }

    /// The server was reached and said no (fix credentials or filters).
    pub fn is_remote_rejection(&self) -> bool {
        matches!(
            self,
            RpcError::RemoteFault { .. } | RpcError::AuthenticationFailed
        )
    }

    /// The server could not be reached at all (check connectivity or relays).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, RpcError::AllRelaysFailed { .. }) || self.is_retryable()
    }
}

impl From<ProtocolError> for RpcError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::EmptyResponse => RpcError::EmptyResponse,
            ProtocolError::MalformedXml(m) | ProtocolError::InvalidCall(m) => {
                RpcError::MalformedXml(m)
            }
            ProtocolError::RelayError { excerpt } => RpcError::RelayError { excerpt },
            ProtocolError::IncompleteResponse => RpcError::IncompleteResponse,
            ProtocolError::Fault { code, message } => RpcError::RemoteFault { code, message },
        }
    }
}
