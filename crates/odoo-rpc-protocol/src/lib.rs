//! Odoo RPC Protocol -- XML-RPC value codec, request builder, response parser.
//!
//! Pure codec, no I/O. A request is `<methodCall>` with one `<param>` per
//! argument; a response is either `params/param/value` or a `<fault>`.
//! The server-side mirror (call parsing, response building) lives here too
//! so the wire format is owned in one place.

pub mod request;
pub mod response;
pub mod value;
pub mod xml;

pub use request::{build_request, MethodCall};
pub use response::{build_fault_response, build_success_response, parse_response};
pub use value::{Struct, Value};

/// XML declaration prefixed to every document we emit.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0"?>"#;

/// Maximum characters of a non-XML body quoted back in a relay error.
pub const RELAY_EXCERPT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty response body")]
    EmptyResponse,
    #[error("malformed xml: {0}")]
    MalformedXml(String),
    #[error("relay returned a non-xml error page: {excerpt}")]
    RelayError { excerpt: String },
    #[error("incomplete response: missing params/param/value")]
    IncompleteResponse,
    #[error("remote fault: {message}")]
    Fault { code: Option<i64>, message: String },
    #[error("invalid method call: {0}")]
    InvalidCall(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
