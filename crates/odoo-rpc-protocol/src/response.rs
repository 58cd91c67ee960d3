//! `<methodResponse>` documents.
//!
//! Parse order: empty body, XML well-formedness, fault, then the single
//! `params/param/value`. Only `Fault` means the remote server itself
//! answered; every other error points at the transport or a relay.

use crate::value::{decode_value, encode_value, Struct, Value};
use crate::xml::parse_document;
use crate::{ProtocolError, Result, RELAY_EXCERPT_CHARS, XML_DECLARATION};

/// Parse a response body into its success value.
pub fn parse_response(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Err(ProtocolError::EmptyResponse);
    }

    let root = match parse_document(body) {
        Ok(root) => root,
        Err(reason) => {
            if body.to_ascii_lowercase().contains("error") {
                return Err(ProtocolError::RelayError {
                    excerpt: excerpt(body),
                });
            }
            return Err(ProtocolError::MalformedXml(reason));
        }
    };

    if let Some(fault) = root.find("fault") {
        let decoded = fault.child("value").map(decode_value).unwrap_or(Value::Nil);
        return Err(fault_from_value(&decoded));
    }

    root.find("params")
        .and_then(|params| params.child("param"))
        .and_then(|param| param.child("value"))
        .map(decode_value)
        .ok_or(ProtocolError::IncompleteResponse)
}

fn fault_from_value(value: &Value) -> ProtocolError {
    let Some(s) = value.as_struct() else {
        return ProtocolError::Fault {
            code: None,
            message: value.to_json().to_string(),
        };
    };
    let code = match s.get("faultCode") {
        Some(Value::Int(c)) => Some(*c),
        Some(Value::Str(c)) => c.trim().parse().ok(),
        _ => None,
    };
    let message = match s.get("faultString") {
        Some(Value::Str(m)) => m.clone(),
        Some(other) => other.to_json().to_string(),
        None => "unknown fault".to_string(),
    };
    ProtocolError::Fault { code, message }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    let mut out: String = trimmed.chars().take(RELAY_EXCERPT_CHARS).collect();
    if trimmed.chars().count() > RELAY_EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

/// Build a success response carrying `value`.
pub fn build_success_response(value: &Value) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push_str("\n<methodResponse><params><param>");
    encode_value(value, &mut out);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Build a fault response with the conventional `faultCode`/`faultString`.
pub fn build_fault_response(code: i64, message: &str) -> String {
    let fault = Struct::new()
        .with("faultCode", code)
        .with("faultString", message);
    let mut out = String::from(XML_DECLARATION);
    out.push_str("\n<methodResponse><fault>");
    encode_value(&Value::Struct(fault), &mut out);
    out.push_str("</fault></methodResponse>");
    out
}
