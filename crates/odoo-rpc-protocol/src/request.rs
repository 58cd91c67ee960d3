//! `<methodCall>` documents.

use crate::value::{decode_value, encode_value, escape_xml, Value};
use crate::xml::parse_document;
use crate::{ProtocolError, Result, XML_DECLARATION};

/// Build a complete request document. The method name is written as
/// escaped text content, never as raw markup.
pub fn build_request(method: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(128 + params.len() * 64);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape_xml(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// A method name plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method_name: String,
    pub params: Vec<Value>,
}

impl MethodCall {
    pub fn new(method_name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            params,
        }
    }

    pub fn to_xml(&self) -> String {
        build_request(&self.method_name, &self.params)
    }

    /// Parse a request document (server side). A missing `<params>` means
    /// no arguments; a `<param>` without a `<value>` is rejected.
    pub fn parse(body: &str) -> Result<Self> {
        let root = parse_document(body).map_err(ProtocolError::MalformedXml)?;
        if root.name != "methodcall" {
            return Err(ProtocolError::InvalidCall(format!(
                "root element is <{}>, expected <methodCall>",
                root.name
            )));
        }
        let method_name = root
            .child("methodname")
            .map(|m| m.text.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ProtocolError::InvalidCall("missing methodName".into()))?;

        let mut params = Vec::new();
        if let Some(list) = root.child("params") {
            for (i, param) in list.children_named("param").enumerate() {
                let value = param.child("value").ok_or_else(|| {
                    ProtocolError::InvalidCall(format!("param {i} has no value"))
                })?;
                params.push(decode_value(value));
            }
        }

        Ok(Self {
            method_name,
            params,
        })
    }
}
