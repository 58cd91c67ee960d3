//! Wire values and their XML-RPC encoding.
//!
//! Encoding is total: every `Value` renders to a `<value>` fragment.
//! Decoding never fails either; payloads it cannot interpret surface as
//! `Value::Unknown` carrying the raw text.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::xml::Element;

/// Wire format for `dateTime.iso8601` values we emit.
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Accepted naive layouts on decode (Odoo sends the compact form).
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y%m%dT%H:%M:%S",
    "%Y%m%dT%H%M%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// A single XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Str(String),
    Bool(bool),
    Nil,
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
    Struct(Struct),
    /// A node we could not interpret; holds its raw text.
    Unknown(String),
}

/// Insertion-ordered struct members. Lookups are by name, so member order
/// carries no meaning for callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Struct {
    members: Vec<(String, Value)>,
}

impl Struct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member, replacing the value in place if the name exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.members.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.members.push((name, value)),
        }
    }

    /// Builder-style `insert`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Struct {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut s = Struct::new();
        for (k, v) in iter {
            s.insert(k, v);
        }
        s
    }
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Short tag name for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Unknown(_) => "unknown",
        }
    }

    /// Render as a complete `<value>...</value>` fragment.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        encode_value(self, &mut out);
        out
    }

    /// Convert to JSON for display or export. Dates become their wire string,
    /// non-finite doubles become null.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Int(i) => Json::from(*i),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) | Value::Unknown(s) => Json::String(s.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::Nil => Json::Null,
            Value::DateTime(dt) => Json::String(dt.format(DATETIME_FORMAT).to_string()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Struct(s) => Json::Object(
                s.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Native conversions
// ============================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

/// Whole, finite floats in i64 range encode as `Int`; use `Value::Double`
/// directly to force a double on the wire.
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
            Value::Int(v as i64)
        } else {
            Value::Double(v)
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Self {
        Value::Struct(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Nil, Value::from),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Struct(map.into_iter().collect()),
        }
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Escape the five XML metacharacters. `&` goes first so entities produced
/// by later substitutions are not escaped twice.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Append `<value>...</value>` for `value` to `out`.
pub fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        Value::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        Value::Str(s) | Value::Unknown(s) => {
            out.push_str("<string>");
            out.push_str(&escape_xml(s));
            out.push_str("</string>");
        }
        Value::Bool(b) => {
            out.push_str(if *b {
                "<boolean>1</boolean>"
            } else {
                "<boolean>0</boolean>"
            });
        }
        Value::Nil => out.push_str("<nil/>"),
        Value::DateTime(dt) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&dt.format(DATETIME_FORMAT).to_string());
            out.push_str("</dateTime.iso8601>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(s) => {
            out.push_str("<struct>");
            for (name, member) in s.iter() {
                out.push_str("<member><name>");
                out.push_str(&escape_xml(name));
                out.push_str("</name>");
                encode_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

// ============================================================================
// Decode
// ============================================================================

/// Decode a `<value>` element. With no type child the text is a string
/// (the XML-RPC default).
pub fn decode_value(value: &Element) -> Value {
    match value.first_child() {
        Some(typed) => decode_typed(typed),
        None => Value::Str(value.text.clone()),
    }
}

/// Decode a typed element (`<int>`, `<struct>`, ...).
pub fn decode_typed(element: &Element) -> Value {
    match element.name.as_str() {
        "string" => Value::Str(element.text.clone()),
        "int" | "i4" | "i8" => parse_int(&element.text),
        "double" => parse_double(&element.text),
        "boolean" => {
            let text = element.text.trim();
            Value::Bool(text == "1" || text == "true")
        }
        "datetime.iso8601" => match parse_datetime(&element.text) {
            Some(dt) => Value::DateTime(dt),
            None => unknown(element),
        },
        "array" => {
            let items = element
                .child("data")
                .map(|data| {
                    data.children
                        .iter()
                        .map(|item| {
                            if item.name == "value" {
                                decode_value(item)
                            } else {
                                decode_typed(item)
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            Value::Array(items)
        }
        "struct" => {
            let mut s = Struct::new();
            for member in element.children_named("member") {
                if let (Some(name), Some(value)) = (member.child("name"), member.child("value")) {
                    s.insert(name.text.clone(), decode_value(value));
                }
            }
            Value::Struct(s)
        }
        "nil" => Value::Nil,
        _ => unknown(element),
    }
}

fn unknown(element: &Element) -> Value {
    tracing::debug!(tag = %element.name, "codec: uninterpretable wire value");
    Value::Unknown(element.text.clone())
}

fn parse_int(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Int(0);
    }
    trimmed
        .parse::<i64>()
        .map(Value::Int)
        .unwrap_or_else(|_| Value::Unknown(text.to_string()))
}

fn parse_double(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Double(0.0);
    }
    trimmed
        .parse::<f64>()
        .map(Value::Double)
        .unwrap_or_else(|_| Value::Unknown(text.to_string()))
}

/// Parse the date layouts seen on the wire. Naive times are taken as UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|n| Utc.from_utc_datetime(&n))
}
