//! Typed values carried on every port, register and receipt output.
//!
//! A [`Value`] is a tagged union: the variant is the kind and the variant's
//! payload is the only data it carries. On the wire a value is written as
//! `{"ptype": "<KIND>", "value": <payload>}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::receipt::Receipt;

/// Map of port or variable name to value.
pub type ValueMap = BTreeMap<String, Value>;

/// Discriminant of a [`Value`], used by parameter declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueKind {
    #[default]
    String,
    Ace,
    Bytes,
    Hidden,
    Boolean,
    Integer,
    Float,
    Key,
    Prefix,
    FixedListSingleSelect,
    FixedListMultiSelect,
    Url,
    UsCurrencyAmt,
    IpAddress,
    List,
    Cron,
    ObjectId,
    Owner,
    UniqueId,
    JobId,
    Vector,
    FeedId,
    ActionId,
    Datetime,
    Copy,
    StringMap,
    Username,
    Hostname,
    AnyTypeMap,
    CsvColumn,
    StreamParam,
    DisplayOnly,
    Receipt,
    Json,
}

/// A typed value. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ptype", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Value {
    String(String),
    Ace(String),
    Bytes(Vec<u8>),
    Hidden(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Key(String),
    Prefix(String),
    FixedListSingleSelect(String),
    FixedListMultiSelect(Vec<String>),
    Url(String),
    UsCurrencyAmt(f64),
    IpAddress(String),
    List(Vec<String>),
    Cron(String),
    ObjectId(String),
    Owner(String),
    UniqueId(String),
    JobId(String),
    Vector(Vec<f64>),
    FeedId(String),
    ActionId(String),
    /// Epoch seconds
    Datetime(i64),
    Copy(String),
    StringMap(BTreeMap<String, String>),
    Username(String),
    Hostname(String),
    AnyTypeMap(ValueMap),
    CsvColumn(String),
    StreamParam(String),
    DisplayOnly,
    Receipt(Box<Receipt>),
    /// JSON document stored as text
    Json(String),
}

impl Value {
    /// Infer a value from caller-supplied data.
    ///
    /// Precedence is boolean, integer, float, list, then string. Strings that
    /// read back exactly as an integer, or parse as a finite float, take the
    /// numeric kind.
    pub fn infer(data: &JsonValue) -> Self {
        match data {
            JsonValue::Bool(b) => Value::Boolean(*b),
            JsonValue::Number(n) => Self::from_number(n),
            JsonValue::String(s) => Self::infer_text(s),
            JsonValue::Array(items) => Value::List(items.iter().map(json_text).collect()),
            JsonValue::Null => Value::String(String::new()),
            JsonValue::Object(_) => Value::String(data.to_string()),
        }
    }

    /// Wrap data the engine produced itself (resolved inputs).
    ///
    /// Same precedence as [`Value::infer`] but strings stay strings and
    /// objects become [`Value::Json`].
    pub fn from_resolved(data: &JsonValue) -> Self {
        match data {
            JsonValue::Bool(b) => Value::Boolean(*b),
            JsonValue::Number(n) => Self::from_number(n),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(json_text).collect()),
            JsonValue::Null => Value::String(String::new()),
            JsonValue::Object(_) => Value::Json(data.to_string()),
        }
    }

    /// Build a string-family value of the given kind.
    ///
    /// Returns `None` when the kind does not carry text.
    pub fn string_of_kind(kind: ValueKind, text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let value = match kind {
            ValueKind::String => Value::String(text),
            ValueKind::Ace => Value::Ace(text),
            ValueKind::Hidden => Value::Hidden(text),
            ValueKind::Key => Value::Key(text),
            ValueKind::Prefix => Value::Prefix(text),
            ValueKind::FixedListSingleSelect => Value::FixedListSingleSelect(text),
            ValueKind::Url => Value::Url(text),
            ValueKind::IpAddress => Value::IpAddress(text),
            ValueKind::Cron => Value::Cron(text),
            ValueKind::ObjectId => Value::ObjectId(text),
            ValueKind::Owner => Value::Owner(text),
            ValueKind::UniqueId => Value::UniqueId(text),
            ValueKind::JobId => Value::JobId(text),
            ValueKind::FeedId => Value::FeedId(text),
            ValueKind::ActionId => Value::ActionId(text),
            ValueKind::Copy => Value::Copy(text),
            ValueKind::Username => Value::Username(text),
            ValueKind::Hostname => Value::Hostname(text),
            ValueKind::CsvColumn => Value::CsvColumn(text),
            ValueKind::StreamParam => Value::StreamParam(text),
            ValueKind::Json => Value::Json(text),
            _ => return None,
        };
        Some(value)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Ace(_) => ValueKind::Ace,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Hidden(_) => ValueKind::Hidden,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Key(_) => ValueKind::Key,
            Value::Prefix(_) => ValueKind::Prefix,
            Value::FixedListSingleSelect(_) => ValueKind::FixedListSingleSelect,
            Value::FixedListMultiSelect(_) => ValueKind::FixedListMultiSelect,
            Value::Url(_) => ValueKind::Url,
            Value::UsCurrencyAmt(_) => ValueKind::UsCurrencyAmt,
            Value::IpAddress(_) => ValueKind::IpAddress,
            Value::List(_) => ValueKind::List,
            Value::Cron(_) => ValueKind::Cron,
            Value::ObjectId(_) => ValueKind::ObjectId,
            Value::Owner(_) => ValueKind::Owner,
            Value::UniqueId(_) => ValueKind::UniqueId,
            Value::JobId(_) => ValueKind::JobId,
            Value::Vector(_) => ValueKind::Vector,
            Value::FeedId(_) => ValueKind::FeedId,
            Value::ActionId(_) => ValueKind::ActionId,
            Value::Datetime(_) => ValueKind::Datetime,
            Value::Copy(_) => ValueKind::Copy,
            Value::StringMap(_) => ValueKind::StringMap,
            Value::Username(_) => ValueKind::Username,
            Value::Hostname(_) => ValueKind::Hostname,
            Value::AnyTypeMap(_) => ValueKind::AnyTypeMap,
            Value::CsvColumn(_) => ValueKind::CsvColumn,
            Value::StreamParam(_) => ValueKind::StreamParam,
            Value::DisplayOnly => ValueKind::DisplayOnly,
            Value::Receipt(_) => ValueKind::Receipt,
            Value::Json(_) => ValueKind::Json,
        }
    }

    /// Text payload of string-family kinds.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::String(s)
            | Value::Ace(s)
            | Value::Hidden(s)
            | Value::Key(s)
            | Value::Prefix(s)
            | Value::FixedListSingleSelect(s)
            | Value::Url(s)
            | Value::IpAddress(s)
            | Value::Cron(s)
            | Value::ObjectId(s)
            | Value::Owner(s)
            | Value::UniqueId(s)
            | Value::JobId(s)
            | Value::FeedId(s)
            | Value::ActionId(s)
            | Value::Copy(s)
            | Value::Username(s)
            | Value::Hostname(s)
            | Value::CsvColumn(s)
            | Value::StreamParam(s)
            | Value::Json(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_receipt(&self) -> Option<&Receipt> {
        match self {
            Value::Receipt(receipt) => Some(&**receipt),
            _ => None,
        }
    }

    /// Resolve to plain data. Defined for every kind.
    pub fn resolve(&self) -> JsonValue {
        match self {
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) | Value::Datetime(i) => JsonValue::from(*i),
            Value::Float(f) | Value::UsCurrencyAmt(f) => float_json(*f),
            Value::Bytes(bytes) => JsonValue::from(bytes.clone()),
            Value::List(items) | Value::FixedListMultiSelect(items) => JsonValue::from(items.clone()),
            Value::Vector(items) => JsonValue::Array(items.iter().map(|f| float_json(*f)).collect()),
            Value::StringMap(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                    .collect(),
            ),
            Value::AnyTypeMap(map) => resolve_map(map),
            Value::Receipt(receipt) => receipt.resolve(),
            Value::Json(text) => {
                serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.clone()))
            }
            Value::DisplayOnly => JsonValue::Null,
            other => other
                .as_text()
                .map(|s| JsonValue::String(s.to_string()))
                .unwrap_or(JsonValue::Null),
        }
    }

    fn from_number(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            return Value::Integer(i);
        }
        match n.as_f64() {
            Some(f) => Value::Float(f),
            None => Value::String(n.to_string()),
        }
    }

    fn infer_text(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            if i.to_string() == text {
                return Value::Integer(i);
            }
        }
        if let Ok(f) = text.trim().parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        Value::String(text.to_string())
    }
}

/// Resolve every value of a map into one JSON object.
pub fn resolve_map(map: &ValueMap) -> JsonValue {
    JsonValue::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), v.resolve()))
            .collect(),
    )
}

fn float_json(f: f64) -> JsonValue {
    serde_json::Number::from_f64(f)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn json_text(item: &JsonValue) -> String {
    match item {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Receipt> for Value {
    fn from(receipt: Receipt) -> Self {
        Value::Receipt(Box::new(receipt))
    }
}
