//! # FORZIUM PARAMETER VALUE MODEL
//!
//! **CRITICAL**: Every raw or coerced parameter value flows through [`Value`].
//! **MANDATE**: Type names reported in errors MUST come from [`Value::type_name`].

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::{error_codes, ProjectError};

/// Keyed parameter container (query string, path segments, body fields).
/// Keys keep the order they arrived in.
pub type Map = IndexMap<String, Value>;

/// **PARAMETER VALUE**
///
/// Untyped input as received from the transport, and the native value it is
/// coerced into. `Null` stands for a key that is present without a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Map),
    Date(DateTime<Utc>),
}

impl Value {
    /// Runtime type tag, used for dispatch and for error output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
        }
    }

    /// Loose truthiness: `null`, `false`, `0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Date(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(date) => Some(date),
            _ => None,
        }
    }

    /// Numeric interpretation of a string or number, `None` when the value
    /// does not read as a finite number. Surrounding whitespace is ignored,
    /// an empty string is not a number.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }
}

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Rust accepts `inf`/`nan` spellings, none of which are finite
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integral numbers print without a fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub(crate) fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(","))
            }
            Value::Object(_) => {
                let json = serde_json::Value::from(self.clone());
                write!(f, "{json}")
            }
            Value::Date(date) => f.write_str(&format_date(date)),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(n as i64)
                } else {
                    serde_json::Number::from_f64(n)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
            }
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, serde_json::Value::from(value)))
                    .collect(),
            ),
            Value::Date(date) => serde_json::Value::String(format_date(&date)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(map) => serializer.collect_map(map),
            Value::Date(date) => serializer.serialize_str(&format_date(date)),
        }
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

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

/// **DATA TYPE VOCABULARY**
///
/// The fixed set of kinds a parameter may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Object,
}

impl DataType {
    /// Coercion order. Ambiguous raw input resolves to the first kind in this
    /// list that the parameter accepts and that can represent it.
    pub const PRIORITY: [DataType; 6] = [
        DataType::Array,
        DataType::Object,
        DataType::Date,
        DataType::Boolean,
        DataType::Number,
        DataType::String,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Array => "array",
            DataType::Object => "object",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(DataType::String),
            "number" => Ok(DataType::Number),
            "boolean" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            "array" => Ok(DataType::Array),
            "object" => Ok(DataType::Object),
            _ => Err(ProjectError::schema(
                error_codes::UNKNOWN_DATA_TYPE,
                format!("Unknown data type `{s}`"),
            )),
        }
    }
}

/// Removes repeated kinds, keeping the first occurrence.
pub fn dedupe_data_types(types: impl IntoIterator<Item = DataType>) -> Vec<DataType> {
    let mut unique: Vec<DataType> = Vec::new();
    for data_type in types {
        if !unique.contains(&data_type) {
            unique.push(data_type);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from("a").type_name(), "string");
        assert_eq!(Value::from(1).type_name(), "number");
        assert_eq!(Value::from(vec![1, 2]).type_name(), "array");
        assert_eq!(Value::Object(Map::new()).type_name(), "object");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::from(" 42 ").to_number(), Some(42.0));
        assert_eq!(Value::from("1e3").to_number(), Some(1000.0));
        assert_eq!(Value::from("").to_number(), None);
        assert_eq!(Value::from("inf").to_number(), None);
        assert_eq!(Value::from("NaN").to_number(), None);
        assert_eq!(Value::from("12abc").to_number(), None);
        assert_eq!(Value::from(true).to_number(), None);
    }

    #[test]
    fn test_display_matches_message_format() {
        assert_eq!(Value::from(50).to_string(), "50");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "a,b");
        let date = Utc.with_ymd_and_hms(2012, 2, 20, 0, 0, 0).unwrap();
        assert_eq!(Value::from(date).to_string(), "2012-02-20T00:00:00.000Z");
    }

    #[test]
    fn test_json_conversion() {
        let value = Value::from(json!({"cat": {"name": "Tom", "lives": 9}, "tags": ["a"]}));
        let cat = value.as_object().unwrap()["cat"].as_object().unwrap();
        assert_eq!(cat["lives"], Value::Number(9.0));

        let back = serde_json::Value::from(value);
        assert_eq!(back, json!({"cat": {"name": "Tom", "lives": 9}, "tags": ["a"]}));
    }

    #[test]
    fn test_object_keys_keep_arrival_order() {
        let value = Value::from(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(value.to_string(), r#"{"zeta":1,"alpha":2,"mid":3}"#);
    }

    #[test]
    fn test_serialize_dates_as_iso_strings() {
        let date = Utc.timestamp_millis_opt(1_329_696_000_000).unwrap();
        let encoded = serde_json::to_string(&Value::from(vec![Value::Date(date)])).unwrap();
        assert_eq!(encoded, r#"["2012-02-20T00:00:00.000Z"]"#);
    }

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("NumBer".parse::<DataType>().unwrap(), DataType::Number);
        assert_eq!(" array ".parse::<DataType>().unwrap(), DataType::Array);
        let err = "integer".parse::<DataType>().unwrap_err();
        assert_eq!(err.code(), error_codes::UNKNOWN_DATA_TYPE);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let types = dedupe_data_types([
            DataType::String,
            DataType::Number,
            DataType::String,
        ]);
        assert_eq!(types, vec![DataType::String, DataType::Number]);
    }
}
