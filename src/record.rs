//! Record model and JSON ingestion.
//!
//! A [`Record`] maps attribute names to an [`Attribute`]: an explicit null, a
//! scalar [`Value`], or a nested JSON structure the projector does not expand
//! by default. Scalar kinds are decided here, once, so everything downstream
//! switches over the closed [`Kind`](crate::data::Kind) set.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{
    data::{Value, parse_timestamp, timestamp_from_millis},
    error::{FrameError, FrameResult},
};

/// Envelope member some analytics endpoints wrap their result array in.
pub const RESULTS_MEMBER: &str = "results";

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Null,
    Scalar(Value),
    Nested(JsonValue),
}

impl Attribute {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Attribute::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Attribute::Nested(_))
    }
}

impl From<Value> for Attribute {
    fn from(value: Value) -> Self {
        Attribute::Scalar(value)
    }
}

macro_rules! scalar_attribute_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Attribute {
                fn from(value: $ty) -> Self {
                    Attribute::Scalar(Value::from(value))
                }
            }
        )*
    };
}

scalar_attribute_from!(&str, String, bool, f64, i64, chrono::DateTime<chrono::Utc>);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    attributes: BTreeMap<String, Attribute>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, attribute: Attribute) -> Option<Attribute> {
        self.attributes.insert(name.into(), attribute)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .map(|(name, attribute)| (name.as_str(), attribute))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn has_nested(&self) -> bool {
        self.attributes.values().any(Attribute::is_nested)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.attributes.retain(|name, _| keep(name));
    }

    /// Scalar attribute value rendered as a series label.
    pub fn label(&self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        self.get(name)
            .and_then(Attribute::as_scalar)
            .map(Value::as_display)
    }
}

impl<K: Into<String>> FromIterator<(K, Attribute)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Attribute)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(name, attribute)| (name.into(), attribute))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestOptions {
    /// Attributes decoded as timestamps (epoch milliseconds or RFC 3339 text).
    #[serde(default)]
    pub timestamp_attributes: Vec<String>,
}

pub fn records_from_json(root: &JsonValue, options: &IngestOptions) -> FrameResult<Vec<Record>> {
    let items = match root {
        JsonValue::Array(items) => items,
        JsonValue::Object(map) => match map.get(RESULTS_MEMBER) {
            Some(JsonValue::Array(items)) => items,
            _ => {
                return Err(FrameError::MalformedInput {
                    found: "object without a results array",
                });
            }
        },
        other => {
            return Err(FrameError::MalformedInput {
                found: json_type_name(other),
            });
        }
    };

    let timestamp_attributes = options
        .timestamp_attributes
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>();
    let records = items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            JsonValue::Object(map) => Ok(record_from_object(map, &timestamp_attributes)),
            other => Err(FrameError::MalformedRecord {
                index,
                found: json_type_name(other),
            }),
        })
        .collect::<FrameResult<Vec<_>>>()?;
    debug!("Ingested {} record(s)", records.len());
    Ok(records)
}

fn record_from_object(map: &Map<String, JsonValue>, timestamp_attributes: &HashSet<&str>) -> Record {
    map.iter()
        .map(|(name, value)| {
            let attribute = attribute_from_json(value);
            let attribute = if timestamp_attributes.contains(name.as_str()) {
                coerce_timestamp(name, attribute)
            } else {
                attribute
            };
            (name.clone(), attribute)
        })
        .collect()
}

pub fn attribute_from_json(value: &JsonValue) -> Attribute {
    match value {
        JsonValue::Null => Attribute::Null,
        JsonValue::Bool(b) => Attribute::Scalar(Value::Boolean(*b)),
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => Attribute::Scalar(Value::Integer(integer)),
            // u64 beyond i64 and fractional numbers both land here.
            None => number
                .as_f64()
                .map(|float| Attribute::Scalar(Value::Float(float)))
                .unwrap_or(Attribute::Null),
        },
        JsonValue::String(s) => Attribute::Scalar(Value::String(s.clone())),
        JsonValue::Array(_) | JsonValue::Object(_) => Attribute::Nested(value.clone()),
    }
}

fn coerce_timestamp(name: &str, attribute: Attribute) -> Attribute {
    let converted = match &attribute {
        Attribute::Scalar(Value::Integer(ms)) => timestamp_from_millis(*ms),
        Attribute::Scalar(Value::Float(ms)) if ms.is_finite() => {
            timestamp_from_millis(ms.round() as i64)
        }
        Attribute::Scalar(Value::String(text)) => parse_timestamp(text).ok(),
        _ => return attribute,
    };
    match converted {
        Some(ts) => Attribute::Scalar(Value::Timestamp(ts)),
        None => {
            debug!("Attribute '{name}' could not be decoded as a timestamp; keeping raw value");
            attribute
        }
    }
}

pub fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_kinds_are_decided_at_ingestion() {
        let root = json!([{"s": "x", "b": true, "i": 3, "f": 2.5, "n": null, "o": {"k": 1}}]);
        let records = records_from_json(&root, &IngestOptions::default()).unwrap();
        let record = &records[0];
        assert_eq!(record.get("s"), Some(&Attribute::from("x")));
        assert_eq!(record.get("b"), Some(&Attribute::from(true)));
        assert_eq!(record.get("i"), Some(&Attribute::from(3_i64)));
        assert_eq!(record.get("f"), Some(&Attribute::from(2.5)));
        assert_eq!(record.get("n"), Some(&Attribute::Null));
        assert!(record.get("o").is_some_and(Attribute::is_nested));
        assert!(record.has_nested());
    }

    #[test]
    fn results_envelope_is_unwrapped() {
        let root = json!({"results": [{"a": 1}, {"b": 2}]});
        let records = records_from_json(&root, &IngestOptions::default()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn non_object_element_is_malformed() {
        let root = json!([{"a": 1}, 7]);
        let err = records_from_json(&root, &IngestOptions::default()).unwrap_err();
        assert_eq!(
            err,
            FrameError::MalformedRecord {
                index: 1,
                found: "number"
            }
        );
    }

    #[test]
    fn scalar_root_is_malformed() {
        let err = records_from_json(&json!("nope"), &IngestOptions::default()).unwrap_err();
        assert_eq!(err, FrameError::MalformedInput { found: "string" });
    }

    #[test]
    fn timestamp_attributes_accept_millis_and_text() {
        let options = IngestOptions {
            timestamp_attributes: vec!["time".to_string()],
        };
        let root = json!([
            {"time": 1_700_000_000_000_i64},
            {"time": "2023-11-14T22:13:20Z"},
            {"time": "not a time"}
        ]);
        let records = records_from_json(&root, &options).unwrap();
        let expected = timestamp_from_millis(1_700_000_000_000).unwrap();
        assert_eq!(records[0].get("time"), Some(&Attribute::from(expected)));
        assert_eq!(records[1].get("time"), Some(&Attribute::from(expected)));
        assert_eq!(records[2].get("time"), Some(&Attribute::from("not a time")));
    }

    #[test]
    fn label_renders_scalars_only() {
        let record: Record = [
            ("series", Attribute::from("cpu0")),
            ("n", Attribute::from(4_i64)),
            ("gone", Attribute::Null),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.label("series").as_deref(), Some("cpu0"));
        assert_eq!(record.label("n").as_deref(), Some("4"));
        assert_eq!(record.label("gone"), None);
        assert_eq!(record.label(""), None);
    }
}
