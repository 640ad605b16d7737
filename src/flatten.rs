//! Opt-in expansion of nested attribute values into dotted sub-columns.
//!
//! Naming rule: member `child` of attribute `parent` becomes `parent.child`,
//! array element `i` becomes `parent.i`, applied recursively. An empty object
//! or array leaves an explicit null under its own name. When an expanded name
//! collides with an attribute the record already carries at top level, the
//! top-level attribute wins.

use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::record::{Attribute, Record, attribute_from_json};

pub const PATH_SEPARATOR: char = '.';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "kebab-case")]
pub enum NestedPolicy {
    /// Null the cell and record a warning
    #[default]
    Skip,
    /// Keep the compact JSON text as a string cell
    Opaque,
    /// Expand into dotted sub-columns before unification
    Expand,
}

/// Expands every record that carries a nested value; other records pass
/// through untouched.
pub fn expand_nested(records: Vec<Record>) -> Vec<Record> {
    let mut expanded = 0usize;
    let records = records
        .into_iter()
        .map(|record| {
            if record.has_nested() {
                expanded += 1;
                expand_record(&record)
            } else {
                record
            }
        })
        .collect();
    if expanded > 0 {
        debug!("Expanded nested attributes in {expanded} record(s)");
    }
    records
}

fn expand_record(record: &Record) -> Record {
    let mut out = Record::new();
    for (name, attribute) in record.iter() {
        if !attribute.is_nested() {
            out.insert(name, attribute.clone());
        }
    }
    for (name, attribute) in record.iter() {
        if let Attribute::Nested(json) = attribute {
            let mut leaves = Vec::new();
            collect_leaves(name, json, &mut leaves);
            for (path, leaf) in leaves {
                if out.contains(&path) {
                    warn!("Expanded attribute '{path}' collides with an existing attribute; keeping the existing value");
                    continue;
                }
                out.insert(path, leaf);
            }
        }
    }
    out
}

fn collect_leaves(prefix: &str, value: &JsonValue, leaves: &mut Vec<(String, Attribute)>) {
    match value {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                collect_leaves(&join_path(prefix, key), child, leaves);
            }
        }
        JsonValue::Array(items) if !items.is_empty() => {
            for (idx, child) in items.iter().enumerate() {
                collect_leaves(&join_path(prefix, &idx.to_string()), child, leaves);
            }
        }
        JsonValue::Object(_) | JsonValue::Array(_) => {
            leaves.push((prefix.to_string(), Attribute::Null));
        }
        scalar => leaves.push((prefix.to_string(), attribute_from_json(scalar))),
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    let mut path = String::with_capacity(prefix.len() + segment.len() + 1);
    path.push_str(prefix);
    path.push(PATH_SEPARATOR);
    path.push_str(segment);
    path
}
