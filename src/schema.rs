//! Column model and the schema unifier.
//!
//! Records returned by one analytics query need not share attributes.
//! [`unify`] computes the superset of their attribute names, minus the series
//! discriminator, in byte-wise lexicographic order so that the column order
//! depends only on which names were seen, never on arrival order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{data::Kind, record::Record};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: Kind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: Kind,
    pub non_null: usize,
    pub nulls: usize,
}

/// Ordered union of attribute names across `records`, excluding `excluded`
/// (an empty `excluded` excludes nothing). Null-valued attributes still
/// contribute their name.
pub fn unify(records: &[Record], excluded: &str) -> Vec<String> {
    let mut names = BTreeSet::new();
    for record in records {
        for name in record.names() {
            if !excluded.is_empty() && name == excluded {
                continue;
            }
            names.insert(name);
        }
    }
    names.into_iter().map(str::to_string).collect()
}

pub fn column_index(columns: &[Column], name: &str) -> Option<usize> {
    columns.iter().position(|column| column.name == name)
}
