//! Columnar projection of heterogeneous records into a rectangular long table.
//!
//! Each column's [`Kind`] is locked by the first non-null value observed in
//! record order and never changes afterwards. Absent attributes and explicit
//! nulls become null cells without influencing the lock. A later value of a
//! different kind is unrepresentable: its cell is nulled and a
//! [`Warning::TypeConflict`] is recorded.

use std::{collections::HashMap, fmt};

use log::{debug, warn};

use crate::{
    data::{Kind, Value},
    flatten::NestedPolicy,
    record::{Attribute, Record},
    schema::{Column, ColumnSummary, column_index},
};

pub type Cell = Option<Value>;

/// Recoverable data-quality conditions observed while building a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    TypeConflict {
        column: String,
        row: usize,
        expected: Kind,
        found: Kind,
    },
    NestedValue {
        column: String,
        row: usize,
    },
    DuplicateSample {
        key: String,
        series: Option<String>,
        column: String,
    },
    /// Discriminator values of different kinds render to the same label and
    /// are merged into one series.
    MixedLabelKinds {
        series: String,
        row: usize,
        first: Kind,
        found: Kind,
    },
    RenamedColumn {
        from: String,
        to: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TypeConflict {
                column,
                row,
                expected,
                found,
            } => write!(
                f,
                "column '{column}' row {row}: {found} value does not fit locked kind {expected}; cell set to null"
            ),
            Warning::NestedValue { column, row } => {
                write!(f, "column '{column}' row {row}: nested value is not expanded")
            }
            Warning::DuplicateSample {
                key,
                series,
                column,
            } => match series {
                Some(series) => write!(
                    f,
                    "key {key}: series '{series}' supplied '{column}' more than once; keeping the last value"
                ),
                None => write!(
                    f,
                    "key {key}: '{column}' supplied more than once; keeping the last value"
                ),
            },
            Warning::MixedLabelKinds {
                series,
                row,
                first,
                found,
            } => write!(
                f,
                "row {row}: {found} label '{series}' merged with earlier {first} label of the same text"
            ),
            Warning::RenamedColumn { from, to } => {
                write!(f, "wide column '{from}' already exists; renamed to '{to}'")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    /// Discriminator attribute the series labels were read from, if any.
    pub discriminator: Option<String>,
    /// Series label per row, aligned with `rows`.
    pub series: Vec<Option<String>>,
    pub warnings: Vec<Warning>,
}

impl LongTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_index(&self.columns, name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summaries(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let non_null = self.rows.iter().filter(|row| row[idx].is_some()).count();
                ColumnSummary {
                    name: column.name.clone(),
                    kind: column.kind,
                    non_null,
                    nulls: self.rows.len() - non_null,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Projector<'a> {
    columns: &'a [String],
    discriminator: &'a str,
    nested: NestedPolicy,
}

impl<'a> Projector<'a> {
    pub fn new(columns: &'a [String]) -> Self {
        Self {
            columns,
            discriminator: "",
            nested: NestedPolicy::default(),
        }
    }

    /// Records each row's series label from this attribute.
    pub fn discriminator(mut self, name: &'a str) -> Self {
        self.discriminator = name;
        self
    }

    pub fn nested_policy(mut self, policy: NestedPolicy) -> Self {
        self.nested = policy;
        self
    }

    pub fn project(&self, records: &[Record]) -> LongTable {
        let mut kinds = vec![Kind::Null; self.columns.len()];
        let mut rows = Vec::with_capacity(records.len());
        let mut series = Vec::with_capacity(records.len());
        let mut warnings = Vec::new();
        let mut label_kinds = HashMap::new();

        for (row_idx, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(self.columns.len());
            for (col_idx, name) in self.columns.iter().enumerate() {
                let cell = match record.get(name) {
                    None | Some(Attribute::Null) => None,
                    Some(Attribute::Scalar(value)) => lock_cell(
                        &mut kinds[col_idx],
                        name,
                        row_idx,
                        value.clone(),
                        &mut warnings,
                    ),
                    Some(Attribute::Nested(json)) => {
                        push_warning(
                            &mut warnings,
                            Warning::NestedValue {
                                column: name.clone(),
                                row: row_idx,
                            },
                        );
                        match self.nested {
                            NestedPolicy::Opaque => lock_cell(
                                &mut kinds[col_idx],
                                name,
                                row_idx,
                                Value::String(json.to_string()),
                                &mut warnings,
                            ),
                            NestedPolicy::Skip | NestedPolicy::Expand => None,
                        }
                    }
                };
                row.push(cell);
            }
            rows.push(row);
            series.push(self.series_label(record, row_idx, &mut label_kinds, &mut warnings));
        }

        let columns = self
            .columns
            .iter()
            .zip(kinds)
            .map(|(name, kind)| Column::new(name.clone(), kind))
            .collect::<Vec<_>>();
        debug!(
            "Projected {} row(s) across {} column(s) with {} warning(s)",
            rows.len(),
            columns.len(),
            warnings.len()
        );
        LongTable {
            columns,
            rows,
            discriminator: (!self.discriminator.is_empty()).then(|| self.discriminator.to_string()),
            series,
            warnings,
        }
    }

    /// Label text plus a one-time warning when the same text was first seen
    /// with another kind (`1` and `"1"`).
    fn series_label(
        &self,
        record: &Record,
        row: usize,
        seen: &mut HashMap<String, (Kind, bool)>,
        warnings: &mut Vec<Warning>,
    ) -> Option<String> {
        let label = record.label(self.discriminator)?;
        let kind = record
            .get(self.discriminator)
            .and_then(Attribute::as_scalar)
            .map_or(Kind::Null, Value::kind);
        let (first, warned) = seen.entry(label.clone()).or_insert((kind, false));
        if *first != kind && !*warned {
            *warned = true;
            push_warning(
                warnings,
                Warning::MixedLabelKinds {
                    series: label.clone(),
                    row,
                    first: *first,
                    found: kind,
                },
            );
        }
        Some(label)
    }
}

/// Projects `records` onto `columns` without series labels or nested handling overrides.
pub fn project(records: &[Record], columns: &[String]) -> LongTable {
    Projector::new(columns).project(records)
}

fn lock_cell(
    locked: &mut Kind,
    column: &str,
    row: usize,
    value: Value,
    warnings: &mut Vec<Warning>,
) -> Cell {
    let kind = value.kind();
    if !locked.is_resolved() {
        *locked = kind;
        return Some(value);
    }
    if *locked == kind {
        return Some(value);
    }
    push_warning(
        warnings,
        Warning::TypeConflict {
            column: column.to_string(),
            row,
            expected: *locked,
            found: kind,
        },
    );
    None
}

pub(crate) fn push_warning(warnings: &mut Vec<Warning>, warning: Warning) {
    warn!("{warning}");
    warnings.push(warning);
}
