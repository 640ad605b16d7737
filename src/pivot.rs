//! Long-to-wide pivot keyed on a shared (usually temporal) column.
//!
//! Rows are grouped by key value. Every distinct series label contributes one
//! wide column per non-key long column, named `<series><separator><column>`;
//! rows without a label keep the bare column name. Each key yields exactly one
//! wide row, in ascending key order with a null key first, and every
//! (series, column) pair the key lacks is null. A qualified name already
//! taken by an earlier column gets the first free `_<n>` suffix (from 2).

use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::{
    data::ComparableValue,
    error::{FrameError, FrameResult},
    project::{Cell, LongTable, Warning, push_warning},
    schema::{Column, column_index},
};

pub const DEFAULT_SEPARATOR: &str = ".";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    /// Key column first, then the fanned-out series columns.
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    pub warnings: Vec<Warning>,
}

impl WideTable {
    pub fn key_column(&self) -> Option<&Column> {
        self.columns.first()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_index(&self.columns, name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Wide shape for a table with no rows: the key column followed by the
    /// bare non-key columns, since no series labels were observed.
    pub fn empty_like(long: &LongTable, key_column: &str) -> FrameResult<Self> {
        let key_idx = long
            .column_index(key_column)
            .ok_or_else(|| FrameError::UnknownKeyColumn(key_column.to_string()))?;
        let mut columns = Vec::with_capacity(long.columns.len());
        columns.push(long.columns[key_idx].clone());
        columns.extend(
            long.columns
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != key_idx)
                .map(|(_, column)| column.clone()),
        );
        Ok(Self {
            columns,
            rows: Vec::new(),
            warnings: long.warnings.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Pivot<'a> {
    key_column: &'a str,
    discriminator: &'a str,
    separator: &'a str,
}

impl<'a> Pivot<'a> {
    pub fn new(key_column: &'a str, discriminator: &'a str) -> Self {
        Self {
            key_column,
            discriminator,
            separator: DEFAULT_SEPARATOR,
        }
    }

    pub fn separator(mut self, separator: &'a str) -> Self {
        self.separator = separator;
        self
    }

    pub fn run(&self, long: &LongTable) -> FrameResult<WideTable> {
        if long.rows.is_empty() {
            return Err(FrameError::NoRows);
        }
        let key_idx = long
            .column_index(self.key_column)
            .ok_or_else(|| FrameError::UnknownKeyColumn(self.key_column.to_string()))?;
        let labels = self.row_labels(long)?;
        let value_indices = (0..long.columns.len())
            .filter(|idx| *idx != key_idx)
            .collect::<Vec<_>>();

        let series = labels.iter().copied().sorted().dedup().collect::<Vec<_>>();
        let mut warnings = long.warnings.clone();
        let mut offsets = HashMap::with_capacity(series.len());
        let mut columns = Vec::with_capacity(1 + series.len() * value_indices.len());
        let mut taken = HashSet::with_capacity(columns.capacity());
        let key = long.columns[key_idx].clone();
        taken.insert(key.name.clone());
        columns.push(key);
        for label in &series {
            offsets.insert(*label, columns.len());
            for &idx in &value_indices {
                let column = &long.columns[idx];
                let name = unique_name(
                    self.qualify(*label, &column.name),
                    &mut taken,
                    &mut warnings,
                );
                columns.push(Column::new(name, column.kind));
            }
        }

        let width = columns.len();
        let mut groups: BTreeMap<ComparableValue, Vec<Cell>> = BTreeMap::new();
        for (row, label) in long.rows.iter().zip(&labels) {
            let key = ComparableValue(row[key_idx].clone());
            let wide = groups
                .entry(key.clone())
                .or_insert_with(|| vec![None; width]);
            let base = offsets[label];
            for (offset, &idx) in value_indices.iter().enumerate() {
                let Some(value) = &row[idx] else {
                    continue;
                };
                let target = &mut wide[base + offset];
                if target.is_some() {
                    push_warning(
                        &mut warnings,
                        Warning::DuplicateSample {
                            key: describe_key(&key),
                            series: label.map(str::to_string),
                            column: long.columns[idx].name.clone(),
                        },
                    );
                }
                *target = Some(value.clone());
            }
        }

        let rows = groups
            .into_iter()
            .map(|(key, mut cells)| {
                cells[0] = key.0;
                cells
            })
            .collect::<Vec<_>>();
        debug!(
            "Pivoted {} long row(s) into {} wide row(s) across {} series",
            long.rows.len(),
            rows.len(),
            series.len()
        );
        Ok(WideTable {
            columns,
            rows,
            warnings,
        })
    }

    fn row_labels<'t>(&self, long: &'t LongTable) -> FrameResult<Vec<Option<&'t str>>> {
        if self.discriminator.is_empty() {
            return Ok(vec![None; long.rows.len()]);
        }
        if long.discriminator.as_deref() != Some(self.discriminator) {
            return Err(FrameError::InvalidOptions(format!(
                "table was projected without series labels from '{}'",
                self.discriminator
            )));
        }
        Ok(long.series.iter().map(Option::as_deref).collect())
    }

    fn qualify(&self, label: Option<&str>, column: &str) -> String {
        match label {
            Some(label) => format!("{label}{}{column}", self.separator),
            None => column.to_string(),
        }
    }
}

/// Pivots `long` on `key_column`, fanning columns out per `discriminator`
/// label. A zero-row table yields [`FrameError::NoRows`]; callers emit
/// [`WideTable::empty_like`] instead.
pub fn pivot(long: &LongTable, key_column: &str, discriminator: &str) -> FrameResult<WideTable> {
    Pivot::new(key_column, discriminator).run(long)
}

fn unique_name(
    candidate: String,
    taken: &mut HashSet<String>,
    warnings: &mut Vec<Warning>,
) -> String {
    if taken.insert(candidate.clone()) {
        return candidate;
    }
    let renamed = (2..)
        .map(|n| format!("{candidate}_{n}"))
        .find(|name| !taken.contains(name))
        .unwrap_or_default();
    taken.insert(renamed.clone());
    push_warning(
        warnings,
        Warning::RenamedColumn {
            from: candidate,
            to: renamed.clone(),
        },
    );
    renamed
}

fn describe_key(key: &ComparableValue) -> String {
    match &key.0 {
        Some(value) => value.as_display(),
        None => "null".to_string(),
    }
}
