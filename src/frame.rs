//! End-to-end pipeline from a JSON analytics result to a finished frame.
//!
//! ingest → (nested expansion) → attribute selection → time window →
//! unify → project → pivot. A query with no rows in range is not an error:
//! the pivot step is skipped and an empty, schema-consistent frame comes back.

use log::{debug, info};
use serde_json::{Map, Value as JsonValue, json};

use crate::{
    data::{Kind, Value},
    error::{FrameError, FrameResult},
    flatten::{NestedPolicy, expand_nested},
    pivot::{Pivot, WideTable},
    project::{Cell, LongTable, Projector, Warning},
    query::QueryOptions,
    record::{Record, records_from_json},
    schema::{Column, ColumnSummary, unify},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameShape {
    Long,
    Wide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub name: String,
    pub shape: FrameShape,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    pub warnings: Vec<Warning>,
}

/// Row count alongside the column summaries, so an all-null or
/// discriminator-only result still reports its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnListing {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

impl Frame {
    /// Long frames carry the series label, when one was read, as a trailing
    /// output field named after the discriminator.
    pub fn from_long(name: impl Into<String>, table: LongTable) -> Self {
        let LongTable {
            mut columns,
            mut rows,
            discriminator,
            series,
            warnings,
        } = table;
        if let Some(discriminator) = discriminator {
            let kind = if series.iter().any(Option::is_some) {
                Kind::String
            } else {
                Kind::Null
            };
            columns.push(Column::new(discriminator, kind));
            for (row, label) in rows.iter_mut().zip(series) {
                row.push(label.map(Value::String));
            }
        }
        Self {
            name: name.into(),
            shape: FrameShape::Long,
            columns,
            rows,
            warnings,
        }
    }

    pub fn from_wide(name: impl Into<String>, table: WideTable) -> Self {
        Self {
            name: name.into(),
            shape: FrameShape::Wide,
            columns: table.columns,
            rows: table.rows,
            warnings: table.warnings,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column-oriented JSON: one entry per field with its kind and values,
    /// nulls kept in place.
    pub fn to_json(&self) -> JsonValue {
        let fields = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let values = self
                    .rows
                    .iter()
                    .map(|row| row[idx].as_ref().map_or(JsonValue::Null, |v| v.to_json()))
                    .collect::<Vec<_>>();
                let mut field = Map::new();
                field.insert("name".to_string(), JsonValue::from(column.name.clone()));
                field.insert("type".to_string(), JsonValue::from(column.kind.as_str()));
                field.insert("values".to_string(), JsonValue::Array(values));
                JsonValue::Object(field)
            })
            .collect::<Vec<_>>();
        json!({
            "name": self.name,
            "rows": self.row_count(),
            "fields": fields,
            "warnings": self.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        })
    }
}

pub fn build_frame(root: &JsonValue, options: &QueryOptions) -> FrameResult<Frame> {
    let records = records_from_json(root, &options.ingest_options())?;
    frame_records(records, options)
}

pub fn frame_records(records: Vec<Record>, options: &QueryOptions) -> FrameResult<Frame> {
    options.validate()?;
    let long = long_table(records, options);
    let name = options.metric.clone();
    if !options.pivot {
        info!(
            "Built long frame with {} row(s) and {} column(s)",
            long.row_count(),
            long.column_count()
        );
        return Ok(Frame::from_long(name, long));
    }

    let wide = match Pivot::new(&options.key, &options.discriminator)
        .separator(&options.separator)
        .run(&long)
    {
        Ok(wide) => wide,
        Err(FrameError::NoRows) => {
            debug!("No rows in range; emitting empty frame");
            empty_wide(&long, &options.key)
        }
        Err(err) => return Err(err),
    };
    info!(
        "Built wide frame with {} row(s) and {} column(s)",
        wide.row_count(),
        wide.columns.len()
    );
    Ok(Frame::from_wide(name, wide))
}

/// Column listing for the records a query would project.
pub fn describe_columns(
    root: &JsonValue,
    options: &QueryOptions,
) -> FrameResult<ColumnListing> {
    let records = records_from_json(root, &options.ingest_options())?;
    let long = long_table(records, options);
    Ok(ColumnListing {
        rows: long.row_count(),
        columns: long.summaries(),
    })
}

fn long_table(mut records: Vec<Record>, options: &QueryOptions) -> LongTable {
    // Expanded names must exist before a dotted selection can match them.
    if options.nested == NestedPolicy::Expand && records.iter().any(Record::has_nested) {
        records = expand_nested(records);
    }
    options.select_attributes(&mut records);
    let records = options.apply_window(records);
    let columns = unify(&records, &options.discriminator);
    Projector::new(&columns)
        .discriminator(&options.discriminator)
        .nested_policy(options.nested)
        .project(&records)
}

fn empty_wide(long: &LongTable, key: &str) -> WideTable {
    // An empty result may not even carry the key attribute.
    WideTable::empty_like(long, key).unwrap_or_else(|_| {
        let mut columns = vec![Column::new(key, Kind::Null)];
        columns.extend(long.columns.iter().cloned());
        WideTable {
            columns,
            rows: Vec::new(),
            warnings: long.warnings.clone(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(key: &str, discriminator: &str) -> QueryOptions {
        QueryOptions {
            metric: "test".to_string(),
            key: key.to_string(),
            discriminator: discriminator.to_string(),
            ..QueryOptions::default()
        }
    }

    #[test]
    fn empty_result_builds_empty_frame() {
        let frame = build_frame(&json!([]), &options("time", "")).unwrap();
        assert_eq!(frame.shape, FrameShape::Wide);
        assert_eq!(frame.row_count(), 0);
        assert_eq!(frame.column_names(), vec!["time"]);
        assert_eq!(frame.columns[0].kind, Kind::Null);
    }

    #[test]
    fn long_frame_skips_pivot() {
        let mut opts = options("", "");
        opts.pivot = false;
        let frame = build_frame(&json!([{"b": 1}, {"a": "x"}]), &opts).unwrap();
        assert_eq!(frame.shape, FrameShape::Long);
        assert_eq!(frame.column_names(), vec!["a", "b"]);
        assert_eq!(frame.rows[0], vec![None, Some(Value::Integer(1))]);
    }

    #[test]
    fn json_output_keeps_kinds_and_nulls() {
        let frame = build_frame(
            &json!([
                {"ts": 1, "series": "a", "val": 5},
                {"ts": 2, "series": "b", "val": 7}
            ]),
            &options("ts", "series"),
        )
        .unwrap();
        let rendered = frame.to_json();
        assert_eq!(rendered["name"], "test");
        assert_eq!(rendered["fields"][1]["name"], "a.val");
        assert_eq!(rendered["fields"][1]["type"], "integer");
        assert_eq!(rendered["fields"][1]["values"], json!([5, null]));
    }

    #[test]
    fn expand_policy_flattens_before_unify() {
        let mut opts = options("ts", "");
        opts.nested = NestedPolicy::Expand;
        let frame = build_frame(&json!([{"ts": 1, "mem": {"free": 10, "used": 2}}]), &opts).unwrap();
        assert_eq!(frame.column_names(), vec!["ts", "mem.free", "mem.used"]);
    }

    #[test]
    fn selection_matches_expanded_sub_columns() {
        let mut opts = options("ts", "");
        opts.nested = NestedPolicy::Expand;
        opts.attributes = vec!["cpu.load".to_string()];
        let root = json!([{"ts": 1, "cpu": {"load": 0.5, "temp": 40}}]);
        let frame = build_frame(&root, &opts).unwrap();
        assert_eq!(frame.column_names(), vec!["ts", "cpu.load"]);
        assert_eq!(frame.rows[0][1], Some(Value::Float(0.5)));
    }

    #[test]
    fn discriminator_only_records_keep_row_count() {
        let mut opts = options("", "series");
        opts.pivot = false;
        let root = json!([{"series": "a"}, {"series": "b"}]);
        let frame = build_frame(&root, &opts).unwrap();
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.column_names(), vec!["series"]);

        let rendered = frame.to_json();
        assert_eq!(rendered["rows"], 2);
        assert_eq!(rendered["fields"][0]["values"], json!(["a", "b"]));

        let listing = describe_columns(&root, &opts).unwrap();
        assert_eq!(listing.rows, 2);
        assert!(listing.columns.is_empty());
    }

    #[test]
    fn long_frame_appends_series_label() {
        let mut opts = options("ts", "series");
        opts.pivot = false;
        let frame = build_frame(
            &json!([
                {"ts": 1, "series": "a", "val": 5},
                {"ts": 1, "val": 7}
            ]),
            &opts,
        )
        .unwrap();
        assert_eq!(frame.column_names(), vec!["ts", "val", "series"]);
        assert_eq!(frame.columns[2].kind, Kind::String);
        assert_eq!(frame.rows[0][2], Some(Value::from("a")));
        assert_eq!(frame.rows[1][2], None);
    }

    #[test]
    fn malformed_input_is_a_query_error() {
        let err = build_frame(&json!([1]), &options("ts", "")).unwrap_err();
        assert!(matches!(err, FrameError::MalformedRecord { index: 0, .. }));
    }
}
