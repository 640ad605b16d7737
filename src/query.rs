//! Per-invocation query options: attribute selection, time window, pivot
//! layout and ingestion hints.
//!
//! Options are explicit values handed to [`crate::frame::build_frame`]; the
//! engine never consults process-wide defaults. A YAML query file can seed
//! them and command-line flags override individual fields.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    error::{FrameError, FrameResult},
    flatten::NestedPolicy,
    pivot::DEFAULT_SEPARATOR,
    record::{Attribute, IngestOptions, Record},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TimeWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Inclusive on both ends.
    pub fn contains_millis(&self, millis: i64) -> bool {
        if let Some(from) = self.from
            && millis < from.timestamp_millis()
        {
            return false;
        }
        if let Some(to) = self.to
            && millis > to.timestamp_millis()
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct QueryOptions {
    /// Label for the produced frame, usually the metric name.
    pub metric: String,
    /// Attribute names (or dotted prefixes) to keep; empty keeps all.
    pub attributes: Vec<String>,
    pub discriminator: String,
    pub key: String,
    pub window: TimeWindow,
    pub nested: NestedPolicy,
    pub separator: String,
    pub pivot: bool,
    pub timestamp_attributes: Vec<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            metric: String::new(),
            attributes: Vec::new(),
            discriminator: String::new(),
            key: String::new(),
            window: TimeWindow::default(),
            nested: NestedPolicy::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
            pivot: true,
            timestamp_attributes: Vec::new(),
        }
    }
}

impl QueryOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening query file {path:?}"))?;
        let reader = BufReader::new(file);
        let options: QueryOptions =
            serde_yaml::from_reader(reader).context("Parsing query YAML")?;
        debug!("Loaded query options from {path:?}: {options:?}");
        Ok(options)
    }

    pub fn validate(&self) -> FrameResult<()> {
        if self.pivot && self.key.is_empty() {
            return Err(FrameError::InvalidOptions(
                "a key column is required to pivot".to_string(),
            ));
        }
        if !self.window.is_unbounded() && self.key.is_empty() {
            return Err(FrameError::InvalidOptions(
                "a time window needs a key column to filter on".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (self.window.from, self.window.to)
            && from > to
        {
            return Err(FrameError::InvalidOptions(format!(
                "window start {from} is after window end {to}"
            )));
        }
        if !self.discriminator.is_empty() && self.discriminator == self.key {
            return Err(FrameError::InvalidOptions(
                "discriminator and key must name different attributes".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            timestamp_attributes: self.timestamp_attributes.clone(),
        }
    }

    /// Keeps selected attributes plus the key and discriminator.
    pub fn select_attributes(&self, records: &mut [Record]) {
        if self.attributes.is_empty() {
            return;
        }
        let selected = self
            .attributes
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect::<Vec<_>>();
        for record in records.iter_mut() {
            record.retain(|name| {
                name == self.key
                    || name == self.discriminator
                    || attribute_selected(&selected, name)
            });
        }
    }

    /// Drops records whose key falls outside the window. Records with a
    /// missing, null or non-temporal key are kept.
    pub fn apply_window(&self, records: Vec<Record>) -> Vec<Record> {
        if self.window.is_unbounded() || self.key.is_empty() {
            return records;
        }
        let before = records.len();
        let kept = records
            .into_iter()
            .filter(|record| {
                match record
                    .get(&self.key)
                    .and_then(Attribute::as_scalar)
                    .and_then(Value::as_epoch_millis)
                {
                    Some(millis) => self.window.contains_millis(millis),
                    None => true,
                }
            })
            .collect::<Vec<_>>();
        debug!(
            "Time window kept {} of {} record(s)",
            kept.len(),
            before
        );
        kept
    }
}

fn attribute_selected(selected: &[String], name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    selected.iter().any(|prefix| {
        lowered == *prefix
            || (lowered.len() > prefix.len()
                && lowered.starts_with(prefix.as_str())
                && lowered.as_bytes()[prefix.len()] == b'.')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::timestamp_from_millis;

    fn record(pairs: &[(&str, Attribute)]) -> Record {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn selection_matches_names_and_dotted_prefixes() {
        let options = QueryOptions {
            attributes: vec!["CPU".to_string()],
            key: "time".to_string(),
            ..QueryOptions::default()
        };
        let mut records = vec![record(&[
            ("time", Attribute::from(1_i64)),
            ("cpu.load", Attribute::from(0.5)),
            ("cpu", Attribute::from(2_i64)),
            ("cpuset", Attribute::from(3_i64)),
            ("memory.free", Attribute::from(4_i64)),
        ])];
        options.select_attributes(&mut records);
        let names = records[0].names().collect::<Vec<_>>();
        assert_eq!(names, vec!["cpu", "cpu.load", "time"]);
    }

    #[test]
    fn window_filters_temporal_keys_only() {
        let options = QueryOptions {
            key: "time".to_string(),
            window: TimeWindow {
                from: timestamp_from_millis(100),
                to: timestamp_from_millis(200),
            },
            ..QueryOptions::default()
        };
        let records = vec![
            record(&[("time", Attribute::from(50_i64))]),
            record(&[("time", Attribute::from(150_i64))]),
            record(&[("time", Attribute::from(timestamp_from_millis(200).unwrap()))]),
            record(&[("time", Attribute::from("later"))]),
            record(&[("other", Attribute::from(1_i64))]),
        ];
        let kept = options.apply_window(records);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn validation_rejects_inverted_window_and_missing_key() {
        let mut options = QueryOptions::default();
        assert!(options.validate().is_err());
        options.key = "time".to_string();
        assert!(options.validate().is_ok());
        options.window = TimeWindow {
            from: timestamp_from_millis(2),
            to: timestamp_from_millis(1),
        };
        assert!(matches!(
            options.validate(),
            Err(FrameError::InvalidOptions(_))
        ));
    }

    #[test]
    fn yaml_fields_default_when_omitted() {
        let options: QueryOptions =
            serde_yaml::from_str("metric: cpu\nkey: time\nnested: opaque\n").unwrap();
        assert_eq!(options.metric, "cpu");
        assert_eq!(options.nested, NestedPolicy::Opaque);
        assert_eq!(options.separator, ".");
        assert!(options.pivot);
    }

    #[test]
    fn yaml_rejects_misspelled_fields() {
        let err = serde_yaml::from_str::<QueryOptions>("key: time
discriminater: host
")
            .unwrap_err();
        assert!(err.to_string().contains("discriminater"));
        assert!(
            serde_yaml::from_str::<QueryOptions>("key: time
window:
  form: 1
").is_err()
        );
    }
}
