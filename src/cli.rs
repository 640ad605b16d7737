use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{data::parse_timestamp, flatten::NestedPolicy, query::QueryOptions};

#[derive(Debug, Parser)]
#[command(author, version, about = "Project analytics records into typed time-series frames", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a long or wide frame from a JSON array of records
    Frame(FrameArgs),
    /// List the unified columns with their locked kinds
    Columns(ColumnsArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Input JSON file holding the query result (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML query file providing defaults for the flags below
    #[arg(short = 'q', long = "query")]
    pub query: Option<PathBuf>,
    /// Metric name used to label the frame
    #[arg(long)]
    pub metric: Option<String>,
    /// Attribute marking which series a record belongs to
    #[arg(short = 'd', long = "discriminator")]
    pub discriminator: Option<String>,
    /// Attribute holding the shared time key
    #[arg(short = 'k', long = "key")]
    pub key: Option<String>,
    /// Attribute names or dotted prefixes to keep (repeatable)
    #[arg(short = 'a', long = "attr", action = clap::ArgAction::Append)]
    pub attributes: Vec<String>,
    /// Attributes to decode as timestamps (repeatable)
    #[arg(long = "timestamp", action = clap::ArgAction::Append)]
    pub timestamp_attributes: Vec<String>,
    /// Inclusive window start (RFC 3339 or `YYYY-MM-DD HH:MM:SS`, UTC)
    #[arg(long, value_parser = parse_window_bound)]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive window end
    #[arg(long, value_parser = parse_window_bound)]
    pub to: Option<DateTime<Utc>>,
    /// How to treat object and array values
    #[arg(long = "nested", value_enum)]
    pub nested: Option<NestedPolicy>,
}

impl QueryArgs {
    /// Query file values first, then flag overrides.
    pub fn to_options(&self) -> Result<QueryOptions> {
        let mut options = match &self.query {
            Some(path) => QueryOptions::load(path)
                .with_context(|| format!("Loading query options from {path:?}"))?,
            None => QueryOptions::default(),
        };
        if let Some(metric) = &self.metric {
            options.metric = metric.clone();
        }
        if let Some(discriminator) = &self.discriminator {
            options.discriminator = discriminator.trim().to_string();
        }
        if let Some(key) = &self.key {
            options.key = key.trim().to_string();
        }
        if !self.attributes.is_empty() {
            options.attributes = split_list(&self.attributes);
        }
        if !self.timestamp_attributes.is_empty() {
            options.timestamp_attributes = split_list(&self.timestamp_attributes);
        }
        if self.from.is_some() {
            options.window.from = self.from;
        }
        if self.to.is_some() {
            options.window.to = self.to;
        }
        if let Some(nested) = self.nested {
            options.nested = nested;
        }
        Ok(options)
    }
}

#[derive(Debug, Args)]
pub struct FrameArgs {
    #[command(flatten)]
    pub query: QueryArgs,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Separator between series label and column name in wide output
    #[arg(long)]
    pub separator: Option<String>,
    /// Emit the long table instead of pivoting
    #[arg(long)]
    pub long: bool,
    /// Print data-quality warnings to stderr after the frame
    #[arg(long = "show-warnings")]
    pub show_warnings: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub query: QueryArgs,
}

fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_window_bound(value: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(value).map_err(|err| err.to_string())
}
