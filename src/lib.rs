pub mod cli;
pub mod data;
pub mod error;
pub mod flatten;
pub mod frame;
pub mod io_utils;
pub mod pivot;
pub mod project;
pub mod query;
pub mod record;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::cli::{Cli, ColumnsArgs, Commands, FrameArgs};

pub use crate::{
    data::{Kind, Value},
    error::{FrameError, FrameResult},
    frame::{Frame, build_frame, frame_records},
    pivot::{WideTable, pivot},
    project::{LongTable, Warning, project},
    record::{Attribute, Record},
    schema::{Column, unify},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("metric_frames", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Frame(args) => handle_frame(&args),
        Commands::Columns(args) => handle_columns(&args),
    }
}

fn handle_frame(args: &FrameArgs) -> Result<()> {
    let mut options = args.query.to_options()?;
    if args.long {
        options.pivot = false;
    }
    if let Some(separator) = &args.separator {
        options.separator = separator.clone();
    }
    info!(
        "Framing {:?} (key '{}', discriminator '{}')",
        args.query.input, options.key, options.discriminator
    );
    let root = io_utils::read_json_input(&args.query.input)?;
    let frame = build_frame(&root, &options)
        .with_context(|| format!("Building frame from {:?}", args.query.input))?;

    let writer = io_utils::open_writer(args.output.as_deref())?;
    io_utils::write_frame(&frame, args.format, writer)?;
    if !frame.warnings.is_empty() {
        warn!(
            "Frame built with {} data-quality warning(s)",
            frame.warnings.len()
        );
        if args.show_warnings {
            for warning in &frame.warnings {
                eprintln!("warning: {warning}");
            }
        }
    }
    Ok(())
}

fn handle_columns(args: &ColumnsArgs) -> Result<()> {
    let options = args.query.to_options()?;
    let root = io_utils::read_json_input(&args.query.input)?;
    let listing = frame::describe_columns(&root, &options)
        .with_context(|| format!("Projecting records from {:?}", args.query.input))?;

    println!(
        "{} record(s), {} column(s)",
        listing.rows,
        listing.columns.len()
    );
    if listing.columns.is_empty() {
        info!("Records in {:?} carry no data columns", args.query.input);
        return Ok(());
    }
    let headers = ["#", "name", "kind", "non-null", "null"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = listing
        .columns
        .iter()
        .enumerate()
        .map(|(idx, summary)| {
            vec![
                (idx + 1).to_string(),
                summary.name.clone(),
                summary.kind.to_string(),
                summary.non_null.to_string(),
                summary.nulls.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print!("{}", table::render_table(&headers, &rows));
    info!("Listed {} column(s)", listing.columns.len());
    Ok(())
}
