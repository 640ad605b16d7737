//! Aligned plain-text rendering of frames and column listings.

use std::borrow::Cow;
use std::fmt::Write as _;

use itertools::Itertools;

use crate::{frame::Frame, project::Cell};

const COLUMN_GAP: &str = "  ";

/// Header cells read `name (kind)`; null cells render empty.
pub fn render_frame(frame: &Frame) -> String {
    let headers = frame
        .columns
        .iter()
        .map(|column| format!("{} ({})", column.name, column.kind))
        .collect::<Vec<_>>();
    let rows = frame
        .rows
        .iter()
        .map(|row| row.iter().map(display_cell).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

pub fn display_cell(cell: &Cell) -> String {
    cell.as_ref().map(|value| value.as_display()).unwrap_or_default()
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(sanitize_cell(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .join(COLUMN_GAP);
    let _ = writeln!(output, "{rule}");
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, &width)| {
            let cell = sanitize_cell(value);
            format!("{cell:<width$}")
        })
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
