//! Rendering of result sets.
//!
//! Table formats go through comfy-table; the delimited formats are written
//! by hand so NULL and quoting follow the usual csv/tsv conventions.

use std::fmt;

use clap::ValueEnum;
use comfy_table::{presets, Cell, ContentArrangement, Table};

const NULL_DISPLAY: &str = "<null>";

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    /// Bordered table
    Ascii,
    /// psql-style table without outer borders
    Psql,
    /// Unicode box drawing
    Fancy,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// One block per row
    Vertical,
    /// JSON Lines (one JSON object per row)
    Json,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown table format '{name}'. Valid formats: {valid}")]
pub struct UnknownFormat {
    pub name: String,
    pub valid: String,
}

impl TableFormat {
    pub fn names() -> Vec<String> {
        Self::value_variants()
            .iter()
            .filter_map(|v| v.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect()
    }

    pub fn parse_name(name: &str) -> Result<Self, UnknownFormat> {
        <Self as ValueEnum>::from_str(name.trim(), true).map_err(|_| UnknownFormat {
            name: name.trim().to_string(),
            valid: Self::names().join(", "),
        })
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(v) => f.write_str(v.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

/// Render `rows` under `headers`. `expanded` forces the vertical layout.
pub fn render(
    headers: &[String],
    rows: &[Vec<Option<String>>],
    format: TableFormat,
    expanded: bool,
) -> String {
    if expanded {
        return render_vertical(headers, rows);
    }
    match format {
        TableFormat::Ascii => render_table(headers, rows, presets::ASCII_FULL_CONDENSED),
        TableFormat::Psql => render_table(headers, rows, presets::ASCII_NO_BORDERS),
        TableFormat::Fancy => render_table(headers, rows, presets::UTF8_FULL),
        TableFormat::Csv => render_delimited(headers, rows, ',', csv_field),
        TableFormat::Tsv => render_delimited(headers, rows, '\t', tsv_field),
        TableFormat::Vertical => render_vertical(headers, rows),
        TableFormat::Json => render_json(headers, rows),
    }
}

fn render_table(headers: &[String], rows: &[Vec<Option<String>>], preset: &str) -> String {
    let mut table = Table::new();
    table
        .load_preset(preset)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(headers.iter().map(Cell::new));

    for row in rows {
        table.add_row(
            row.iter()
                .map(|cell| Cell::new(cell.as_deref().unwrap_or(NULL_DISPLAY))),
        );
    }
    table.to_string()
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn tsv_field(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
}

fn render_delimited(
    headers: &[String],
    rows: &[Vec<Option<String>>],
    sep: char,
    field: fn(&str) -> String,
) -> String {
    let sep = sep.to_string();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| field(h))
            .collect::<Vec<_>>()
            .join(&sep),
    );
    for row in rows {
        lines.push(
            row.iter()
                .map(|cell| cell.as_deref().map(field).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(&sep),
        );
    }
    lines.join("\n")
}

fn render_vertical(headers: &[String], rows: &[Vec<Option<String>>]) -> String {
    let width = headers.iter().map(|h| h.chars().count()).max().unwrap_or(0);
    let stars = "*".repeat(27);
    let mut out = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        out.push(format!("{stars}[ {}. row ]{stars}", i + 1));
        for (header, cell) in headers.iter().zip(row) {
            out.push(format!(
                "{:<width$} | {}",
                header,
                cell.as_deref().unwrap_or(NULL_DISPLAY)
            ));
        }
    }
    out.join("\n")
}

fn render_json(headers: &[String], rows: &[Vec<Option<String>>]) -> String {
    rows.iter()
        .map(|row| {
            let fields: Vec<String> = headers
                .iter()
                .zip(row)
                .map(|(header, cell)| {
                    let value = match cell {
                        Some(v) => serde_json::Value::String(v.clone()),
                        None => serde_json::Value::Null,
                    };
                    format!("{}:{}", serde_json::Value::String(header.clone()), value)
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
