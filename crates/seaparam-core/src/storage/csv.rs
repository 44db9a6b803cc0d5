//! CSV import/export functionality

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use seaparam_engine::engine::{Column, TabularStore, format_value};

use crate::dataset::Dataset;
use crate::error::{CoreError, Result};

/// Marker that ends the data block of WHP exchange files.
const END_DATA: &str = "END_DATA";

/// Untyped table as read from a file, one `String` per cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub units: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawTable {
            headers,
            units: None,
            rows,
        }
    }

    pub fn with_units(mut self, units: Vec<String>) -> Self {
        self.units = Some(units);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of column `idx`; short rows read as empty cells.
    pub fn column(&self, idx: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or_default())
            .collect()
    }

    pub fn unit(&self, idx: usize) -> Option<&str> {
        self.units
            .as_ref()
            .and_then(|u| u.get(idx))
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
    }
}

/// Read a CSV file: header row, optional units row, data rows.
pub fn read_csv(path: &Path) -> Result<RawTable> {
    let content = std::fs::read_to_string(path)?;
    parse_csv_str(&content)
}

/// Parse CSV text. Blank lines and `#` comments are skipped, reading stops
/// at `END_DATA`.
pub fn parse_csv_str(content: &str) -> Result<RawTable> {
    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed == END_DATA {
            break;
        }
        let fields = parse_csv_line(line);
        match &headers {
            None => headers = Some(fields),
            Some(h) if fields.len() != h.len() => {
                return Err(CoreError::Parse {
                    line: line_idx + 1,
                    message: format!("expected {} fields, found {}", h.len(), fields.len()),
                });
            }
            Some(_) => rows.push(fields),
        }
    }

    let headers = headers.ok_or_else(|| CoreError::Parse {
        line: 0,
        message: "CSV file is empty".to_string(),
    })?;
    let mut table = RawTable::new(headers, rows);
    if table.rows.first().is_some_and(|row| is_units_row(row)) {
        let units = table.rows.remove(0);
        table.units = Some(units);
    }
    Ok(table)
}

/// Parse a single CSV line, handling quoted fields
pub(crate) fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    field_was_quoted = true;
                }
                ',' => {
                    fields.push(finish_field(&mut current, field_was_quoted));
                    field_was_quoted = false;
                }
                _ => current.push(c),
            }
        }
    }
    fields.push(finish_field(&mut current, field_was_quoted));
    fields
}

fn finish_field(current: &mut String, quoted: bool) -> String {
    let field = std::mem::take(current);
    if quoted { field } else { field.trim().to_string() }
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("number regex must compile"))
}

/// The first data row holds units unless one of its cells is a number.
/// An empty cell before any number marks a units row.
fn is_units_row(row: &[String]) -> bool {
    for cell in row {
        let cell = cell.trim();
        if cell.is_empty() {
            return true;
        }
        if number_re().is_match(cell) {
            return false;
        }
    }
    true
}

/// Render the exported columns: header row, units row, then values at each
/// column's precision.
pub fn render_csv(dataset: &Dataset) -> Result<String> {
    let table = dataset.table();
    let registry = dataset.registry();
    let missing = dataset.settings().export_missing_value.as_str();

    let mut columns = Vec::new();
    for name in registry.all_columns(table)? {
        let Some(descriptor) = registry.get(&name) else {
            continue;
        };
        if !descriptor.export {
            continue;
        }
        if let Some(column) = table.get_column(&name) {
            columns.push((name, descriptor, column));
        }
    }

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .map(|(name, _, _)| escape_csv_field(name, true))
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');

    let units: Vec<String> = columns
        .iter()
        .map(|(_, d, _)| escape_csv_field(d.unit.as_deref().unwrap_or(""), true))
        .collect();
    out.push_str(&units.join(","));
    out.push('\n');

    for row in 0..table.row_count() {
        let fields: Vec<String> = columns
            .iter()
            .map(|(_, d, column)| {
                let value = format_value(column, row, d.precision, missing);
                escape_csv_field(&value, matches!(column, Column::Text(_)))
            })
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    Ok(out)
}

/// Export the dataset to a CSV file.
pub fn write_csv(path: &Path, dataset: &Dataset) -> Result<()> {
    let content = render_csv(dataset)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Escape a field for CSV output. Text fields that would start a
/// spreadsheet formula are prefixed with `'`.
fn escape_csv_field(field: &str, is_text: bool) -> String {
    let first_non_space = field.trim_start_matches([' ', '\t']).chars().next();
    let safe_field = if is_text && matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
        format!("'{field}")
    } else {
        field.to_string()
    };

    if safe_field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", safe_field.replace('"', "\"\""))
    } else {
        safe_field
    }
}
