//! File storage: CSV import and export.

mod csv;

pub use csv::{RawTable, parse_csv_str, read_csv, render_csv, write_csv};
