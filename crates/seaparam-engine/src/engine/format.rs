use super::Column;

/// Largest decimal precision rounding will honour; beyond it `f64` has no
/// digits left to round.
const MAX_ROUND_PRECISION: u32 = 15;

/// Round to `precision` decimal places, ties to even.
pub fn round_half_even(value: f64, precision: u32) -> f64 {
    if !value.is_finite() || precision > MAX_ROUND_PRECISION {
        return value;
    }
    let scale = 10f64.powi(precision as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / scale
}

/// Format the value at `row` with a fixed number of decimals.
/// Missing values render as `missing`.
pub fn format_value(column: &Column, row: usize, precision: Option<u32>, missing: &str) -> String {
    match column {
        Column::Empty(_) => missing.to_string(),
        Column::Text(_) => column.text(row).map_or_else(|| missing.to_string(), str::to_string),
        Column::Integer { .. } => column
            .integer(row)
            .map_or_else(|| missing.to_string(), |v| v.to_string()),
        Column::Float(_) => match column.number(row) {
            None => missing.to_string(),
            Some(n) if n.is_nan() => missing.to_string(),
            Some(n) if n.is_infinite() => {
                if n > 0.0 { "inf" } else { "-inf" }.to_string()
            }
            Some(n) => {
                let places = precision.unwrap_or(0) as usize;
                format!("{:.*}", places, round_half_even(n, places as u32))
            }
        },
    }
}
