//! Type & precision inference for raw text columns.
//!
//! Each column is tried as integers, then floats, else kept as text. Float
//! precision is read from the source text rather than the parsed value so
//! binary rounding cannot inflate it.

use seaparam_engine::engine::{Column, DataType, round_half_even};

use crate::config::MissingValues;

/// Result of inferring one column.
#[derive(Clone, Debug, PartialEq)]
pub struct Inferred {
    pub column: Column,
    pub data_type: DataType,
    pub precision: Option<u32>,
    pub export: bool,
}

/// Most decimal places a column can carry; f64 holds no more significant digits.
pub const MAX_DECIMAL_PLACES: u32 = 15;

/// Decimal places a numeric literal was written with; exponents shift it.
pub fn decimal_places(raw: &str) -> u32 {
    let (mantissa, exponent) = match raw.find(['e', 'E']) {
        Some(idx) => (&raw[..idx], raw[idx + 1..].parse::<i64>().unwrap_or(0)),
        None => (raw, 0),
    };
    let fraction = mantissa
        .split_once('.')
        .map_or(0, |(_, frac)| frac.chars().filter(char::is_ascii_digit).count() as i64);
    fraction
        .saturating_sub(exponent)
        .clamp(0, i64::from(MAX_DECIMAL_PLACES)) as u32
}

/// Infer type and precision of one column of raw values.
pub fn infer_column(raw: &[String], missing: &MissingValues, empty_flags: &[i64]) -> Inferred {
    let cells: Vec<Option<&str>> = raw
        .iter()
        .map(|v| {
            let v = v.trim();
            (!missing.is_missing(v)).then_some(v)
        })
        .collect();

    if cells.iter().all(Option::is_none) {
        return Inferred {
            column: Column::Empty(raw.len()),
            data_type: DataType::Empty,
            precision: None,
            export: true,
        };
    }

    if let Some(ints) = parse_all(&cells, |s| s.parse::<i64>().ok()) {
        let all_not_set = ints
            .iter()
            .all(|v| v.is_some_and(|v| empty_flags.contains(&v)));
        return Inferred {
            column: Column::integers(ints),
            data_type: if all_not_set {
                DataType::Empty
            } else {
                DataType::Integer
            },
            precision: Some(0),
            export: !all_not_set,
        };
    }

    if let Some(floats) = parse_all(&cells, |s| s.parse::<f64>().ok()) {
        let present = cells.iter().flatten();
        let dotted = present.clone().any(|s| s.contains('.'));
        let precision = present.map(|s| decimal_places(s)).max().unwrap_or(0);

        if !dotted && precision == 0 {
            let ints: Option<Vec<Option<i64>>> = floats
                .iter()
                .map(|v| match v {
                    None => Some(None),
                    Some(x) if x.fract() == 0.0 && x.abs() < 9.0e15 => Some(Some(*x as i64)),
                    Some(_) => None,
                })
                .collect();
            if let Some(ints) = ints {
                return Inferred {
                    column: Column::integers(ints),
                    data_type: DataType::Integer,
                    precision: Some(0),
                    export: true,
                };
            }
        }

        let rounded = floats
            .into_iter()
            .map(|v| v.map(|x| round_half_even(x, precision)))
            .collect();
        return Inferred {
            column: Column::floats(rounded),
            data_type: DataType::Float,
            precision: Some(precision),
            export: true,
        };
    }

    Inferred {
        column: Column::texts(cells.iter().map(|c| c.map(str::to_string)).collect()),
        data_type: DataType::String,
        precision: None,
        export: true,
    }
}

fn parse_all<T>(
    cells: &[Option<&str>],
    parse: impl Fn(&str) -> Option<T>,
) -> Option<Vec<Option<T>>> {
    cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => parse(s).map(Some),
        })
        .collect()
}

/// Display precision: the largest float precision, capped.
pub fn display_precision<'a>(inferred: impl IntoIterator<Item = &'a Inferred>, cap: u32) -> u32 {
    inferred
        .into_iter()
        .filter(|i| i.data_type == DataType::Float)
        .filter_map(|i| i.precision)
        .max()
        .unwrap_or(0)
        .min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use seaparam_engine::engine::format_value;

    fn infer(values: &[&str]) -> Inferred {
        let missing = Settings::default().missing_values().unwrap();
        let raw: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        infer_column(&raw, &missing, &[9])
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places("1.50"), 2);
        assert_eq!(decimal_places("3"), 0);
        assert_eq!(decimal_places("2."), 0);
        assert_eq!(decimal_places("1.5e-3"), 4);
        assert_eq!(decimal_places("1.25E2"), 0);
    }

    #[test]
    fn test_decimal_places_with_extreme_exponents() {
        assert_eq!(decimal_places("1e-9223372036854775808"), MAX_DECIMAL_PLACES);
        assert_eq!(decimal_places("1.5e9223372036854775807"), 0);
        assert_eq!(decimal_places("1e-400"), MAX_DECIMAL_PLACES);
    }

    #[test]
    fn test_tiny_values_keep_a_bounded_precision() {
        let inferred = infer(&["1.5", "1e-400"]);
        assert_eq!(inferred.data_type, DataType::Float);
        assert_eq!(inferred.precision, Some(MAX_DECIMAL_PLACES));
        let rendered = format_value(&inferred.column, 0, inferred.precision, "-999");
        assert_eq!(rendered, "1.500000000000000");
    }

    #[test]
    fn test_precision_from_text_round_trips() {
        let inferred = infer(&["1.50", "2.375", "3"]);
        assert_eq!(inferred.data_type, DataType::Float);
        assert_eq!(inferred.precision, Some(3));
        let rendered: Vec<String> = (0..3)
            .map(|r| format_value(&inferred.column, r, inferred.precision, "-999"))
            .collect();
        assert_eq!(rendered, vec!["1.500", "2.375", "3.000"]);
    }

    #[test]
    fn test_integers_with_missing() {
        let inferred = infer(&["1", "-999", "300"]);
        assert_eq!(inferred.data_type, DataType::Integer);
        assert_eq!(inferred.precision, Some(0));
        assert!(inferred.column.is_missing(1));
        assert_eq!(inferred.column.integer(2), Some(300));
    }

    #[test]
    fn test_dotted_zero_precision_stays_float() {
        let inferred = infer(&["1.", "2."]);
        assert_eq!(inferred.data_type, DataType::Float);
        assert_eq!(inferred.precision, Some(0));
    }

    #[test]
    fn test_exponent_integers_become_integer() {
        let inferred = infer(&["1e3", "2"]);
        assert_eq!(inferred.data_type, DataType::Integer);
        assert_eq!(inferred.column.integer(0), Some(1000));
    }

    #[test]
    fn test_all_not_set_flags_become_empty() {
        let inferred = infer(&["9", "9", "9"]);
        assert_eq!(inferred.data_type, DataType::Empty);
        assert!(!inferred.export);
        assert_eq!(inferred.column.integer(0), Some(9));
    }

    #[test]
    fn test_all_missing_is_empty() {
        let inferred = infer(&["-999", "", "NaN"]);
        assert_eq!(inferred.column, Column::Empty(3));
        assert_eq!(inferred.precision, None);
    }

    #[test]
    fn test_text_column() {
        let inferred = infer(&["33RR20160208", "-999", "33RR20160208"]);
        assert_eq!(inferred.data_type, DataType::String);
        assert_eq!(inferred.precision, None);
        assert!(inferred.column.is_missing(1));
    }

    #[test]
    fn test_floats_are_rounded_to_inferred_precision() {
        let inferred = infer(&["0.1", "0.25"]);
        assert_eq!(inferred.column.number(0), Some(0.1));
        assert_eq!(inferred.column.number(1), Some(0.25));
    }

    #[test]
    fn test_display_precision_is_capped() {
        let a = infer(&["1.123"]);
        let b = infer(&["1.5"]);
        assert_eq!(display_precision([&a, &b], 15), 3);
        assert_eq!(display_precision([&a, &b], 2), 2);
    }
}
