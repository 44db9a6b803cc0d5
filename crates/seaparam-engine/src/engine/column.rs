//! Typed column data structures.
//!
//! This module provides the core data types for representing columns:
//! - [`DataType`] - The semantic type recorded for a column
//! - [`IntWidth`] - The narrowest integer width that holds a column's values
//! - [`Column`] - A homogeneous sequence of values where `None` marks a missing value

use serde::{Deserialize, Serialize};

/// The semantic type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Float,
    String,
    Empty,
}

impl DataType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }
}

/// Storage width of an integer column, narrowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    /// Narrowest width that holds every present value.
    pub fn fitting<'a>(values: impl IntoIterator<Item = &'a Option<i64>>) -> IntWidth {
        let mut width = IntWidth::I8;
        for v in values.into_iter().flatten() {
            let needed = if i8::try_from(*v).is_ok() {
                IntWidth::I8
            } else if i16::try_from(*v).is_ok() {
                IntWidth::I16
            } else if i32::try_from(*v).is_ok() {
                IntWidth::I32
            } else {
                IntWidth::I64
            };
            width = width.max(needed);
        }
        width
    }
}

/// A column of values. `None` is the missing-value sentinel.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Every value is missing.
    Empty(usize),
    Integer {
        values: Vec<Option<i64>>,
        width: IntWidth,
    },
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn integers(values: Vec<Option<i64>>) -> Column {
        let width = IntWidth::fitting(&values);
        Column::Integer { values, width }
    }

    pub fn floats(values: Vec<Option<f64>>) -> Column {
        Column::Float(values)
    }

    pub fn texts(values: Vec<Option<String>>) -> Column {
        Column::Text(values)
    }

    /// A column of `len` copies of `value`.
    pub fn filled_integer(value: i64, len: usize) -> Column {
        Column::integers(vec![Some(value); len])
    }

    /// Build the column produced by an equation.
    ///
    /// Non-finite NaN results become missing values. At precision 0 a column
    /// whose present values are all exact integers is stored as integers.
    pub fn from_computed(values: Vec<Option<f64>>, precision: u32) -> Column {
        let values: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();

        if precision == 0 {
            let as_ints: Option<Vec<Option<i64>>> = values
                .iter()
                .map(|v| match v {
                    None => Some(None),
                    Some(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 => {
                        Some(Some(*x as i64))
                    }
                    Some(_) => None,
                })
                .collect();
            if let Some(ints) = as_ints {
                return Column::integers(ints);
            }
        }
        Column::Float(values)
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Empty(len) => *len,
            Column::Integer { values, .. } => values.len(),
            Column::Float(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Column::Empty(_) => DataType::Empty,
            Column::Integer { .. } => DataType::Integer,
            Column::Float(_) => DataType::Float,
            Column::Text(_) => DataType::String,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Empty(_) => true,
            Column::Integer { values, .. } => values.get(row).is_none_or(|v| v.is_none()),
            Column::Float(values) => values.get(row).is_none_or(|v| v.is_none()),
            Column::Text(values) => values.get(row).is_none_or(|v| v.is_none()),
        }
    }

    /// True when no row holds a value.
    pub fn is_all_missing(&self) -> bool {
        (0..self.len()).all(|row| self.is_missing(row))
    }

    /// Numeric value at `row`; `None` for missing or text values.
    pub fn number(&self, row: usize) -> Option<f64> {
        match self {
            Column::Empty(_) | Column::Text(_) => None,
            Column::Integer { values, .. } => values.get(row).copied().flatten().map(|v| v as f64),
            Column::Float(values) => values.get(row).copied().flatten(),
        }
    }

    pub fn integer(&self, row: usize) -> Option<i64> {
        match self {
            Column::Integer { values, .. } => values.get(row).copied().flatten(),
            _ => None,
        }
    }

    pub fn text(&self, row: usize) -> Option<&str> {
        match self {
            Column::Text(values) => values.get(row).and_then(|v| v.as_deref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_width_picks_narrowest() {
        assert_eq!(IntWidth::fitting(&[Some(1), None, Some(-128)]), IntWidth::I8);
        assert_eq!(IntWidth::fitting(&[Some(200)]), IntWidth::I16);
        assert_eq!(IntWidth::fitting(&[Some(70_000)]), IntWidth::I32);
        assert_eq!(IntWidth::fitting(&[Some(i64::MAX)]), IntWidth::I64);
        assert_eq!(IntWidth::fitting(&[None, None]), IntWidth::I8);
    }

    #[test]
    fn test_from_computed_integer_when_exact() {
        let col = Column::from_computed(vec![Some(21.0), Some(41.0), None], 0);
        assert_eq!(col, Column::integers(vec![Some(21), Some(41), None]));
    }

    #[test]
    fn test_from_computed_keeps_float_when_precision_positive() {
        let col = Column::from_computed(vec![Some(21.0)], 2);
        assert_eq!(col.data_type(), DataType::Float);
    }

    #[test]
    fn test_from_computed_nan_becomes_missing() {
        let col = Column::from_computed(vec![Some(f64::NAN), Some(1.5)], 1);
        assert!(col.is_missing(0));
        assert_eq!(col.number(1), Some(1.5));
    }

    #[test]
    fn test_from_computed_infinite_stays_float() {
        let col = Column::from_computed(vec![Some(f64::INFINITY), Some(1.0)], 0);
        assert_eq!(col.data_type(), DataType::Float);
    }

    #[test]
    fn test_all_missing() {
        assert!(Column::Empty(3).is_all_missing());
        assert!(Column::floats(vec![None, None]).is_all_missing());
        assert!(!Column::texts(vec![None, Some("x".into())]).is_all_missing());
    }
}
