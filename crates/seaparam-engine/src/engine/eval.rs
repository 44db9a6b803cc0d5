//! Equation evaluation.
//!
//! An equation is checked, compiled once as a Rhai expression and then run
//! row by row with every referenced column bound as a constant. A row where
//! any input is missing yields a missing result. The target column is only
//! written once every row has been computed, so a failing equation leaves
//! the store untouched.

use rhai::{Dynamic, Scope};

use super::{
    Column, Sandbox, TabularStore, extract_identifiers, preprocess_equation, round_half_even,
};
use crate::error::{EquationError, StoreError};

/// Column name used when probing whether an equation can be computed.
pub const SCRATCH_COLUMN: &str = "AUX";

const PROBE_PRECISION: u32 = 5;

/// Compute the column `target = equation` would produce, without writing it.
pub fn compute(
    sandbox: &Sandbox,
    target: &str,
    equation: &str,
    precision: u32,
    store: &dyn TabularStore,
) -> Result<Column, EquationError> {
    let assignment = format!("{target} = {equation}");
    let failure = |message: String| EquationError::Evaluation {
        equation: assignment.clone(),
        message,
    };

    if equation.trim().is_empty() {
        return Err(failure("empty equation".to_string()));
    }

    let ids = extract_identifiers(equation, sandbox);
    if !ids.malformed.is_empty() {
        return Err(failure(format!("invalid tokens: {}", ids.malformed.join(", "))));
    }
    if !ids.unknown_calls.is_empty() {
        return Err(EquationError::MissingFunction {
            names: ids.unknown_calls,
        });
    }
    let shadowed: Vec<&str> = ids
        .sandboxed
        .iter()
        .filter(|name| store.contains_column(name))
        .map(String::as_str)
        .collect();
    if !shadowed.is_empty() {
        return Err(failure(format!(
            "column names collide with sandbox names: {}",
            shadowed.join(", ")
        )));
    }
    let missing: Vec<String> = ids
        .columns
        .iter()
        .filter(|name| !store.contains_column(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(EquationError::MissingDependency {
            identifiers: missing,
        });
    }

    let engine = sandbox.engine();
    let ast = engine
        .compile_expression(preprocess_equation(equation))
        .map_err(|e| failure(e.to_string()))?;

    let mut inputs: Vec<(&str, &Column)> = Vec::with_capacity(ids.columns.len());
    for name in &ids.columns {
        if let Some(column) = store.get_column(name) {
            inputs.push((name.as_str(), column));
        }
    }

    tracing::debug!(target_column = target, equation, inputs = inputs.len(), "evaluating equation");

    let rows = store.row_count();
    let mut values = Vec::with_capacity(rows);
    let mut scope = Scope::new();
    'rows: for row in 0..rows {
        scope.clear();
        for (name, column) in &inputs {
            match cell_value(column, row) {
                Some(value) => {
                    scope.push_constant_dynamic(*name, value);
                }
                None => {
                    values.push(None);
                    continue 'rows;
                }
            }
        }
        let result = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
            .map_err(|e| failure(format!("row {row}: {e}")))?;
        let number = as_number(&result).ok_or_else(|| {
            failure(format!("row {row}: result is {}, not a number", result.type_name()))
        })?;
        values.push(Some(round_half_even(number, precision)));
    }

    Ok(Column::from_computed(values, precision))
}

/// Evaluate `target = equation` into the store.
pub fn evaluate(
    sandbox: &Sandbox,
    target: &str,
    equation: &str,
    precision: u32,
    store: &mut dyn TabularStore,
) -> Result<(), EquationError> {
    if target == SCRATCH_COLUMN {
        return Err(StoreError::ReservedName(target.to_string()).into());
    }
    let column = compute(sandbox, target, equation, precision, &*store)?;
    store.set_column(target, column)?;
    Ok(())
}

/// Check that `equation` evaluates against the store. The scratch column is
/// written and always removed again.
pub fn probe(
    sandbox: &Sandbox,
    equation: &str,
    store: &mut dyn TabularStore,
) -> Result<(), EquationError> {
    if store.contains_column(SCRATCH_COLUMN) {
        return Err(StoreError::ReservedName(SCRATCH_COLUMN.to_string()).into());
    }
    let result = compute(sandbox, SCRATCH_COLUMN, equation, PROBE_PRECISION, &*store)
        .and_then(|column| Ok(store.set_column(SCRATCH_COLUMN, column)?));
    store.remove_column(SCRATCH_COLUMN);
    result
}

fn cell_value(column: &Column, row: usize) -> Option<Dynamic> {
    match column {
        Column::Empty(_) => None,
        Column::Integer { .. } | Column::Float(_) => column.number(row).map(Dynamic::from_float),
        Column::Text(_) => column.text(row).map(|s| Dynamic::from(s.to_string())),
    }
}

fn as_number(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DataType, Table};
    use crate::functions::SeawaterProvider;

    fn store() -> Table {
        Table::from_columns(
            3,
            [
                (
                    "TEMP".to_string(),
                    Column::floats(vec![Some(10.0), Some(20.0), None]),
                ),
                (
                    "SALNTY".to_string(),
                    Column::floats(vec![Some(35.0), Some(34.5), Some(34.0)]),
                ),
                (
                    "STNNBR".to_string(),
                    Column::integers(vec![Some(1), Some(2), Some(3)]),
                ),
                (
                    "EXPOCODE".to_string(),
                    Column::texts(vec![Some("33RR".into()), Some("33RR".into()), None]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_evaluate_writes_integer_column_at_precision_zero() {
        let sandbox = Sandbox::default();
        let mut table = store();
        evaluate(&sandbox, "DOUBLE", "(TEMP*2)+1", 0, &mut table).unwrap();
        let column = table.get_column("DOUBLE").unwrap();
        assert_eq!(column.data_type(), DataType::Integer);
        assert_eq!(column.integer(0), Some(21));
        assert_eq!(column.integer(1), Some(41));
        assert!(column.is_missing(2));
    }

    #[test]
    fn test_integer_division_is_float_division() {
        let sandbox = Sandbox::default();
        let mut table = store();
        evaluate(&sandbox, "HALF", "STNNBR/2", 1, &mut table).unwrap();
        let column = table.get_column("HALF").unwrap();
        assert_eq!(column.number(0), Some(0.5));
        assert_eq!(column.number(2), Some(1.5));
    }

    #[test]
    fn test_results_are_rounded_half_even() {
        let sandbox = Sandbox::default();
        let mut table = Table::from_columns(
            2,
            [("X".to_string(), Column::floats(vec![Some(0.125), Some(0.375)]))],
        )
        .unwrap();
        evaluate(&sandbox, "Y", "X", 2, &mut table).unwrap();
        let column = table.get_column("Y").unwrap();
        assert_eq!(column.number(0), Some(0.12));
        assert_eq!(column.number(1), Some(0.38));
    }

    #[test]
    fn test_missing_dependency_lists_every_absent_column() {
        let sandbox = Sandbox::default();
        let mut table = store();
        let err = evaluate(&sandbox, "Z", "TEMP+OXYGEN*NITRAT", 2, &mut table).unwrap_err();
        assert_eq!(
            err,
            EquationError::MissingDependency {
                identifiers: vec!["OXYGEN".into(), "NITRAT".into()]
            }
        );
        assert!(!table.contains_column("Z"));
    }

    #[test]
    fn test_unknown_function_call() {
        let sandbox = Sandbox::default();
        let mut table = store();
        let err = evaluate(&sandbox, "Z", "dens0(SALNTY,TEMP)", 2, &mut table).unwrap_err();
        assert_eq!(
            err,
            EquationError::MissingFunction {
                names: vec!["dens0".into()]
            }
        );
    }

    #[test]
    fn test_provider_function_evaluates() {
        let sandbox = Sandbox::builder().with_provider(&SeawaterProvider).build();
        let mut table = store();
        evaluate(&sandbox, "SIGMA", "dens0(SALNTY,TEMP)-1000", 3, &mut table).unwrap();
        let column = table.get_column("SIGMA").unwrap();
        assert!(column.number(0).unwrap() > 25.0);
        assert!(column.is_missing(2));
    }

    #[test]
    fn test_malformed_token_is_evaluation_error() {
        let sandbox = Sandbox::default();
        let mut table = store();
        let err = evaluate(&sandbox, "Z", "2TEMP+1", 0, &mut table).unwrap_err();
        assert!(matches!(
            err,
            EquationError::Evaluation { ref equation, .. } if equation == "Z = 2TEMP+1"
        ));
    }

    #[test]
    fn test_syntax_error_is_evaluation_error() {
        let sandbox = Sandbox::default();
        let mut table = store();
        let err = evaluate(&sandbox, "Z", "TEMP+*2", 0, &mut table).unwrap_err();
        assert!(matches!(err, EquationError::Evaluation { .. }));
        assert!(!table.contains_column("Z"));
    }

    #[test]
    fn test_text_result_is_rejected() {
        let sandbox = Sandbox::default();
        let mut table = store();
        let err = evaluate(&sandbox, "Z", "EXPOCODE", 0, &mut table).unwrap_err();
        assert!(matches!(err, EquationError::Evaluation { .. }));
    }

    #[test]
    fn test_column_shadowing_sandbox_name_is_rejected() {
        let sandbox = Sandbox::default();
        let mut table = store();
        table
            .set_column("sqrt", Column::floats(vec![Some(1.0); 3]))
            .unwrap();
        let err = evaluate(&sandbox, "Z", "sqrt+TEMP", 0, &mut table).unwrap_err();
        assert!(matches!(err, EquationError::Evaluation { .. }));
    }

    #[test]
    fn test_masked_name_is_an_absent_dependency() {
        let sandbox = Sandbox::default();
        let mut table = store();
        let err = evaluate(&sandbox, "Z", "print+1", 0, &mut table).unwrap_err();
        assert_eq!(
            err,
            EquationError::MissingDependency {
                identifiers: vec!["print".into()]
            }
        );
    }

    #[test]
    fn test_division_by_zero_gives_infinity() {
        let sandbox = Sandbox::default();
        let mut table = store();
        evaluate(&sandbox, "Z", "SALNTY/0", 2, &mut table).unwrap();
        assert_eq!(table.get_column("Z").unwrap().number(0), Some(f64::INFINITY));
    }

    #[test]
    fn test_nan_result_becomes_missing() {
        let sandbox = Sandbox::default();
        let mut table = store();
        evaluate(&sandbox, "Z", "sqrt(-SALNTY)", 2, &mut table).unwrap();
        assert!(table.get_column("Z").unwrap().is_all_missing());
    }

    #[test]
    fn test_evaluate_rejects_scratch_name() {
        let sandbox = Sandbox::default();
        let mut table = store();
        let err = evaluate(&sandbox, SCRATCH_COLUMN, "TEMP", 0, &mut table).unwrap_err();
        assert_eq!(err, EquationError::Store(StoreError::ReservedName("AUX".into())));
    }

    #[test]
    fn test_probe_leaves_no_scratch_column() {
        let sandbox = Sandbox::default();
        let mut table = store();
        probe(&sandbox, "TEMP*2", &mut table).unwrap();
        assert!(!table.contains_column(SCRATCH_COLUMN));
        assert!(probe(&sandbox, "TEMP*OXYGEN", &mut table).is_err());
        assert!(!table.contains_column(SCRATCH_COLUMN));
    }

    #[test]
    fn test_empty_store_compiles_but_writes_nothing() {
        let sandbox = Sandbox::default();
        let mut table = Table::new(0);
        table.set_column("TEMP", Column::floats(Vec::new())).unwrap();
        evaluate(&sandbox, "Z", "TEMP*2", 0, &mut table).unwrap();
        assert_eq!(table.get_column("Z").unwrap().len(), 0);
        assert!(evaluate(&sandbox, "W", "TEMP*", 0, &mut table).is_err());
    }
}
