//! Turning a raw table into a typed, registered dataset.

use std::collections::BTreeSet;

use seaparam_engine::engine::{Column, DataType, Sandbox, Table, TabularStore};

use super::Dataset;
use crate::config::Settings;
use crate::definitions::DefinitionSource;
use crate::error::{CoreError, Result};
use crate::infer::{Inferred, display_precision, infer_column};
use crate::registry::{ColumnAttr, ColumnDescriptor, ColumnRegistry};
use crate::storage::RawTable;

/// Flag codes must lie in this range.
const FLAG_CODES: std::ops::RangeInclusive<i64> = 0..=9;

/// What ingest changed relative to the source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IngestReport {
    /// `(source header, column name)` for every header that was renamed.
    pub renamed: Vec<(String, String)>,
    /// Columns dropped because every value was missing.
    pub removed: Vec<String>,
    /// Columns added that were not in the source.
    pub created: Vec<String>,
    /// Flag columns set to the not-set code, with the number of rows changed.
    pub updated_flags: Vec<(String, usize)>,
}

/// Normalise a source header: `-` and `+` become `_`, whitespace is dropped
/// and letters are upper-cased.
pub fn sanitize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' | '+' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

impl Dataset {
    /// Build a dataset from a raw table.
    pub fn ingest(
        raw: RawTable,
        settings: Settings,
        sandbox: Sandbox,
        definitions: Box<dyn DefinitionSource>,
    ) -> Result<(Dataset, IngestReport)> {
        let missing = settings.missing_values()?;
        let mut report = IngestReport::default();
        let rows = raw.row_count();

        let names = column_names(&raw.headers, &settings)?;
        for (source, name) in raw.headers.iter().zip(&names) {
            if source != name {
                report.renamed.push((source.clone(), name.clone()));
            }
        }

        let values: Vec<Vec<String>> = (0..names.len())
            .map(|idx| raw.column(idx).iter().map(|v| v.trim().to_string()).collect())
            .collect();

        let mut keep = vec![true; names.len()];
        for (idx, name) in names.iter().enumerate() {
            if settings.has_attr(name, ColumnAttr::BasicParam) {
                continue;
            }
            if values[idx].iter().all(|v| missing.is_missing(v)) {
                keep[idx] = false;
                let flag = settings.flag_name(name);
                if let Some(flag_idx) = names.iter().position(|n| *n == flag) {
                    keep[flag_idx] = false;
                }
            }
        }
        for (idx, name) in names.iter().enumerate() {
            if !keep[idx] {
                report.removed.push(name.clone());
            }
        }
        if !report.removed.is_empty() {
            tracing::warn!(columns = %report.removed.join(","), "removed columns without values");
        }

        let mut table = Table::new(rows);
        let mut registry = ColumnRegistry::new();
        let mut inferred: Vec<Inferred> = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            if !keep[idx] {
                continue;
            }
            let column = infer_column(&values[idx], &missing, &settings.empty_flag_values);
            let mut descriptor = ColumnDescriptor::new(classify(name, &settings), column.data_type);
            if raw.headers[idx] != *name {
                descriptor.external_name = vec![raw.headers[idx].clone()];
            }
            descriptor.unit = raw.unit(idx).map(str::to_string);
            descriptor.precision = column.precision;
            descriptor.export = column.export;

            table.set_column(name, column.column.clone())?;
            registry.register_descriptor(&table, name, descriptor)?;
            inferred.push(column);
        }

        create_missing_flags(&mut table, &mut registry, &settings, &mut report)?;
        create_basic_params(&mut table, &mut registry, &settings, &mut report)?;
        validate_flags(&mut table, &mut registry, &settings, &mut report)?;

        let absent: Vec<&str> = settings
            .columns_with(ColumnAttr::Required)
            .into_iter()
            .filter(|name| !table.contains_column(name))
            .collect();
        if !absent.is_empty() {
            return Err(CoreError::Validation(format!(
                "missing required columns in the data: {}",
                absent.join(", ")
            )));
        }

        registry.validate(&table, &settings.flag_suffix)?;
        let display_precision = display_precision(&inferred, settings.max_display_precision);

        tracing::info!(
            rows,
            columns = table.column_count(),
            removed = report.removed.len(),
            created = report.created.len(),
            display_precision,
            "dataset ingested"
        );

        let dataset = Dataset {
            table,
            registry,
            settings,
            sandbox,
            definitions,
            display_precision,
        };
        Ok((dataset, report))
    }
}

/// Final column names: sanitised, aliases applied, `<P>F` flags renamed.
fn column_names(headers: &[String], settings: &Settings) -> Result<Vec<String>> {
    let mut names: Vec<String> = headers.iter().map(|h| sanitize_header(h)).collect();

    for (target, rule) in &settings.columns {
        if names.contains(target) {
            continue;
        }
        let found = rule
            .external_name
            .iter()
            .map(|alias| sanitize_header(alias))
            .find_map(|alias| names.iter().position(|n| *n == alias));
        if let Some(idx) = found {
            names[idx] = target.clone();
        }
    }

    let snapshot = names.clone();
    for (idx, name) in snapshot.iter().enumerate() {
        let Some(param) = name.strip_suffix('F') else {
            continue;
        };
        if param.is_empty() || !snapshot.iter().any(|n| n == param) {
            continue;
        }
        let flag = settings.flag_name(param);
        if !names.contains(&flag) {
            names[idx] = flag;
        }
    }

    let mut seen = BTreeSet::new();
    let duplicates: BTreeSet<&str> = names
        .iter()
        .filter(|n| !seen.insert(n.as_str()))
        .map(String::as_str)
        .collect();
    if !duplicates.is_empty() {
        let duplicates: Vec<&str> = duplicates.into_iter().collect();
        return Err(CoreError::Validation(format!(
            "duplicate column names: {}",
            duplicates.join(", ")
        )));
    }
    Ok(names)
}

fn classify(name: &str, settings: &Settings) -> BTreeSet<ColumnAttr> {
    let mut attrs = BTreeSet::new();
    if let Some(param) = settings.param_of_flag(name) {
        attrs.insert(ColumnAttr::ParamFlag);
        if !settings.has_attr(param, ColumnAttr::NonQcParam) {
            attrs.insert(ColumnAttr::QcParamFlag);
        }
        return attrs;
    }
    if settings.has_attr(name, ColumnAttr::BasicParam) {
        attrs.insert(ColumnAttr::BasicParam);
    }
    if settings.has_attr(name, ColumnAttr::Required) {
        attrs.insert(ColumnAttr::Required);
    } else if settings.has_attr(name, ColumnAttr::NonQcParam) {
        attrs.insert(ColumnAttr::NonQcParam);
    } else {
        attrs.insert(ColumnAttr::Param);
    }
    attrs
}

fn create_missing_flags(
    table: &mut Table,
    registry: &mut ColumnRegistry,
    settings: &Settings,
    report: &mut IngestReport,
) -> Result<()> {
    let params: Vec<String> = registry
        .iter()
        .filter(|(_, d)| d.needs_flag())
        .map(|(name, _)| name.to_string())
        .collect();
    for param in params {
        let flag = settings.flag_name(&param);
        if table.contains_column(&flag) {
            continue;
        }
        let column = Column::filled_integer(settings.default_flag_value, table.row_count());
        table.set_column(&flag, column)?;
        let mut descriptor = ColumnDescriptor::new(
            [ColumnAttr::ParamFlag, ColumnAttr::QcParamFlag, ColumnAttr::Created],
            DataType::Integer,
        );
        descriptor.precision = Some(0);
        registry.register_descriptor(table, &flag, descriptor)?;
        report.created.push(flag);
    }
    Ok(())
}

fn create_basic_params(
    table: &mut Table,
    registry: &mut ColumnRegistry,
    settings: &Settings,
    report: &mut IngestReport,
) -> Result<()> {
    for name in settings.columns_with(ColumnAttr::BasicParam) {
        if table.contains_column(name) {
            continue;
        }
        table.set_column(name, Column::Empty(table.row_count()))?;
        let mut descriptor = ColumnDescriptor::new(
            [ColumnAttr::Param, ColumnAttr::BasicParam, ColumnAttr::Created],
            DataType::Empty,
        );
        descriptor.export = false;
        registry.register_descriptor(table, name, descriptor)?;
        report.created.push(name.to_string());
    }
    Ok(())
}

/// Set flags to the not-set code where their parameter is missing, then
/// require every flag to be a present code in range.
fn validate_flags(
    table: &mut Table,
    registry: &mut ColumnRegistry,
    settings: &Settings,
    report: &mut IngestReport,
) -> Result<()> {
    let not_set = settings.not_set_flag();
    let mut problems = Vec::new();

    for name in table.column_names() {
        if settings.param_of_flag(&name).is_some() {
            continue;
        }
        let flag = settings.flag_name(&name);
        let (Some(param), Some(flag_column)) = (table.get_column(&name), table.get_column(&flag))
        else {
            continue;
        };

        let mut codes: Vec<Option<i64>> = match flag_column {
            Column::Integer { values, .. } => values.clone(),
            Column::Empty(len) => vec![None; *len],
            Column::Float(_) | Column::Text(_) => {
                problems.push(format!("flag column {flag} must hold integer codes"));
                continue;
            }
        };

        let mut updated = 0;
        for (row, code) in codes.iter_mut().enumerate() {
            if param.is_missing(row) && *code != Some(not_set) {
                *code = Some(not_set);
                updated += 1;
            }
        }

        let nulls = rows_where(&codes, |c| c.is_none());
        if !nulls.is_empty() {
            problems.push(format!("flag column {flag} has missing values in rows: {nulls}"));
        }
        let out_of_range = rows_where(&codes, |c| c.is_some_and(|c| !FLAG_CODES.contains(&c)));
        if !out_of_range.is_empty() {
            problems.push(format!(
                "flag column {flag} must hold values between 0-9, see rows: {out_of_range}"
            ));
        }

        if updated > 0 {
            tracing::warn!(
                flag = %flag,
                rows = updated,
                "flag set to not-set where parameter is missing"
            );
            let all_not_set = codes
                .iter()
                .all(|c| c.is_some_and(|c| settings.is_empty_flag(c)));
            table.set_column(&flag, Column::integers(codes))?;
            if let Some(descriptor) = registry.get_mut(&flag)
                && descriptor.data_type == DataType::Empty
                && !all_not_set
            {
                descriptor.data_type = DataType::Integer;
                descriptor.precision = Some(0);
                descriptor.export = true;
            }
            report.updated_flags.push((flag, updated));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(problems.join("; ")))
    }
}

fn rows_where(codes: &[Option<i64>], pred: impl Fn(&Option<i64>) -> bool) -> String {
    codes
        .iter()
        .enumerate()
        .filter(|(_, c)| pred(*c))
        .map(|(row, _)| row.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
