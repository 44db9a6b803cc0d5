//! Column rules loaded from `settings.toml`.
//!
//! ```toml
//! flag_suffix = "_FLAG_W"
//! empty_flag_values = [9]
//!
//! [columns.SALNTY]
//! external_name = ["CTDSAL_BTL"]
//! attrs = ["basic_param"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::registry::ColumnAttr;

pub const DEFAULT_FLAG_SUFFIX: &str = "_FLAG_W";

/// Rules for one configured column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRule {
    /// Source names mapped onto this column on ingest.
    pub external_name: Vec<String>,
    pub attrs: Vec<ColumnAttr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub flag_suffix: String,
    /// Flag codes meaning "no value". The first one is written where a
    /// parameter value is missing.
    pub empty_flag_values: Vec<i64>,
    /// Value of flag columns created for parameters that had none.
    pub default_flag_value: i64,
    /// Raw values matching any of these patterns are missing.
    pub missing_value_patterns: Vec<String>,
    pub max_display_precision: u32,
    /// Rendering of missing values on export.
    pub export_missing_value: String,
    pub columns: BTreeMap<String, ColumnRule>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            flag_suffix: DEFAULT_FLAG_SUFFIX.to_string(),
            empty_flag_values: vec![9],
            default_flag_value: 2,
            missing_value_patterns: vec![
                r"^\s*$".to_string(),
                r"^[Nn]a[Nn]$".to_string(),
                r"^-999(\.0*)?$".to_string(),
                r"^-990(\.0*)?$".to_string(),
            ],
            max_display_precision: 15,
            export_missing_value: "-999".to_string(),
            columns: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(text: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(text)?;
        if settings.flag_suffix.is_empty() {
            return Err(CoreError::Validation("flag_suffix must not be empty".into()));
        }
        Ok(settings)
    }

    pub fn flag_name(&self, param: &str) -> String {
        format!("{param}{}", self.flag_suffix)
    }

    /// Parameter owning the flag column `name`, if `name` is a flag name.
    pub fn param_of_flag<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_suffix(self.flag_suffix.as_str())
            .filter(|param| !param.is_empty())
    }

    /// Configured column names carrying `attr`, sorted.
    pub fn columns_with(&self, attr: ColumnAttr) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, rule)| rule.attrs.contains(&attr))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn has_attr(&self, name: &str, attr: ColumnAttr) -> bool {
        self.columns
            .get(name)
            .is_some_and(|rule| rule.attrs.contains(&attr))
    }

    /// Flag code written where the parameter value is missing.
    pub fn not_set_flag(&self) -> i64 {
        self.empty_flag_values.first().copied().unwrap_or(9)
    }

    pub fn is_empty_flag(&self, value: i64) -> bool {
        self.empty_flag_values.contains(&value)
    }

    pub fn missing_values(&self) -> Result<MissingValues> {
        let patterns = self
            .missing_value_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    CoreError::Validation(format!("invalid missing value pattern `{p}`: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MissingValues { patterns })
    }
}

/// Compiled missing-value patterns.
#[derive(Clone, Debug)]
pub struct MissingValues {
    patterns: Vec<Regex>,
}

impl MissingValues {
    pub fn is_missing(&self, raw: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.flag_name("SALNTY"), "SALNTY_FLAG_W");
        assert_eq!(settings.param_of_flag("SALNTY_FLAG_W"), Some("SALNTY"));
        assert_eq!(settings.param_of_flag("_FLAG_W"), None);
        assert_eq!(settings.param_of_flag("SALNTY"), None);
        assert_eq!(settings.not_set_flag(), 9);
    }

    #[test]
    fn test_default_missing_patterns() {
        let missing = Settings::default().missing_values().unwrap();
        for raw in ["", "  ", "NaN", "nan", "-999", "-999.0", "-999.000", "-990.00"] {
            assert!(missing.is_missing(raw), "{raw:?}");
        }
        for raw in ["0", "-99", "-9990", "9", "-999.5"] {
            assert!(!missing.is_missing(raw), "{raw:?}");
        }
    }

    #[test]
    fn test_parse_toml_columns() {
        let settings = Settings::from_toml(
            r#"
empty_flag_values = [9, 5]

[columns.SALNTY]
external_name = ["CTDSAL_BTL"]
attrs = ["basic_param", "required"]

[columns.CTDPRS]
attrs = ["non_qc_param"]
"#,
        )
        .unwrap();
        assert_eq!(settings.flag_suffix, "_FLAG_W");
        assert!(settings.is_empty_flag(5));
        assert_eq!(settings.columns_with(ColumnAttr::BasicParam), vec!["SALNTY"]);
        assert!(settings.has_attr("CTDPRS", ColumnAttr::NonQcParam));
        assert_eq!(settings.columns["SALNTY"].external_name, vec!["CTDSAL_BTL"]);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            Settings::from_toml("flag_suffix = ["),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_pattern_is_validation_error() {
        let settings = Settings {
            missing_value_patterns: vec!["(".into()],
            ..Default::default()
        };
        assert!(matches!(settings.missing_values(), Err(CoreError::Validation(_))));
    }
}
