//! Computed-parameter definition sources.
//!
//! Definitions are owned outside the dataset. The dataset re-reads them on
//! every operation so external edits are picked up, and only ever asks the
//! source to drop one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, Result};

/// One computed parameter: `param_name = equation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub param_name: String,
    pub equation: String,
    #[serde(default, deserialize_with = "int_or_string")]
    pub precision: u32,
    #[serde(default, deserialize_with = "text_or_false")]
    pub units: Option<String>,
}

impl Definition {
    pub fn new(param_name: impl Into<String>, equation: impl Into<String>, precision: u32) -> Self {
        Definition {
            param_name: param_name.into(),
            equation: equation.into(),
            precision,
            units: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrecision {
    Number(u32),
    Text(String),
}

fn int_or_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    match RawPrecision::deserialize(d)? {
        RawPrecision::Number(n) => Ok(n),
        RawPrecision::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn text_or_false<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Name → equation lookup over a definition list; first definition wins.
pub fn equation_lookup(definitions: &[Definition]) -> HashMap<&str, &str> {
    let mut map = HashMap::new();
    for def in definitions {
        map.entry(def.param_name.as_str())
            .or_insert(def.equation.as_str());
    }
    map
}

pub trait DefinitionSource: Send {
    /// Definitions in their listed order.
    fn list_definitions(&self) -> Result<Vec<Definition>>;

    fn remove_definition(&mut self, name: &str) -> Result<()>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InMemoryDefinitions {
    definitions: Vec<Definition>,
}

impl InMemoryDefinitions {
    pub fn new(definitions: Vec<Definition>) -> Self {
        InMemoryDefinitions { definitions }
    }

    pub fn push(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }
}

impl DefinitionSource for InMemoryDefinitions {
    fn list_definitions(&self) -> Result<Vec<Definition>> {
        Ok(self.definitions.clone())
    }

    fn remove_definition(&mut self, name: &str) -> Result<()> {
        let before = self.definitions.len();
        self.definitions.retain(|d| d.param_name != name);
        if self.definitions.len() == before {
            return Err(CoreError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

/// A project settings JSON file holding a `computed_params` array.
#[derive(Clone, Debug)]
pub struct ProjectSettingsFile {
    path: PathBuf,
}

impl ProjectSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProjectSettingsFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<serde_json::Value> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            CoreError::Validation(format!(
                "project settings file {} could not be opened: {e}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CoreError::Validation(format!(
                "project settings file {} is not valid JSON: {e}",
                self.path.display()
            ))
        })
    }
}

impl DefinitionSource for ProjectSettingsFile {
    fn list_definitions(&self) -> Result<Vec<Definition>> {
        let mut settings = self.read()?;
        match settings.get_mut("computed_params").map(serde_json::Value::take) {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(params) => Ok(serde_json::from_value(params)?),
        }
    }

    fn remove_definition(&mut self, name: &str) -> Result<()> {
        let mut settings = self.read()?;
        let params = settings
            .get_mut("computed_params")
            .and_then(serde_json::Value::as_array_mut)
            .ok_or_else(|| CoreError::NotFound(name.to_string()))?;
        let before = params.len();
        params.retain(|p| p.get("param_name").and_then(serde_json::Value::as_str) != Some(name));
        if params.len() == before {
            return Err(CoreError::NotFound(name.to_string()));
        }
        fs::write(&self.path, serde_json::to_string_pretty(&settings)?)?;
        tracing::info!(param = name, path = %self.path.display(), "definition removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn settings_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_precision_accepts_int_or_string() {
        let file = settings_file(
            r#"{"computed_params": [
                {"param_name": "A", "equation": "TEMP*2", "precision": "3", "units": "DEG C"},
                {"param_name": "B", "equation": "A+1", "precision": 0, "units": false}
            ]}"#,
        );
        let defs = ProjectSettingsFile::new(file.path()).list_definitions().unwrap();
        assert_eq!(defs[0], Definition::new("A", "TEMP*2", 3).with_units("DEG C"));
        assert_eq!(defs[1], Definition::new("B", "A+1", 0));
    }

    #[test]
    fn test_missing_computed_params_is_empty() {
        let file = settings_file(r#"{"other": 1}"#);
        assert!(ProjectSettingsFile::new(file.path()).list_definitions().unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_file_is_validation_error() {
        let source = ProjectSettingsFile::new("/nonexistent/seaparam/settings.json");
        assert!(matches!(source.list_definitions(), Err(CoreError::Validation(_))));
        let file = settings_file("{not json");
        assert!(matches!(
            ProjectSettingsFile::new(file.path()).list_definitions(),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_remove_definition_keeps_other_keys() {
        let file = settings_file(
            r#"{"qc_plot_tabs": {"P1": ["A"]}, "computed_params": [
                {"param_name": "A", "equation": "TEMP*2", "precision": 1},
                {"param_name": "B", "equation": "TEMP+1", "precision": 1}
            ]}"#,
        );
        let mut source = ProjectSettingsFile::new(file.path());
        source.remove_definition("A").unwrap();
        let defs = source.list_definitions().unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].param_name, "B");

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(raw["qc_plot_tabs"]["P1"][0], "A");
        assert!(matches!(source.remove_definition("A"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_lookup_first_definition_wins() {
        let defs = vec![Definition::new("A", "1", 0), Definition::new("A", "2", 0)];
        assert_eq!(equation_lookup(&defs).get("A"), Some(&"1"));
    }
}
