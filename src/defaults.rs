use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use seaparam_core::Settings;

fn config_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("org", "seaparam", "seaparam")?;
    Some(proj.config_dir().to_path_buf())
}

pub(crate) fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.toml"))
}

pub(crate) fn default_functions_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("default.rhai"))
}

pub(crate) fn prepend_default_functions_if_present(
    functions: &mut Vec<PathBuf>,
    no_defaults: bool,
) {
    if no_defaults {
        return;
    }
    let Some(path) = default_functions_path() else {
        return;
    };
    if path.is_file() {
        functions.insert(0, path);
    }
}

/// Column rules: the explicit file if given (it must load), else the one in
/// the config dir, else defaults.
pub(crate) fn load_settings(
    explicit: Option<&Path>,
    no_defaults: bool,
) -> anyhow::Result<Settings> {
    if let Some(path) = explicit {
        return Settings::load(path)
            .with_context(|| format!("failed to load column rules from {}", path.display()));
    }
    if no_defaults {
        return Ok(Settings::default());
    }
    let Some(path) = default_settings_path().filter(|p| p.is_file()) else {
        return Ok(Settings::default());
    };
    match Settings::load(&path) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid column rules");
            Ok(Settings::default())
        }
    }
}
