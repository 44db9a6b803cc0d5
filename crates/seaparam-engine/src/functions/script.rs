//! User-defined functions loaded from a Rhai script file.
//!
//! Every function the script defines becomes a sandbox function. Scripts run
//! on their own raw engine with the math built-ins and an operation budget.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rhai::{AST, Dynamic, Engine, Scope};

use super::{FunctionProvider, MAX_ARITY, NativeFunction, ProviderUnavailable};
use crate::builtins::register_math_builtins;

/// Reject function files larger than this.
const MAX_FUNCTION_FILE_BYTES: u64 = 1024 * 1024;
const MAX_SCRIPT_OPERATIONS: u64 = 100_000;
const MAX_SCRIPT_CALL_LEVELS: usize = 32;

#[derive(Debug, Clone)]
pub struct ScriptFunctions {
    label: String,
    source: Result<String, String>,
}

impl ScriptFunctions {
    pub fn from_source(label: impl Into<String>, source: impl Into<String>) -> Self {
        ScriptFunctions {
            label: label.into(),
            source: Ok(source.into()),
        }
    }

    /// Read the script now. A file that cannot be read leaves the provider
    /// unavailable rather than failing here.
    pub fn from_file(path: &Path) -> Self {
        ScriptFunctions {
            label: path.display().to_string(),
            source: read_script(path),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn unavailable(&self, reason: impl Into<String>) -> ProviderUnavailable {
        ProviderUnavailable {
            provider: self.label.clone(),
            reason: reason.into(),
        }
    }
}

fn read_script(path: &Path) -> Result<String, String> {
    let meta = fs::metadata(path).map_err(|e| e.to_string())?;
    if meta.len() > MAX_FUNCTION_FILE_BYTES {
        return Err(format!(
            "functions file too large ({} bytes, max {MAX_FUNCTION_FILE_BYTES})",
            meta.len()
        ));
    }
    fs::read_to_string(path).map_err(|e| e.to_string())
}

fn script_engine() -> Engine {
    let mut engine = Engine::new_raw();
    register_math_builtins(&mut engine);
    engine.set_max_operations(MAX_SCRIPT_OPERATIONS);
    engine.set_max_call_levels(MAX_SCRIPT_CALL_LEVELS);
    engine
}

impl FunctionProvider for ScriptFunctions {
    fn name(&self) -> &str {
        &self.label
    }

    fn list_functions(&self) -> Result<Vec<NativeFunction>, ProviderUnavailable> {
        let source = self.source.as_ref().map_err(|e| self.unavailable(e.clone()))?;
        let engine = script_engine();
        let ast = engine
            .compile(source)
            .map_err(|e| self.unavailable(format!("compile error: {e}")))?;

        let engine = Arc::new(engine);
        let ast = Arc::new(ast);
        let mut functions = Vec::new();
        let signatures: Vec<(String, usize)> = ast
            .iter_functions()
            .map(|f| (f.name.to_string(), f.params.len()))
            .collect();

        for (name, arity) in signatures {
            if arity > MAX_ARITY {
                tracing::warn!(
                    provider = %self.label,
                    function = %name,
                    arity,
                    "script function takes too many arguments; skipped"
                );
                continue;
            }
            let engine = Arc::clone(&engine);
            let ast = Arc::clone(&ast);
            let fn_name = name.clone();
            functions.push(NativeFunction::new(name, arity, move |args| {
                call_script(&engine, &ast, &fn_name, args)
            }));
        }
        Ok(functions)
    }
}

fn call_script(engine: &Engine, ast: &AST, name: &str, args: &[f64]) -> Result<f64, String> {
    let mut scope = Scope::new();
    let result = match args {
        [] => engine.call_fn::<Dynamic>(&mut scope, ast, name, ()),
        [a] => engine.call_fn::<Dynamic>(&mut scope, ast, name, (*a,)),
        [a, b] => engine.call_fn::<Dynamic>(&mut scope, ast, name, (*a, *b)),
        [a, b, c] => engine.call_fn::<Dynamic>(&mut scope, ast, name, (*a, *b, *c)),
        [a, b, c, d] => engine.call_fn::<Dynamic>(&mut scope, ast, name, (*a, *b, *c, *d)),
        _ => return Err(format!("{name}: too many arguments")),
    }
    .map_err(|e| format!("{name}: {e}"))?;

    result
        .as_float()
        .ok()
        .or_else(|| result.as_int().ok().map(|i| i as f64))
        .ok_or_else(|| format!("{name} returned {} instead of a number", result.type_name()))
}
