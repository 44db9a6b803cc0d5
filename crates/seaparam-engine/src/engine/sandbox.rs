//! The evaluation sandbox.
//!
//! A raw Rhai engine (no standard packages) with the ambient language
//! surface masked off, the math built-ins registered, and whatever the
//! function providers contribute on top. The set of names is fixed once
//! [`SandboxBuilder::build`] returns.

use std::collections::BTreeMap;
use std::fmt;

use rhai::{Engine, EvalAltResult, Position};

use crate::builtins::{MATH_BUILTINS, register_math_builtins};
use crate::functions::{FunctionProvider, MAX_ARITY, NativeFn, NativeFunction, ProviderUnavailable};

/// Keywords and ambient functions an equation may never reach.
pub const MASKED_SYMBOLS: &[&str] = &[
    "print", "debug", "eval", "type_of", "Fn", "call", "curry", "is_def_var", "is_def_fn",
    "is_shared", "this", "global", "let", "const", "fn", "private", "import", "export", "if",
    "switch", "while", "loop", "for", "do", "return", "throw", "try",
];

const MAX_EXPR_DEPTH: usize = 64;
const MAX_FN_EXPR_DEPTH: usize = 32;
const MAX_CALL_LEVELS: usize = 16;
/// Operation budget for one row of one equation.
const MAX_OPERATIONS: u64 = 200_000;
const MAX_STRING_SIZE: usize = 4096;

/// What a sandbox name refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SandboxEntry {
    /// A callable function and the provider that contributed it.
    Function { origin: String },
    /// A masked ambient name; it cannot be called or shadowed.
    Masked,
}

pub struct Sandbox {
    engine: Engine,
    entries: BTreeMap<String, SandboxEntry>,
    unavailable: Vec<ProviderUnavailable>,
}

impl Sandbox {
    pub fn builder() -> SandboxBuilder {
        SandboxBuilder::new()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn entry(&self, name: &str) -> Option<&SandboxEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(SandboxEntry::Function { .. }))
    }

    pub fn is_masked(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(SandboxEntry::Masked))
    }

    /// Callable names in sorted order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, SandboxEntry::Function { .. }))
            .map(|(n, _)| n.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SandboxEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Providers that could not contribute their functions.
    pub fn unavailable_providers(&self) -> &[ProviderUnavailable] {
        &self.unavailable
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Sandbox::builder().build()
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox")
            .field("entries", &self.entries)
            .field("unavailable", &self.unavailable)
            .finish_non_exhaustive()
    }
}

pub struct SandboxBuilder {
    engine: Engine,
    entries: BTreeMap<String, SandboxEntry>,
    unavailable: Vec<ProviderUnavailable>,
}

impl SandboxBuilder {
    fn new() -> Self {
        let mut engine = Engine::new_raw();
        let mut entries = BTreeMap::new();

        for symbol in MASKED_SYMBOLS {
            engine.disable_symbol(*symbol);
            entries.insert(symbol.to_string(), SandboxEntry::Masked);
        }

        register_math_builtins(&mut engine);
        for builtin in MATH_BUILTINS {
            entries.insert(
                builtin.to_string(),
                SandboxEntry::Function {
                    origin: "math".to_string(),
                },
            );
        }

        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FN_EXPR_DEPTH);
        engine.set_max_call_levels(MAX_CALL_LEVELS);
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_string_size(MAX_STRING_SIZE);

        SandboxBuilder {
            engine,
            entries,
            unavailable: Vec::new(),
        }
    }

    /// Install every function `provider` lists. An unavailable provider is
    /// logged and skipped.
    pub fn with_provider(mut self, provider: &dyn FunctionProvider) -> Self {
        match provider.list_functions() {
            Ok(functions) => {
                let count = functions.len();
                for function in functions {
                    self.install(provider.name(), function);
                }
                tracing::debug!(provider = provider.name(), count, "function provider installed");
            }
            Err(e) => {
                tracing::warn!(
                    provider = %e.provider,
                    reason = %e.reason,
                    "function provider unavailable"
                );
                self.unavailable.push(e);
            }
        }
        self
    }

    fn install(&mut self, origin: &str, function: NativeFunction) {
        if self.entries.get(&function.name) == Some(&SandboxEntry::Masked) {
            tracing::warn!(
                origin,
                function = %function.name,
                "function would unmask a reserved name; skipped"
            );
            return;
        }
        if function.arity > MAX_ARITY || !is_identifier(&function.name) {
            tracing::warn!(
                origin,
                function = %function.name,
                arity = function.arity,
                "function cannot be registered; skipped"
            );
            return;
        }
        register_native(&mut self.engine, &function);
        self.entries.insert(
            function.name,
            SandboxEntry::Function {
                origin: origin.to_string(),
            },
        );
    }

    pub fn build(self) -> Sandbox {
        Sandbox {
            engine: self.engine,
            entries: self.entries,
            unavailable: self.unavailable,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn invoke(func: &NativeFn, args: &[f64]) -> Result<f64, Box<EvalAltResult>> {
    func(args).map_err(|message| EvalAltResult::ErrorRuntime(message.into(), Position::NONE).into())
}

fn register_native(engine: &mut Engine, function: &NativeFunction) {
    let name = function.name.as_str();
    let f = function.func.clone();
    match function.arity {
        0 => {
            engine.register_fn(name, move || invoke(&f, &[]));
        }
        1 => {
            engine.register_fn(name, move |a: f64| invoke(&f, &[a]));
        }
        2 => {
            engine.register_fn(name, move |a: f64, b: f64| invoke(&f, &[a, b]));
        }
        3 => {
            engine.register_fn(name, move |a: f64, b: f64, c: f64| invoke(&f, &[a, b, c]));
        }
        4 => {
            engine.register_fn(name, move |a: f64, b: f64, c: f64, d: f64| {
                invoke(&f, &[a, b, c, d])
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{ScriptFunctions, SeawaterProvider};

    struct Fixed(Vec<NativeFunction>);

    impl FunctionProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn list_functions(&self) -> Result<Vec<NativeFunction>, ProviderUnavailable> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_masked_symbols_cannot_be_used() {
        let sandbox = Sandbox::default();
        assert!(sandbox.is_masked("print"));
        assert!(sandbox.engine().compile_expression("print(1.0)").is_err());
        assert!(sandbox.engine().compile_expression("eval(\"1\")").is_err());
    }

    #[test]
    fn test_math_builtins_are_functions() {
        let sandbox = Sandbox::default();
        assert!(sandbox.is_function("sqrt"));
        assert!(!sandbox.is_function("print"));
        let value: f64 = sandbox.engine().eval_expression("sqrt(16.0) + 1.0").unwrap();
        assert_eq!(value, 5.0);
    }

    #[test]
    fn test_provider_functions_are_installed() {
        let sandbox = Sandbox::builder().with_provider(&SeawaterProvider).build();
        assert_eq!(
            sandbox.entry("dens0"),
            Some(&SandboxEntry::Function {
                origin: "seawater".into()
            })
        );
        let value: f64 = sandbox.engine().eval_expression("smow(0.0)").unwrap();
        assert!((value - 999.842594).abs() < 1e-9);
        let overload: f64 = sandbox.engine().eval_expression("g(0.0, 0.0)").unwrap();
        assert!((overload - 9.780318).abs() < 1e-9);
        let theta: f64 = sandbox
            .engine()
            .eval_expression("ptmp(35.0, 10.0, 2000.0, 0.0)")
            .unwrap();
        let theta_default: f64 = sandbox
            .engine()
            .eval_expression("ptmp(35.0, 10.0, 2000.0)")
            .unwrap();
        assert!(theta < 10.0);
        assert_eq!(theta, theta_default);
    }

    #[test]
    fn test_unavailable_provider_is_skipped() {
        let broken = ScriptFunctions::from_source("broken.rhai", "fn (");
        let sandbox = Sandbox::builder()
            .with_provider(&broken)
            .with_provider(&SeawaterProvider)
            .build();
        assert_eq!(sandbox.unavailable_providers().len(), 1);
        assert!(sandbox.is_function("smow"));
    }

    #[test]
    fn test_provider_cannot_unmask() {
        let provider = Fixed(vec![NativeFunction::pure("eval", 1, |a| a[0])]);
        let sandbox = Sandbox::builder().with_provider(&provider).build();
        assert!(sandbox.is_masked("eval"));
    }

    #[test]
    fn test_native_error_surfaces_at_runtime() {
        let provider = Fixed(vec![NativeFunction::new("boom", 1, |_| Err("bad input".into()))]);
        let sandbox = Sandbox::builder().with_provider(&provider).build();
        let err = sandbox.engine().eval_expression::<f64>("boom(1.0)").unwrap_err();
        assert!(err.to_string().contains("bad input"));
    }
}
