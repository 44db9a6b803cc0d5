//! External function providers.
//!
//! A provider contributes named numeric functions to the evaluation sandbox.
//! Providers are optional: one that cannot deliver its functions reports
//! [`ProviderUnavailable`] and the sandbox is built without them. Equations
//! that call those functions then fail with a missing-function error while
//! every other equation keeps working.

mod script;
mod seawater;

pub use script::ScriptFunctions;
pub use seawater::SeawaterProvider;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Implementation of a provider function. Errors become evaluation errors.
pub type NativeFn = Arc<dyn Fn(&[f64]) -> Result<f64, String> + Send + Sync>;

/// Largest arity the sandbox can register.
pub const MAX_ARITY: usize = 4;

/// A named numeric function with a fixed number of arguments.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        func: impl Fn(&[f64]) -> Result<f64, String> + Send + Sync + 'static,
    ) -> Self {
        NativeFunction {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }

    /// Wrap an infallible function.
    pub fn pure(
        name: impl Into<String>,
        arity: usize,
        func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, arity, move |args| Ok(func(args)))
    }

    pub fn call(&self, args: &[f64]) -> Result<f64, String> {
        if args.len() != self.arity {
            return Err(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.arity,
                args.len()
            ));
        }
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("function provider `{provider}` is unavailable: {reason}")]
pub struct ProviderUnavailable {
    pub provider: String,
    pub reason: String,
}

/// A source of sandbox functions.
pub trait FunctionProvider: Send + Sync {
    fn name(&self) -> &str;

    fn list_functions(&self) -> Result<Vec<NativeFunction>, ProviderUnavailable>;
}
