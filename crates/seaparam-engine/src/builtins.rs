//! Built-in math functions (Rust).
//!
//! Conventions:
//! - Names follow the C math library (`fabs`, `fmod`, `log10`, ...).
//! - Every argument and result is an `f64`; literals are rewritten to floats
//!   before evaluation so no integer overloads are needed.
//! - If you add a new built-in, add it to `MATH_BUILTINS` and register its
//!   implementation in `register_math_builtins`.

use rhai::Engine;

/// Math built-in names exposed in every sandbox.
pub const MATH_BUILTINS: &[&str] = &[
    "acos", "asin", "atan", "atan2", "ceil", "cos", "cosh", "degrees", "exp", "fabs", "floor",
    "fmod", "hypot", "ldexp", "log", "log10", "log2", "pow", "radians", "remainder", "round", "sin",
    "sinh", "sqrt", "tan", "tanh", "trunc",
];

/// IEEE 754 remainder: `x - n*y` where `n` is `x/y` rounded half to even.
fn ieee_remainder(x: f64, y: f64) -> f64 {
    if y == 0.0 || !x.is_finite() || y.is_nan() {
        return f64::NAN;
    }
    if y.is_infinite() {
        return x;
    }
    x - (x / y).round_ties_even() * y
}

/// Register the math built-ins plus unary sign operators into the engine.
pub fn register_math_builtins(engine: &mut Engine) {
    // Unary sign on variables; literal signs are folded by the parser.
    engine.register_fn("-", |x: f64| -> f64 { -x });
    engine.register_fn("+", |x: f64| -> f64 { x });

    engine.register_fn("acos", |x: f64| -> f64 { x.acos() });
    engine.register_fn("asin", |x: f64| -> f64 { x.asin() });
    engine.register_fn("atan", |x: f64| -> f64 { x.atan() });
    engine.register_fn("atan2", |y: f64, x: f64| -> f64 { y.atan2(x) });
    engine.register_fn("ceil", |x: f64| -> f64 { x.ceil() });
    engine.register_fn("cos", |x: f64| -> f64 { x.cos() });
    engine.register_fn("cosh", |x: f64| -> f64 { x.cosh() });
    engine.register_fn("degrees", |x: f64| -> f64 { x.to_degrees() });
    engine.register_fn("exp", |x: f64| -> f64 { x.exp() });
    engine.register_fn("fabs", |x: f64| -> f64 { x.abs() });
    engine.register_fn("floor", |x: f64| -> f64 { x.floor() });
    engine.register_fn("fmod", |x: f64, y: f64| -> f64 { x % y });
    engine.register_fn("hypot", |x: f64, y: f64| -> f64 { x.hypot(y) });
    engine.register_fn("ldexp", |x: f64, i: f64| -> f64 { x * 2f64.powf(i.trunc()) });
    engine.register_fn("log", |x: f64| -> f64 { x.ln() });
    engine.register_fn("log", |x: f64, base: f64| -> f64 { x.ln() / base.ln() });
    engine.register_fn("log10", |x: f64| -> f64 { x.log10() });
    engine.register_fn("log2", |x: f64| -> f64 { x.log2() });
    engine.register_fn("pow", |x: f64, y: f64| -> f64 { x.powf(y) });
    engine.register_fn("radians", |x: f64| -> f64 { x.to_radians() });
    engine.register_fn("remainder", ieee_remainder);
    engine.register_fn("round", |x: f64| -> f64 { x.round_ties_even() });
    engine.register_fn("round", |x: f64, n: f64| -> f64 {
        let places = n.max(0.0).min(15.0) as u32;
        crate::engine::round_half_even(x, places)
    });
    engine.register_fn("sin", |x: f64| -> f64 { x.sin() });
    engine.register_fn("sinh", |x: f64| -> f64 { x.sinh() });
    engine.register_fn("sqrt", |x: f64| -> f64 { x.sqrt() });
    engine.register_fn("tan", |x: f64| -> f64 { x.tan() });
    engine.register_fn("tanh", |x: f64| -> f64 { x.tanh() });
    engine.register_fn("trunc", |x: f64| -> f64 { x.trunc() });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let mut engine = Engine::new_raw();
        register_math_builtins(&mut engine);
        engine
    }

    #[test]
    fn test_every_listed_builtin_is_callable() {
        let engine = engine();
        for b in MATH_BUILTINS {
            let script = match *b {
                "atan2" | "fmod" | "hypot" | "ldexp" | "pow" | "remainder" => {
                    format!("{b}(0.5, 0.5)")
                }
                _ => format!("{b}(0.5)"),
            };
            let result = engine.eval::<f64>(&script);
            assert!(result.is_ok(), "{b} failed: {result:?}");
        }
    }

    #[test]
    fn test_log_with_base() {
        let result: f64 = engine().eval("log(8.0, 2.0)").unwrap();
        assert!((result - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unary_minus_on_variable() {
        let engine = engine();
        let mut scope = rhai::Scope::new();
        scope.push_constant("X", 2.5_f64);
        let result: f64 = engine.eval_with_scope(&mut scope, "-X * 2.0").unwrap();
        assert_eq!(result, -5.0);
    }

    #[test]
    fn test_remainder_rounds_half_to_even() {
        assert_eq!(ieee_remainder(5.0, 2.0), 1.0);
        assert_eq!(ieee_remainder(7.0, 2.0), -1.0);
        assert!(ieee_remainder(1.0, 0.0).is_nan());
    }

    #[test]
    fn test_fmod_keeps_sign_of_dividend() {
        let result: f64 = engine().eval("fmod(-7.0, 3.0)").unwrap();
        assert_eq!(result, -1.0);
    }
}
