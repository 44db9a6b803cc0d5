//! Equation preprocessing.
//!
//! Before an equation can be compiled by Rhai its numeric literals are
//! rewritten into float form so every operation runs on IEEE doubles:
//!
//! - `3` → `3.0`
//! - `.5` → `0.5`, `2.` → `2.0`
//! - `1e-3` → `1.0e-3`
//!
//! Identifiers and operators pass through untouched.

use super::deps::{Token, tokenize};

/// Remove every whitespace character; whitespace carries no meaning in
/// equation text.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Rewrite an equation for evaluation.
pub fn preprocess_equation(equation: &str) -> String {
    let mut out = String::with_capacity(equation.len() + 8);
    for token in tokenize(equation) {
        match token {
            Token::Number(lit) => out.push_str(&float_literal(lit)),
            Token::Ident { name, .. } => out.push_str(name),
            Token::Malformed(text) | Token::Other(text) => out.push_str(text),
        }
    }
    out
}

fn float_literal(lit: &str) -> String {
    let (mantissa, exponent) = match lit.find(['e', 'E']) {
        Some(idx) => (&lit[..idx], Some(&lit[idx + 1..])),
        None => (lit, None),
    };

    let mut out = String::with_capacity(lit.len() + 3);
    if mantissa.starts_with('.') {
        out.push('0');
    }
    out.push_str(mantissa);
    if !mantissa.contains('.') {
        out.push_str(".0");
    } else if mantissa.ends_with('.') {
        out.push('0');
    }
    if let Some(exp) = exponent {
        out.push('e');
        out.push_str(exp);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_literals_become_floats() {
        assert_eq!(preprocess_equation("(TEMP*2)+1"), "(TEMP*2.0)+1.0");
    }

    #[test]
    fn test_fraction_and_exponent_forms() {
        assert_eq!(preprocess_equation(".5+2."), "0.5+2.0");
        assert_eq!(preprocess_equation("1e-3*X"), "1.0e-3*X");
        assert_eq!(preprocess_equation("6.02E23"), "6.02e23");
    }

    #[test]
    fn test_identifiers_with_digits_untouched() {
        assert_eq!(
            preprocess_equation("T68conv(CTDTMP2)**2"),
            "T68conv(CTDTMP2)**2.0"
        );
    }

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(strip_whitespace(" a +\n b\t"), "a+b");
    }
}
