//! Identifier extraction from resolved equations.
//!
//! Splits equation text into tokens and classifies every identifier as one
//! of:
//! - a sandbox function (called or bare), never a dependency
//! - a call to a name the sandbox does not provide
//! - a data-column reference, i.e. an input dependency
//!
//! Numeric literals (`3`, `2.5`, `.5`, `1e-3`) are never reported.

use regex::Regex;
use std::sync::OnceLock;

use super::Sandbox;

/// A lexical token of equation text. Slices borrow from the source so the
/// tokens concatenate back to the exact input.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Token<'a> {
    Ident { name: &'a str, call: bool },
    Number(&'a str),
    /// A run that starts like a number but continues with identifier
    /// characters, e.g. `2A`.
    Malformed(&'a str),
    Other(&'a str),
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn tokenize(text: &str) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let digit_at = |i: usize| bytes.get(i).is_some_and(|b| b.is_ascii_digit());
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_digit() || (b == b'.' && digit_at(i + 1)) {
            let start = i;
            while digit_at(i) {
                i += 1;
            }
            if bytes.get(i) == Some(&b'.') {
                i += 1;
                while digit_at(i) {
                    i += 1;
                }
            }
            if matches!(bytes.get(i), Some(b'e' | b'E')) {
                if digit_at(i + 1) {
                    i += 1;
                } else if matches!(bytes.get(i + 1), Some(b'+' | b'-')) && digit_at(i + 2) {
                    i += 2;
                }
                while digit_at(i) {
                    i += 1;
                }
            }
            if bytes.get(i).is_some_and(|b| is_ident_char(*b as char)) {
                while bytes.get(i).is_some_and(|b| is_ident_char(*b as char)) {
                    i += 1;
                }
                tokens.push(Token::Malformed(&text[start..i]));
            } else {
                tokens.push(Token::Number(&text[start..i]));
            }
        } else if is_ident_char(b as char) {
            let start = i;
            while bytes.get(i).is_some_and(|b| is_ident_char(*b as char)) {
                i += 1;
            }
            let call = text[i..].trim_start().starts_with('(');
            tokens.push(Token::Ident {
                name: &text[start..i],
                call,
            });
        } else {
            // Multi-byte characters are kept whole.
            let len = text[i..].chars().next().map_or(1, char::len_utf8);
            tokens.push(Token::Other(&text[i..i + len]));
            i += len;
        }
    }

    tokens
}

/// True if `token` is an integer or floating-point literal, optionally
/// signed and optionally exponent-suffixed.
pub fn is_numeric_literal(token: &str) -> bool {
    numeric_literal_re().is_match(token)
}

fn numeric_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$")
            .expect("numeric literal regex must compile")
    })
}

/// Identifiers found in a resolved equation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EquationIdentifiers {
    /// Data-column references in first-appearance order.
    pub columns: Vec<String>,
    /// Sandbox functions the equation names.
    pub functions: Vec<String>,
    /// Called names the sandbox does not provide.
    pub unknown_calls: Vec<String>,
    /// Every identifier that names a sandbox entry (function or masked).
    pub sandboxed: Vec<String>,
    /// Tokens such as `2A` that are neither literal nor identifier.
    pub malformed: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// Classify the identifiers of `equation` against `sandbox`.
pub fn extract_identifiers(equation: &str, sandbox: &Sandbox) -> EquationIdentifiers {
    let mut ids = EquationIdentifiers::default();

    for token in tokenize(equation) {
        match token {
            Token::Ident { name, call } => {
                if sandbox.contains(name) {
                    push_unique(&mut ids.sandboxed, name);
                }
                if sandbox.is_function(name) {
                    push_unique(&mut ids.functions, name);
                } else if call {
                    push_unique(&mut ids.unknown_calls, name);
                } else if !is_numeric_literal(name) {
                    push_unique(&mut ids.columns, name);
                }
            }
            Token::Malformed(text) => push_unique(&mut ids.malformed, text),
            Token::Number(_) | Token::Other(_) => {}
        }
    }

    ids
}
