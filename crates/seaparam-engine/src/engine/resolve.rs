//! Nested computed-parameter resolution.
//!
//! An equation may reference other computed parameters with `${NAME}`
//! placeholders. Resolution replaces each placeholder with the parenthesised
//! equation of the referenced definition, recursively, until none remain.
//!
//! The names being expanded on the current path are tracked depth-first so a
//! definition that reaches itself is reported instead of expanding forever.

use regex::Regex;
use std::sync::OnceLock;

use super::preprocess::strip_whitespace;
use crate::error::EquationError;

/// Regex that matches `${NAME}` placeholders.
///
/// Captures:
/// - group 1: referenced parameter name
pub fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("placeholder regex must compile")
    })
}

/// Expand every placeholder in `raw_equation`.
///
/// `lookup` returns the raw equation text of a definition by name.
pub fn resolve_equation<F>(raw_equation: &str, lookup: F) -> Result<String, EquationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut path = Vec::new();
    expand(&strip_whitespace(raw_equation), &lookup, &mut path)
}

/// Expand the equation of the definition called `name`.
///
/// The root name is on the path from the start, so `A: "${A} + 1"` is
/// reported as a cycle `A -> A`.
pub fn resolve_definition<F>(name: &str, lookup: F) -> Result<String, EquationError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).ok_or_else(|| EquationError::UnknownReference {
        name: name.to_string(),
    })?;
    let mut path = vec![name.to_string()];
    expand(&strip_whitespace(&raw), &lookup, &mut path)
}

fn expand<F>(text: &str, lookup: &F, path: &mut Vec<String>) -> Result<String, EquationError>
where
    F: Fn(&str) -> Option<String>,
{
    let re = placeholder_re();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        if path.iter().any(|p| p == name) {
            let mut cycle = path.clone();
            cycle.push(name.to_string());
            return Err(EquationError::CyclicDefinition { cycle });
        }

        let inner = lookup(name).ok_or_else(|| EquationError::UnknownReference {
            name: name.to_string(),
        })?;
        tracing::debug!(reference = name, equation = %inner, "expanding placeholder");

        path.push(name.to_string());
        let expanded = expand(&strip_whitespace(&inner), lookup, path)?;
        path.pop();

        out.push('(');
        out.push_str(&expanded);
        out.push(')');
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn defs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_nested_reference() {
        let d = defs(&[("A", "${B} + 1"), ("B", "TEMP * 2")]);
        let out = resolve_definition("A", |n| d.get(n).cloned()).unwrap();
        assert_eq!(out, "(TEMP*2)+1");
        assert!(!placeholder_re().is_match(&out));
    }

    #[test]
    fn test_resolve_multi_level() {
        let d = defs(&[("A", "${B}/${C}"), ("B", "${C}+1"), ("C", "SALNTY")]);
        let out = resolve_equation("${A}", |n| d.get(n).cloned()).unwrap();
        assert_eq!(out, "(((SALNTY)+1)/(SALNTY))");
    }

    #[test]
    fn test_resolve_without_placeholders_strips_whitespace() {
        let out = resolve_equation(" CTDTMP *\t2 ", |_| None).unwrap();
        assert_eq!(out, "CTDTMP*2");
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let d = defs(&[("A", "${A} + 1")]);
        let err = resolve_definition("A", |n| d.get(n).cloned()).unwrap_err();
        assert_eq!(
            err,
            EquationError::CyclicDefinition {
                cycle: vec!["A".into(), "A".into()]
            }
        );
    }

    #[test]
    fn test_transitive_cycle_detected_from_raw_equation() {
        let d = defs(&[("A", "${B}"), ("B", "${C}*2"), ("C", "${A}-1")]);
        let err = resolve_equation("${A}", |n| d.get(n).cloned()).unwrap_err();
        assert_eq!(
            err,
            EquationError::CyclicDefinition {
                cycle: vec!["A".into(), "B".into(), "C".into(), "A".into()]
            }
        );
    }

    #[test]
    fn test_repeated_reference_is_not_a_cycle() {
        let d = defs(&[("A", "${B}*${B}"), ("B", "OXYGEN")]);
        let out = resolve_definition("A", |n| d.get(n).cloned()).unwrap();
        assert_eq!(out, "(OXYGEN)*(OXYGEN)");
    }

    #[test]
    fn test_unknown_reference() {
        let err = resolve_equation("${NOPE}+1", |_| None).unwrap_err();
        assert_eq!(
            err,
            EquationError::UnknownReference {
                name: "NOPE".into()
            }
        );
    }
}
