//! Deferred `${name}` property values.
//!
//! The orchestrating framework lets any property be a macro that is only
//! resolved from runtime arguments when the pipeline runs. Validation skips
//! format checks on such values; [`resolve_macros`] fills them in.

use std::collections::HashMap;
use std::sync::LazyLock;

static MACRO_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("valid macro regex"));

/// Whether the value contains at least one `${name}` macro.
#[must_use]
pub fn contains_macro(value: &str) -> bool {
    MACRO_RE.is_match(value)
}

/// Macro arguments that were referenced but not supplied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing macro arguments: {}", .0.join(", "))]
pub struct MissingArguments(pub Vec<String>);

/// Substitute every `${name}` in `value` from `arguments`.
///
/// # Errors
///
/// Returns every referenced name without an argument, in order of first use.
pub fn resolve_macros(
    value: &str,
    arguments: &HashMap<String, String>,
) -> Result<String, MissingArguments> {
    let mut missing: Vec<String> = Vec::new();
    let resolved = MACRO_RE.replace_all(value, |caps: &regex::Captures<'_>| {
        let name = caps[1].trim();
        match arguments.get(name) {
            Some(v) => v.clone(),
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(resolved.into_owned())
    } else {
        Err(MissingArguments(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn detects_macros() {
        assert!(contains_macro("${table}"));
        assert!(contains_macro("events_${env}"));
        assert!(!contains_macro("events"));
        assert!(!contains_macro("$table"));
    }

    #[test]
    fn substitutes_all_occurrences() {
        let resolved = resolve_macros(
            "${host}:7051,${host}:7052",
            &args(&[("host", "kudu")]),
        )
        .unwrap();
        assert_eq!(resolved, "kudu:7051,kudu:7052");
    }

    #[test]
    fn reports_every_missing_argument_once() {
        let err = resolve_macros("${a}-${b}-${a}-${c}", &args(&[("b", "x")])).unwrap_err();
        assert_eq!(err, MissingArguments(vec!["a".into(), "c".into()]));
        assert_eq!(err.to_string(), "missing macro arguments: a, c");
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve_macros("events", &HashMap::new()).unwrap(), "events");
    }
}
