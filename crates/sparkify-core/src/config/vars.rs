//! Environment variable interpolation for config files.
//!
//! Credentials and locations are usually injected into the YAML config this
//! way instead of being read from the process environment by the storage
//! layer. Supported syntax:
//! - `$VAR` or `${VAR}` - substitute with the variable, error if missing
//! - `${VAR:-default}` - use default if VAR is unset OR empty
//! - `${VAR-default}` - use default only if VAR is unset
//! - `$$` - literal `$`

use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                           # escaped dollar
        |
        \$\{
            ([A-Za-z_][A-Za-z0-9_]*)   # 1: braced name
            (?:(:?-)([^}]*))?          # 2: default operator, 3: default value
        \}
        |
        \$([A-Za-z_][A-Za-z0-9_]*)     # 4: bare name
        ",
    )
    .expect("Invalid regex pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Every variable that could not be resolved.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate process environment variables into `input`.
pub fn interpolate(input: &str) -> InterpolationResult {
    interpolate_with(input, |name| std::env::var(name).ok())
}

/// Interpolate using an arbitrary variable lookup.
///
/// Errors are accumulated so every missing variable is reported at once.
pub fn interpolate_with<F>(input: &str, lookup: F) -> InterpolationResult
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &Captures| {
            let whole = &caps[0];
            if whole == "$$" {
                return "$".to_string();
            }

            let name = caps
                .get(1)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let operator = caps.get(2).map(|m| m.as_str());
            let default = caps.get(3).map(|m| m.as_str());

            match (lookup(name), default) {
                (Some(value), _) if value.contains(['\n', '\r']) => {
                    errors.push(format!(
                        "environment variable '{name}' contains newlines, which is not allowed"
                    ));
                    whole.to_string()
                }
                (Some(value), Some(default)) if value.is_empty() && operator == Some(":-") => {
                    default.to_string()
                }
                (Some(value), _) => value,
                (None, Some(default)) => default.to_string(),
                (None, None) => {
                    errors.push(format!("environment variable '{name}' is not set"));
                    whole.to_string()
                }
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_bare_and_braced_substitution() {
        let result = interpolate_with(
            "key: $AWS_KEY\nsecret: ${AWS_SECRET}",
            lookup(&[("AWS_KEY", "abc"), ("AWS_SECRET", "xyz")]),
        );
        assert!(result.is_ok());
        assert_eq!(result.text, "key: abc\nsecret: xyz");
    }

    #[test]
    fn test_missing_variables_are_all_reported() {
        let result = interpolate_with("a: $ONE\nb: ${TWO}", lookup(&[]));
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("ONE"));
        assert!(result.errors[1].contains("TWO"));
    }

    #[test]
    fn test_default_when_unset() {
        let result = interpolate_with("root: ${OUTPUT_ROOT:-/tmp/out}", lookup(&[]));
        assert!(result.is_ok());
        assert_eq!(result.text, "root: /tmp/out");
    }

    #[test]
    fn test_colon_default_applies_to_empty_value() {
        let vars = [("REGION", "")];
        let result = interpolate_with("r: ${REGION:-us-west-2}", lookup(&vars));
        assert_eq!(result.text, "r: us-west-2");

        let result = interpolate_with("r: ${REGION-us-west-2}", lookup(&vars));
        assert_eq!(result.text, "r: ");
    }

    #[test]
    fn test_newline_injection_rejected() {
        let result = interpolate_with("v: $BAD", lookup(&[("BAD", "a\nb: c")]));
        assert!(!result.is_ok());
        assert!(result.errors[0].contains("newlines"));
    }

    #[test]
    fn test_escape_sequence() {
        let result = interpolate_with("price: $$100", lookup(&[]));
        assert!(result.is_ok());
        assert_eq!(result.text, "price: $100");
    }
}
