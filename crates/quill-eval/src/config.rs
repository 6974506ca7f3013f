//! Interpreter configuration.

use serde::{Deserialize, Serialize};

/// Limits and output behaviour for one [`Interpreter`](crate::Interpreter).
///
/// Deserialises from JSON with every field optional:
///
/// ```
/// let config = quill_eval::EvalConfig::from_json(r#"{ "step_limit": 5000 }"#).unwrap();
/// assert_eq!(config.step_limit, Some(5000));
/// assert_eq!(config.max_call_depth, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// Maximum number of evaluation steps. `None` means unlimited.
    pub step_limit: Option<u64>,
    /// Maximum depth of nested method and block invocations.
    pub max_call_depth: usize,
    /// Also write `print`/`puts`/`p` output to stdout.
    pub echo_output: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            step_limit: None,
            max_call_depth: 10_000,
            echo_output: false,
        }
    }
}

impl EvalConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_echo_output(mut self, echo: bool) -> Self {
        self.echo_output = echo;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(EvalConfig::from_json("{}").unwrap(), EvalConfig::default());
    }

    #[test]
    fn all_fields() {
        let config = EvalConfig::from_json(
            r#"{ "step_limit": 10, "max_call_depth": 50, "echo_output": true }"#,
        )
        .unwrap();
        assert_eq!(
            config,
            EvalConfig::default()
                .with_step_limit(10)
                .with_max_call_depth(50)
                .with_echo_output(true)
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(EvalConfig::from_json(r#"{ "gas": 10 }"#).is_err());
    }
}
