//! # Compiler Options
//!
//! Knobs for the generated output. Every field has a default, so a JSON
//! document only needs to name what it changes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Name of the generated class. Defaults to the graph name.
    pub class_name: Option<String>,
    pub namespace: Option<String>,
    /// Spaces per indentation level.
    pub indent: usize,
    /// Labels are named `<prefix><n>`.
    pub label_prefix: String,
    /// Field type used when a variable declares none.
    pub fallback_type: String,
    /// Identifier emitted for a value input with no link and no literal.
    pub placeholder_identifier: String,
    /// Write the "generated, do not edit" banner.
    pub emit_header: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            class_name: None,
            namespace: None,
            indent: 4,
            label_prefix: "block".to_string(),
            fallback_type: "object".to_string(),
            placeholder_identifier: "unresolved".to_string(),
            emit_header: true,
        }
    }
}

impl CompilerOptions {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.label_prefix) {
            return Err(ConfigError::Invalid(format!(
                "label_prefix '{}' is not a valid identifier",
                self.label_prefix
            )));
        }
        if !is_identifier(&self.placeholder_identifier) {
            return Err(ConfigError::Invalid(format!(
                "placeholder_identifier '{}' is not a valid identifier",
                self.placeholder_identifier
            )));
        }
        if self.fallback_type.trim().is_empty() {
            return Err(ConfigError::Invalid("fallback_type must not be empty".to_string()));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options = CompilerOptions::from_json_str(r#"{ "class_name": "Door", "indent": 2 }"#).unwrap();
        assert_eq!(options.class_name.as_deref(), Some("Door"));
        assert_eq!(options.indent, 2);
        assert_eq!(options.label_prefix, "block");
        assert!(options.emit_header);
    }

    #[test]
    fn invalid_label_prefix_is_rejected() {
        let err = CompilerOptions::from_json_str(r#"{ "label_prefix": "9lives" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = CompilerOptions::from_json_str("{ indent: ").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
