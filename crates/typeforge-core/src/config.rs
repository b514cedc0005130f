//! Forge configuration.

use serde::Deserialize;

use crate::error::{ForgeError, ForgeResult};

/// Knobs shared by every definition created from one context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// Longest base chain the hierarchy walker will follow.
    pub max_hierarchy_depth: usize,
    /// Record a warning when a generated member hides a visible inherited one.
    pub warn_on_hiding: bool,
    /// Refuse to finalize while a concrete member has no body.
    pub require_bodies: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: 64,
            warn_on_hiding: true,
            require_bodies: true,
        }
    }
}

impl ForgeConfig {
    /// Parse a JSON document. Missing keys keep their defaults.
    pub fn from_json(text: &str) -> ForgeResult<Self> {
        let config: ForgeConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ForgeResult<()> {
        if self.max_hierarchy_depth == 0 {
            return Err(ForgeError::Config(
                "max_hierarchy_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = ForgeConfig::from_json(r#"{ "warn_on_hiding": false }"#).unwrap();
        assert!(!config.warn_on_hiding);
        assert_eq!(config.max_hierarchy_depth, 64);
        assert!(config.require_bodies);
    }

    #[test]
    fn test_rejects_unknown_keys_and_zero_depth() {
        let err = ForgeConfig::from_json(r#"{ "depth": 3 }"#).unwrap_err();
        assert!(matches!(err, ForgeError::Config(_)));

        let err = ForgeConfig::from_json(r#"{ "max_hierarchy_depth": 0 }"#).unwrap_err();
        assert!(err.is_configuration());
    }
}
