//! Interop options
//!
//! Options are plain data with defaults, loadable from a TOML table:
//!
//! ```toml
//! single_threaded = false
//! adapter_suffix = "$$Impl"
//! max_type_name_len = 128
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read options file
    #[error("Failed to read interop options: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse interop options: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid interop options: {0}")]
    ValidationError(String),
}

/// Options controlling the bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct InteropOptions {
    /// Generated adapter bodies verify they run on the thread that generated them
    pub single_threaded: bool,

    /// Suffix appended to generated adapter type names (default: "$$Adapter")
    pub adapter_suffix: String,

    /// Generated type names are truncated to this many characters
    pub max_type_name_len: usize,

    /// Reuse generated adapter types across requests without class-level overrides
    pub cache_adapters: bool,

    /// Ignore an inherited `toString` on behavior objects unless it is an own property
    pub hide_inherited_to_string: bool,
}

impl Default for InteropOptions {
    fn default() -> Self {
        Self {
            single_threaded: true,
            adapter_suffix: "$$Adapter".to_string(),
            max_type_name_len: 255,
            cache_adapters: true,
            hide_inherited_to_string: true,
        }
    }
}

impl InteropOptions {
    /// Parse options from a TOML string; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: InteropOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check option values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adapter_suffix.is_empty() {
            return Err(ConfigError::ValidationError(
                "adapter_suffix cannot be empty".to_string(),
            ));
        }
        if self.max_type_name_len <= self.adapter_suffix.len() {
            return Err(ConfigError::ValidationError(format!(
                "max_type_name_len ({}) must exceed the adapter suffix length ({})",
                self.max_type_name_len,
                self.adapter_suffix.len()
            )));
        }
        Ok(())
    }

    /// Set thread affinity checking
    pub fn with_single_threaded(mut self, single_threaded: bool) -> Self {
        self.single_threaded = single_threaded;
        self
    }

    /// Set adapter caching
    pub fn with_cache_adapters(mut self, cache_adapters: bool) -> Self {
        self.cache_adapters = cache_adapters;
        self
    }

    /// Set the generated type name suffix
    pub fn with_adapter_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.adapter_suffix = suffix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = InteropOptions::default();
        assert!(options.single_threaded);
        assert_eq!(options.adapter_suffix, "$$Adapter");
        assert_eq!(options.max_type_name_len, 255);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options = InteropOptions::from_toml_str("single_threaded = false\n").unwrap();
        assert!(!options.single_threaded);
        assert!(options.cache_adapters);
        assert!(options.hide_inherited_to_string);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = InteropOptions::from_toml_str("bogus = 1\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation() {
        let result = InteropOptions::from_toml_str("max_type_name_len = 4\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
