//! Build configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default recursion limit for nested schema nodes
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Date format flag value that marks a date-only field
pub const DEFAULT_DATE_ONLY_FORMAT: &str = "YYYY-MM-DD";

/// Options controlling a single document build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildOptions {
    /// Parameter name prefixes that place a parameter in the header (case-insensitive)
    pub header_prefixes: Vec<String>,
    /// Reject route parameters that have no declared parameter component
    pub strict_parameters: bool,
    /// Maximum schema nesting depth before the build is aborted
    pub max_depth: usize,
    /// Date format flag value that downgrades `date-time` to `date`
    pub date_only_format: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            header_prefixes: vec!["x-".to_string()],
            strict_parameters: false,
            max_depth: DEFAULT_MAX_DEPTH,
            date_only_format: DEFAULT_DATE_ONLY_FORMAT.to_string(),
        }
    }
}

impl BuildOptions {
    /// Parse and validate options from TOML; missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Validation(
                "max_depth must be greater than zero".to_string(),
            ));
        }
        if self.header_prefixes.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "header_prefixes must not contain empty prefixes".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a parameter name is conventionally sent as a header
    #[must_use]
    pub fn is_header_name(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.header_prefixes
            .iter()
            .any(|prefix| lower.starts_with(&prefix.to_ascii_lowercase()))
    }
}
