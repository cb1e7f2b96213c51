//! Generator configuration (apigen.toml)
//!
//! ```toml
//! [api]
//! allowed-packages = ["com.acme.api", "com.acme.api.model"]
//! validate-exposed-types = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Stub generator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StubConfig {
    /// API declaration
    #[serde(default)]
    pub api: ApiConfig,
}

/// The `[api]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Packages whose types may appear in the API; empty means every package
    #[serde(default)]
    pub allowed_packages: Vec<String>,

    /// Reject classes whose API references types outside the allowed packages
    #[serde(default)]
    pub validate_exposed_types: bool,
}

impl StubConfig {
    /// Create a configuration from an ordered package list
    pub fn new(allowed_packages: Vec<String>, validate_exposed_types: bool) -> Self {
        Self {
            api: ApiConfig {
                allowed_packages,
                validate_exposed_types,
            },
        }
    }

    /// Parse a configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a configuration from a string
    ///
    /// Duplicate packages are dropped, keeping the first occurrence.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: StubConfig = toml::from_str(content)?;
        config.validate()?;
        let mut seen: Vec<String> = Vec::with_capacity(config.api.allowed_packages.len());
        config.api.allowed_packages.retain(|package| {
            if seen.contains(package) {
                false
            } else {
                seen.push(package.clone());
                true
            }
        });
        Ok(config)
    }

    /// Validate package names
    pub fn validate(&self) -> Result<(), ConfigError> {
        for package in &self.api.allowed_packages {
            if package.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Allowed package name cannot be empty".to_string(),
                ));
            }
            if !is_valid_package_name(package) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid package name: {package}. Must be dot-separated Java identifiers (e.g., com.acme.api)"
                )));
            }
        }
        Ok(())
    }

    /// Write the configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Validate a dot-separated package name
fn is_valid_package_name(name: &str) -> bool {
    name.split('.').all(is_java_identifier)
}

/// Validate one package segment
fn is_java_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}
