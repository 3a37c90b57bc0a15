use serde::Deserialize;
use std::path::Path;

use crate::graph::{TypeCode, TypeSystem};
use crate::registry::{RegistryError, WrapperRegistry};

/// Error type for loading and resolving a stage configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown type name {0:?}")]
    UnknownTypeName(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Startup configuration of one pipeline stage.
///
/// ```toml
/// stage = "relation-extraction"
/// query = ["kb.Relation", "kb.Entity"]
/// ```
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct StageConfig {
    #[serde(default)]
    pub stage: Option<String>,
    /// Type names the stage reads through `wrappers_of_types`.
    #[serde(default)]
    pub query: Vec<String>,
}

impl StageConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolves the queried type names to codes, checking each has a wrapper.
    ///
    /// Run this at startup so a misconfigured stage fails before it sees any
    /// processing unit.
    pub fn resolve(
        &self,
        types: &TypeSystem,
        registry: &WrapperRegistry,
    ) -> Result<Vec<TypeCode>, ConfigError> {
        let codes = self
            .query
            .iter()
            .map(|name| {
                types
                    .by_name(name)
                    .ok_or_else(|| ConfigError::UnknownTypeName(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        registry.require(&codes)?;
        Ok(codes)
    }
}
