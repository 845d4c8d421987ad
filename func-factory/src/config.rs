//! Serializable factory configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FactoryError, FactoryResult};
use crate::factory::{FuncFactory, FuncFactoryBuilder};
use crate::registry::CollisionPolicy;
use crate::tag::DEFAULT_GROUP;

/// Declarative description of a factory.
///
/// Namespaces are module paths whose `#[register]` functions are collected
/// with [`Namespace::collect`](crate::Namespace::collect).
///
/// ```
/// let config: func_factory::FactoryConfig = serde_json::from_str(
///     r#"{ "group": "math", "namespaces": ["app::ops"], "collision": "reject" }"#,
/// )
/// .unwrap();
/// assert!(config.warn_if_empty);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Group to collect.
    pub group: String,
    /// Module paths to scan, in scan order.
    pub namespaces: Vec<String>,
    /// Handling of repeated aliases.
    pub collision: CollisionPolicy,
    /// Whether an empty registry logs a warning.
    pub warn_if_empty: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            group: DEFAULT_GROUP.to_owned(),
            namespaces: Vec::new(),
            collision: CollisionPolicy::default(),
            warn_if_empty: true,
        }
    }
}

impl FactoryConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidConfig`] when the group or a namespace
    /// path is blank.
    pub fn validate(&self) -> FactoryResult<()> {
        if self.group.trim().is_empty() {
            return Err(FactoryError::InvalidConfig("group cannot be empty"));
        }
        if self.namespaces.iter().any(|path| path.trim().is_empty()) {
            return Err(FactoryError::InvalidConfig(
                "namespace path cannot be empty",
            ));
        }
        Ok(())
    }

    /// Collects the configured namespaces and builds the factory.
    ///
    /// # Errors
    ///
    /// Propagates validation, collection and construction errors.
    pub fn build(&self) -> FactoryResult<FuncFactory> {
        FuncFactoryBuilder::from_config(self)?.build()
    }
}
