//! Error type shared by tagging, scanning and dispatch.

use thiserror::Error;

/// Result alias for factory operations.
pub type FactoryResult<T> = Result<T, FactoryError>;

/// Errors produced by tag attachment, registry construction and dispatch.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The callable already carries an attachment under this group's key.
    #[error(
        "function `{function}` already has attachment `{key}`; registering it again would \
         overwrite the existing tag (use a different group)"
    )]
    DuplicateTag {
        /// Declared name of the offending function.
        function: String,
        /// Group-qualified attachment key that was already occupied.
        key: String,
    },

    /// Alias or group failed validation.
    #[error("invalid registration tag: {reason}")]
    InvalidTag {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Requested alias is not present in the registry.
    #[error("no function registered under alias `{alias}` in group `{group}`")]
    UnknownAlias {
        /// Alias that was looked up.
        alias: String,
        /// Group of the factory that performed the lookup.
        group: String,
    },

    /// Two scanned functions share an alias and the collision policy rejects it.
    #[error("alias `{alias}` is registered more than once in group `{group}`")]
    DuplicateAlias {
        /// Alias claimed by more than one function.
        alias: String,
        /// Group being built.
        group: String,
    },

    /// Factory configuration was invalid.
    #[error("invalid factory configuration: {0}")]
    InvalidConfig(&'static str),

    /// The invoked function failed; the error is carried as the function returned it.
    #[error(transparent)]
    Invocation(anyhow::Error),
}

impl FactoryError {
    /// Helper to construct tag validation errors from string-like values.
    #[must_use]
    pub fn invalid_tag(reason: impl Into<String>) -> Self {
        Self::InvalidTag {
            reason: reason.into(),
        }
    }

    /// Returns `true` for lookup failures.
    #[must_use]
    pub const fn is_unknown_alias(&self) -> bool {
        matches!(self, Self::UnknownAlias { .. })
    }
}
