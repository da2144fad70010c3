//! Error types for the plugin chain
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries the context a caller needs to act on it: the manifest
//! field that failed validation, the component that failed to render or to
//! become healthy, the config versions involved in a failed migration.

use std::fmt;

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for plugin operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Manifest validation error
    #[error("validation error for {field}: {message}")]
    Validation {
        /// The invalid field path (e.g., "properties.masterPoolProfile.count")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// Config generation error
    #[error("config error: {message}")]
    Config {
        /// Description of what failed
        message: String,
    },

    /// Persisted config could not be migrated to the current version
    #[error("config migration error (v{from} -> v{to}): {message}")]
    Migration {
        /// Version found in the persisted config
        from: u32,
        /// Version this build writes
        to: u32,
        /// Description of what failed
        message: String,
    },

    /// Certificate or key generation/parsing error
    #[error("pki error: {message}")]
    Pki {
        /// Description of what failed
        message: String,
    },

    /// Values rendering error
    #[error("render error [{component}]: {message}")]
    Render {
        /// Values document being rendered (hcp, nodes, addons)
        component: String,
        /// Description of what failed
        message: String,
    },

    /// Cluster component failed its health check
    #[error("health check failed [{component}]: {message}")]
    Health {
        /// Component that is not healthy (api-server, console, router)
        component: String,
        /// Last observed state
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error [{kind}]: {message}")]
    Serialization {
        /// The document kind being (de)serialized
        kind: String,
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Context where the error occurred
        context: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a validation error for a manifest field
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a config generation error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a migration error
    pub fn migration(from: u32, to: u32, msg: impl Into<String>) -> Self {
        Self::Migration {
            from,
            to,
            message: msg.into(),
        }
    }

    /// Create a PKI error
    pub fn pki(msg: impl Into<String>) -> Self {
        Self::Pki {
            message: msg.into(),
        }
    }

    /// Create a render error for a values document
    pub fn render(component: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Render {
            component: component.into(),
            message: msg.into(),
        }
    }

    /// Create a health error for a cluster component
    pub fn health(component: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Health {
            component: component.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error without specific context
    pub fn internal_unknown(msg: impl Into<String>) -> Self {
        Self::internal(UNKNOWN_CONTEXT, msg)
    }

    /// The manifest field this error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Every error found while validating a manifest
///
/// Validation never stops at the first problem so that callers can report
/// the complete list back to the user in one round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(pub Vec<Error>);

impl ValidationErrors {
    /// Create an empty error list
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validation error for a field
    pub fn push(&mut self, field: impl Into<String>, msg: impl Into<String>) {
        self.0.push(Error::validation(field, msg));
    }

    /// Append all errors from another list
    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// True if no errors were recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of errors recorded
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the recorded errors
    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.0.iter()
    }

    /// Return `Ok(value)` if empty, otherwise `Err(self)`
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err.to_string())
    }
}
