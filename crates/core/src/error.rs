//! Error types for the model registry
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! `ModelError` is `Clone`: a failed build is delivered to every caller that
//! was waiting on it, not only the one that triggered it.

use crate::contract::VersionParseError;
use crate::types::Classification;
use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Failure reported by a model builder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to build model for '{type_path}': {message}")]
pub struct BuildError {
    /// Qualified path of the type descriptor being built
    pub type_path: String,
    /// Human-readable cause
    pub message: String,
}

impl BuildError {
    /// Create a build error for a type descriptor path
    pub fn new(type_path: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError {
            type_path: type_path.into(),
            message: message.into(),
        }
    }
}

/// Error types for the model registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A type would be both an entity and an event
    #[error("illegal model for type '{type_name}': cannot be both {existing} and {incoming}")]
    IllegalModel {
        /// Name of the offending type
        type_name: String,
        /// Classification already registered (or first marker seen)
        existing: Classification,
        /// Classification that conflicts with it
        incoming: Classification,
    },

    /// Two unrelated type descriptors claim the same name within one domain
    #[error("ambiguous type '{type_name}': '{existing}' and '{incoming}' are unrelated")]
    AmbiguousType {
        /// Contested type name
        type_name: String,
        /// Descriptor path of the registered type
        existing: String,
        /// Descriptor path of the incoming type
        incoming: String,
    },

    /// The model builder failed
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A waiter gave up on a pending build
    #[error("timed out after {waited_ms}ms waiting for model of '{type_path}'")]
    ResolutionTimeout {
        /// Descriptor path of the pending key
        type_path: String,
        /// Total time spent waiting
        waited_ms: u64,
    },

    /// The worker pool refused the build (queue full or shut down)
    #[error("no worker available to build model for '{type_path}'")]
    WorkerUnavailable {
        /// Descriptor path of the rejected key
        type_path: String,
    },

    /// A direct `put` replaced an in-flight build
    #[error("pending build for '{type_path}' was superseded by an explicit put")]
    Superseded {
        /// Descriptor path of the overwritten key
        type_path: String,
    },

    /// Version string could not be parsed
    #[error("invalid version: {0}")]
    InvalidVersion(#[from] VersionParseError),

    /// Domain identity is invalid
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// Configuration could not be read, parsed or validated
    #[error("configuration error: {0}")]
    Config(String),
}

impl ModelError {
    /// True for merge conflicts (illegal classification or ambiguous name)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ModelError::IllegalModel { .. } | ModelError::AmbiguousType { .. }
        )
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        ModelError::Config(message.into())
    }
}
