//! Error types for dmr-transform
//!
//! This module defines the error types used throughout the crate.
//! Discarding and converting are normal control flow and never surface here;
//! a rejection is reported through the rejection policy of a
//! [`TransformedOperation`](crate::transform::TransformedOperation), not as an error.

use thiserror::Error;

use crate::model::ModelType;

/// Errors raised by the dynamic value tree and path addresses
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The value cannot be narrowed to the requested type
    #[error("Cannot convert value of type {from} to {to}")]
    Conversion { from: ModelType, to: ModelType },

    /// A required key is missing from an object value
    #[error("Required key '{0}' is not defined")]
    MissingKey(String),

    /// A path address could not be parsed or built
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A big number literal is not valid
    #[error("Invalid {kind} literal '{literal}'")]
    InvalidNumber { kind: &'static str, literal: String },
}

impl ValueError {
    /// Create a Conversion error
    pub fn conversion(from: ModelType, to: ModelType) -> Self {
        Self::Conversion { from, to }
    }

    /// Create an InvalidAddress error
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }
}

/// Transformation failures
///
/// Every rule, checker and transformer propagates these to its immediate
/// caller unmodified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Generic operation failure
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// A custom transformer tried to mutate a protected resource
    #[error("Cannot {operation} on immutable resource at '{address}'")]
    ImmutableResource { address: String, operation: String },

    /// A legacy target that is known not to ignore the resource would receive
    /// attributes it does not understand
    #[error(
        "Attributes {attributes:?} at '{address}' are not understood by host '{host}' \
         (subsystem '{subsystem}' version {version})"
    )]
    AttributesNotUnderstood {
        host: String,
        subsystem: String,
        version: String,
        address: String,
        attributes: Vec<String>,
    },

    /// Malformed operation or model value
    #[error("Value error: {0}")]
    Value(#[from] ValueError),
}

impl TransformError {
    /// Create an OperationFailed error
    pub fn failed(message: impl Into<String>) -> Self {
        Self::OperationFailed(message.into())
    }

    /// Create an ImmutableResource error
    pub fn immutable(address: impl ToString, operation: impl Into<String>) -> Self {
        Self::ImmutableResource {
            address: address.to_string(),
            operation: operation.into(),
        }
    }
}

/// Inconsistent use of the description builders
///
/// Reported when the description is built, never deferred to transform time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuilderError {
    /// The same attribute was renamed twice
    #[error("Attribute '{attribute}' at '{path}' is already renamed to '{existing}'")]
    DuplicateRename {
        path: String,
        attribute: String,
        existing: String,
    },

    /// A child resource was registered twice under the same path
    #[error("Child '{child}' is already registered under '{path}'")]
    DuplicateChild { path: String, child: String },

    /// A field config was supplied for an attribute never declared
    #[error("Attribute '{attribute}' at '{path}' has no declared field '{field}'")]
    UnknownField {
        path: String,
        attribute: String,
        field: String,
    },

    /// An operation override was declared twice
    #[error("Operation '{operation}' at '{path}' already has an override")]
    DuplicateOverride { path: String, operation: String },

    /// A version chain is missing a hop
    #[error("No transformation chain from {from} to {to}")]
    BrokenChain { from: String, to: String },

    /// Anything else reported while building
    #[error("Invalid description: {0}")]
    Invalid(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A declared description cannot be built
    #[error("Invalid transformer declaration: {0}")]
    Build(#[from] BuilderError),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type alias for transformation calls
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type alias for builder calls
pub type BuildResult<T> = Result<T, BuilderError>;
