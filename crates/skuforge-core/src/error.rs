//! Common error types used throughout skuforge.
//!
//! This module provides a unified error type covering the failure cases the
//! engine distinguishes: invalid input data, a misconfigured environment,
//! external collaborator failures (asset store, embedding provider,
//! warehouse), and pipeline contract violations.
//!
//! Per-record domain failures travel the pipeline's failure branch as data
//! and never appear as an [`Error`]; this type is for errors that a caller
//! must handle or that abort a run.

/// Common error type for skuforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input data failed validation.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The process environment is missing something required (credentials,
    /// env vars, directories).
    #[error("Environment error: {0}")]
    Environment(String),

    /// The object store rejected or failed an operation.
    #[error("Asset store error: {0}")]
    Asset(String),

    /// The embedding/generation provider returned an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The warehouse rejected or failed an operation.
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// A pipeline stage was driven outside its contract. These indicate a
    /// programming error (for example stage-order violations) and abort the
    /// run instead of joining the failure branch.
    #[error("Contract violation in stage '{stage}': {message}")]
    Contract { stage: String, message: String },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new Environment error.
    pub fn environment<S: Into<String>>(msg: S) -> Self {
        Self::Environment(msg.into())
    }

    /// Create a new Asset error.
    pub fn asset<S: Into<String>>(msg: S) -> Self {
        Self::Asset(msg.into())
    }

    /// Create a new Provider error.
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new Warehouse error.
    pub fn warehouse<S: Into<String>>(msg: S) -> Self {
        Self::Warehouse(msg.into())
    }

    /// Create a new Contract error for the named stage.
    pub fn contract<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self::Contract {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
