//! Error types for cfgmgr operations.
//!
//! This module defines the error types used throughout the cfgmgr crates.
//! All errors implement `std::error::Error` via `thiserror`.
//!
//! The variants fall into four groups:
//!
//! - schema errors: a field name outside the option schema was written
//! - configuration errors: the declared configuration was rejected
//! - driver errors: the network stack refused a mutation
//! - store errors: the configuration snapshot could not be read

use std::io;
use thiserror::Error;

/// Result type alias for cfgmgr operations.
pub type CfgMgrResult<T> = Result<T, CfgMgrError>;

/// Errors that can occur during cfgmgr operations.
#[derive(Debug, Error)]
pub enum CfgMgrError {
    /// A field outside the declared option schema was written, or a value
    /// of the wrong kind was stored in a declared field.
    #[error("Option \"{field}\" {message}")]
    Schema {
        /// The offending field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// The link driver rejected a mutation.
    #[error("Driver operation failed: {operation}: {message}")]
    Driver {
        /// The operation that failed (e.g., "create", "set mtu").
        operation: String,
        /// Error message.
        message: String,
    },

    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// The configuration snapshot could not be loaded.
    #[error("Config store error: {source_name}: {message}")]
    ConfigStore {
        /// Which snapshot (or file) failed.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl CfgMgrError {
    /// Creates a schema error.
    pub fn schema(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a driver error.
    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a config store error.
    pub fn config_store(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigStore {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the error was raised by the network stack rather
    /// than by configuration checks.
    pub fn is_driver_error(&self) -> bool {
        matches!(
            self,
            CfgMgrError::Driver { .. }
                | CfgMgrError::ShellExec { .. }
                | CfgMgrError::ShellCommandFailed { .. }
        )
    }

    /// Returns true if the error is a user-facing configuration rejection.
    pub fn is_config_error(&self) -> bool {
        matches!(self, CfgMgrError::InvalidConfig { .. })
    }
}
