//! Error types for the rule execution engine.
//!
//! Validation failures are data and live in [`ValidationResult`](crate::ValidationResult).
//! The variants here cover everything else: bad setup, mode mismatches,
//! cancellation and faults raised by validator implementations.

use thiserror::Error;

/// Boxed error raised by a validator implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule or validator was configured with an invalid argument.
    #[error("Invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },

    /// A binding that requires asynchronous execution was reached by a synchronous run.
    #[error("Validator `{validator}` on property `{property}` requires asynchronous execution; call validate_async instead")]
    AsyncInSyncRun { property: String, validator: String },

    /// The synchronous entry point of an async-only validator was invoked.
    #[error("Validator `{validator}` does not support synchronous execution")]
    SyncNotSupported { validator: String },

    /// Engine settings could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The asynchronous run was cancelled by its cancellation token.
    #[error("Validation was cancelled")]
    Cancelled,

    /// A validator implementation failed while evaluating a value.
    #[error("Validator fault on property `{property}`: {source}")]
    Fault {
        property: String,
        #[source]
        source: BoxError,
    },
}

impl EngineError {
    pub fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }

    pub fn fault(property: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Fault {
            property: property.into(),
            source: source.into(),
        }
    }

    pub(crate) fn async_in_sync(property: &str, validator: &str) -> Self {
        Self::AsyncInSyncRun {
            property: property.to_string(),
            validator: validator.to_string(),
        }
    }

    /// True for the cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
