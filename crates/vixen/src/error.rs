//! Error and Result types for Vixen store operations.

use thiserror::Error;

/// A convenience `Result` type for Vixen operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The error type for ordered map, time series, and store boundary operations.
///
/// Every error surfaces to the immediate caller; none are retried internally
/// and none are fatal to the host process.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key holds a value of a different type.
    #[error("operation against a key holding the wrong kind of value")]
    WrongType,

    /// A repeating-argument mutation was called with an invalid tuple count.
    #[error("wrong number of arguments for {command}")]
    Arity {
        /// Name of the offending command.
        command: String,
    },

    /// An option token was not recognized.
    #[error("syntax error near {token:?}")]
    Syntax {
        /// The unrecognized token.
        token: String,
    },

    /// A score or time argument could not be parsed as a double.
    #[error("{input:?} is not a valid double")]
    InvalidNumber {
        /// The rejected argument.
        input: String,
    },

    /// Head or tail was requested on a zero-length instance.
    #[error("empty collection")]
    EmptyCollection,

    /// A removal or rank lookup targeted an absent exact match.
    #[error("no element matching the requested score and member")]
    NotFound,

    /// The requested traversal mode is not implemented.
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// Description of the rejected operation.
        operation: String,
    },
}
