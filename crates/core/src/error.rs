//! Core error type for simulated card operations
//!
//! All error variants are consolidated here so that failures bubble up
//! through the reader and pool layers unchanged.

/// Result type for simulated card operations
pub type Result<T> = core::result::Result<T, Error>;

/// Error type covering every failure the simulation can produce
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required identifier (reader name, group reference, ...) is missing or empty
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An operation requiring a card was invoked on a reader with no inserted card
    #[error("no card available in reader {0}")]
    NoCardAvailable(String),

    /// No table entry or provider response matched the command
    ///
    /// Carries the unmatched command as uppercase hex so missing
    /// simulation data can be diagnosed.
    #[error("no response is available for request: {command}")]
    CardCommunication {
        /// Hex-encoded command that had no match
        command: String,
    },

    /// Pool allocation found no free candidate
    #[error("no reader is available in group reference: {group:?}")]
    NoReaderAvailable {
        /// Group the allocation was scoped to, if any
        group: Option<String>,
    },

    /// A command table key failed to compile as a regular expression
    ///
    /// Patterns are compiled lazily, so this surfaces on the first
    /// matching attempt rather than at registration time.
    #[error("invalid command pattern {pattern:?}")]
    InvalidPattern {
        /// The offending table key
        pattern: String,
        /// Compilation failure
        #[source]
        source: regex::Error,
    },

    /// A table value or provider response was not valid hexadecimal
    #[error("invalid hex response {value:?}")]
    InvalidHex {
        /// The offending hex string
        value: String,
        /// Decode failure
        #[source]
        source: hex::FromHexError,
    },

    /// A blocking wait was cancelled before its condition was met
    #[error("{0} cancelled")]
    Cancelled(&'static str),
}

impl Error {
    /// Create an invalid argument error for the named parameter
    pub const fn invalid_argument(name: &'static str) -> Self {
        Self::InvalidArgument(name)
    }

    /// Create a card communication error for an unmatched command
    pub fn card_communication<S: Into<String>>(command: S) -> Self {
        Self::CardCommunication {
            command: command.into(),
        }
    }

    /// Create a no-reader-available error for an optional group scope
    pub fn no_reader_available(group: Option<&str>) -> Self {
        Self::NoReaderAvailable {
            group: group.map(str::to_string),
        }
    }
}
