//! Error handling for the radiocore library
//!
//! Only setup-time problems are surfaced as errors: invalid demodulator or
//! decoder configuration fails fast with a descriptive message. Decode-path
//! conditions (sync loss, uncorrectable blocks, malformed groups) are never
//! errors; they are absorbed into counters and `tracing` diagnostics so
//! real-time processing is never interrupted.

use std::fmt;

/// A specialized Result type for radiocore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for radiocore operations
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration detected at setup (AGC, squelch, rates, ...)
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}
