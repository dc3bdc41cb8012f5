//! Unified error type for capsule operations
//!
//! Every failure in this crate is local and synchronous: it is returned at the
//! point of the call and never retried or recovered internally.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for all capsule, scoring, policy and sealing operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum IqubeError {
    /// A quality signal was outside `[0, 10]` (or not a finite number)
    #[error("Invalid signal range: {signal} = {value} (expected 0..=10)")]
    InvalidSignalRange {
        /// Name of the offending signal
        signal: String,
        /// Value that was supplied
        value: f64,
    },

    /// Sealing was requested under a tier that has no algorithm
    #[error("Unsupported tier: {tier}")]
    UnsupportedTier {
        /// Wire tag of the rejected tier
        tier: String,
    },

    /// A tier tag did not name any known tier
    #[error("Unknown encryption tier: {tag}")]
    UnknownTier {
        /// Tag that failed to parse
        tag: String,
    },

    /// The factory was asked for a capsule variant it does not know
    #[error("Unsupported capsule variant: {tag}")]
    UnsupportedVariant {
        /// Tag that failed to resolve
        tag: String,
    },

    /// Authentication of a sealed payload failed
    #[error("Decryption failed: {message}")]
    Decryption {
        /// What went wrong
        message: String,
    },

    /// Seal on a sealed payload, or unseal on an open one
    #[error("Invalid payload state: expected {expected}, found {actual}")]
    InvalidPayloadState {
        /// State the operation requires
        expected: PayloadState,
        /// State the payload was in
        actual: PayloadState,
    },

    /// A sealed payload or token is structurally broken
    #[error("Malformed sealed payload: {message}")]
    MalformedSealedPayload {
        /// What was malformed
        message: String,
    },

    /// Canonical encoding of payload entries failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

/// Observable state of a payload layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadState {
    /// Plaintext entries or blob present
    Open,
    /// Ciphertext and key material present
    Sealed,
}

impl fmt::Display for PayloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadState::Open => write!(f, "open"),
            PayloadState::Sealed => write!(f, "sealed"),
        }
    }
}

impl IqubeError {
    /// Create a signal range error
    pub fn invalid_signal(signal: impl Into<String>, value: f64) -> Self {
        Self::InvalidSignalRange {
            signal: signal.into(),
            value,
        }
    }

    /// Create an unsupported tier error
    pub fn unsupported_tier(tier: impl Into<String>) -> Self {
        Self::UnsupportedTier { tier: tier.into() }
    }

    /// Create an unknown tier tag error
    pub fn unknown_tier(tag: impl Into<String>) -> Self {
        Self::UnknownTier { tag: tag.into() }
    }

    /// Create an unsupported variant error
    pub fn unsupported_variant(tag: impl Into<String>) -> Self {
        Self::UnsupportedVariant { tag: tag.into() }
    }

    /// Create a decryption error
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
        }
    }

    /// Create a payload state error
    pub fn payload_state(expected: PayloadState, actual: PayloadState) -> Self {
        Self::InvalidPayloadState { expected, actual }
    }

    /// Create a malformed payload error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSealedPayload {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error is the caller's fault rather than a data problem
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignalRange { .. }
                | Self::UnknownTier { .. }
                | Self::UnsupportedVariant { .. }
                | Self::InvalidPayloadState { .. }
                | Self::Config { .. }
        )
    }
}

/// Standard Result type for capsule operations
pub type Result<T> = std::result::Result<T, IqubeError>;

/// A failed consuming transition that hands its input back untouched
///
/// `OpenPayload::seal` and `SealedPayload::unseal` take `self`; when they fail
/// the original value comes back inside this wrapper so nothing is lost.
#[derive(Debug)]
pub struct Rejected<T> {
    error: IqubeError,
    value: T,
}

impl<T> Rejected<T> {
    pub(crate) fn new(error: IqubeError, value: T) -> Self {
        Self { error, value }
    }

    /// The error that caused the rejection
    pub fn error(&self) -> &IqubeError {
        &self.error
    }

    /// Recover the untouched input
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Split into the error and the untouched input
    pub fn into_parts(self) -> (IqubeError, T) {
        (self.error, self.value)
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<T: fmt::Debug> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<Rejected<T>> for IqubeError {
    fn from(rejected: Rejected<T>) -> Self {
        rejected.error
    }
}
