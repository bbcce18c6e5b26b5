//! Uniform outcome of every public operation.
//!
//! Operations never return transport errors or panic across their public
//! boundary. Every outcome is either a [`Success`] carrying data or a
//! [`Failure`] carrying the most specific error text available.

use thiserror::Error;

/// Outcome of a public operation.
pub type OpResult<T> = Result<Success<T>, Failure>;

/// A completed operation and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Success<T> {
    /// Human-readable summary.
    pub message: String,
    /// Operation payload.
    pub data: T,
}

impl<T> Success<T> {
    /// Create a success outcome.
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }

    /// Transform the payload, keeping the message.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Success<U> {
        Success {
            message: self.message,
            data: f(self.data),
        }
    }
}

/// Coarse classification of a failure.
///
/// Messages remain the primary surface; the kind lets callers branch
/// without matching on text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, DNS, TLS or timeout failure before any response arrived.
    Transport,
    /// Invalid or missing token (401).
    Unauthorized,
    /// Forbidden or rate limited (403, 429).
    Forbidden,
    /// The resource does not exist (404).
    NotFound,
    /// The write was conditioned on a stale or missing concurrency token (409, 422).
    Conflict,
    /// Any other non-2xx status.
    Http(u16),
    /// A 2xx response whose body lacked the expected fields.
    InvalidResponse,
    /// Remote content could not be decoded to text.
    Decode,
    /// The batch was cancelled between steps.
    Cancelled,
}

impl FailureKind {
    /// Classify a non-2xx HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 | 429 => Self::Forbidden,
            404 => Self::NotFound,
            409 | 422 => Self::Conflict,
            other => Self::Http(other),
        }
    }
}

/// A failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}: {error}")]
pub struct Failure {
    /// Human-readable summary of what was attempted.
    pub message: String,
    /// Most specific error text: the remote's error message when present,
    /// else the transport error text.
    pub error: String,
    /// Classification.
    pub kind: FailureKind,
}

impl Failure {
    /// Create a failure outcome.
    pub fn new(kind: FailureKind, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: error.into(),
            kind,
        }
    }

    /// Replace the summary message, keeping error text and kind.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// True for a stale-token rejection on write.
    pub fn is_conflict(&self) -> bool {
        self.kind == FailureKind::Conflict
    }

    /// True when the target did not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::NotFound
    }
}
