use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::redact::sanitize;

/// Exhaustive error taxonomy (§4.9). Each kind carries a fixed `retryable`
/// flag used by the plugin client's retry policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotSupported,
    NoData,
    Transport,
    Timeout,
    Unavailable,
    Protocol,
    Unimplemented,
    Configuration,
    Internal,
}

impl ErrorKind {
    /// Whether C3 should retry a call that failed with this kind.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Transport | ErrorKind::Timeout | ErrorKind::Unavailable
        )
    }
}

/// A typed, matchable error produced anywhere in the core. Converted to an
/// [`ErrorDetail`] (with a stable fingerprint) before it crosses into
/// `Bundle.errors`.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("no data: {0}")]
    NoData(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("not implemented: {0}")]
    Unimplemented(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotSupported(_) => ErrorKind::NotSupported,
            CoreError::NoData(_) => ErrorKind::NoData,
            CoreError::Transport(_) => ErrorKind::Transport,
            CoreError::Timeout(_) => ErrorKind::Timeout,
            CoreError::Unavailable(_) => ErrorKind::Unavailable,
            CoreError::Protocol(_) => ErrorKind::Protocol,
            CoreError::Unimplemented(_) => ErrorKind::Unimplemented,
            CoreError::Configuration(_) => ErrorKind::Configuration,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Build the `Bundle.errors` entry for this error, computing its
    /// deduplication fingerprint from `(kind, source, sanitized message)`.
    pub fn into_detail(self, resource_id: impl Into<String>, source: impl Into<String>) -> ErrorDetail {
        let kind = self.kind();
        let source = source.into();
        let message = self.message();
        let sanitized = sanitize(&message);
        let fingerprint = fingerprint(kind, &source, &sanitized);
        ErrorDetail {
            kind,
            resource_id: resource_id.into(),
            source,
            message: sanitized,
            retryable: kind.is_retryable(),
            fingerprint,
        }
    }
}

/// A single entry in `Bundle.errors`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub resource_id: String,
    pub source: String,
    pub message: String,
    pub retryable: bool,
    pub fingerprint: String,
}

/// `hash(kind || source || sanitized_message)`, stable across runs, used to
/// deduplicate `Bundle.errors` at read time.
pub fn fingerprint(kind: ErrorKind, source: &str, sanitized_message: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(format!("{kind:?}").as_bytes());
    hasher.update(b"\0");
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(sanitized_message.as_bytes());
    hasher.finalize().to_hex().to_string()
}
