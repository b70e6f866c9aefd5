// Backend client abstraction: search, page fetch, and reachability probe

pub mod mock;
pub mod searxng;

pub use mock::MockBackend;
pub use searxng::SearxngClient;

use crate::types::{FetchedPage, ResultSet, SearchParams};
use async_trait::async_trait;

/// Why a backend could not be reached at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableKind {
    Connect,
    Timeout,
    Other,
}

impl std::fmt::Display for UnavailableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connection failed"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Other => write!(f, "network error"),
        }
    }
}

/// Failures raised by a [`SearchBackend`].
///
/// Messages are safe to show to clients: the underlying transport error is
/// logged where it happens and never carried in the variant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// Timeout or connection failure before any response arrived.
    #[error("backend unavailable ({kind})")]
    Unavailable { kind: UnavailableKind },

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}")]
    Status { status: u16, body: String },

    /// The backend answered 2xx but the body could not be understood.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// A fetched page had a content type the extractor cannot handle.
    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Classify a reqwest failure without leaking its text.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::InvalidUrl(
                err.url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "unparsable URL".to_string()),
            );
        }
        if err.is_timeout() {
            return Self::Unavailable {
                kind: UnavailableKind::Timeout,
            };
        }
        if err.is_connect() {
            return Self::Unavailable {
                kind: UnavailableKind::Connect,
            };
        }
        if err.is_decode() {
            return Self::InvalidResponse("body could not be decoded".to_string());
        }
        Self::Unavailable {
            kind: UnavailableKind::Other,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Contract between the tool layer and the outside world.
///
/// Implementations are shared across every session and transport, so they
/// must tolerate unbounded concurrent callers.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a search and normalize the response.
    async fn search(&self, params: &SearchParams) -> BackendResult<ResultSet>;

    /// Fetch an arbitrary page.
    async fn fetch(&self, url: &str) -> BackendResult<FetchedPage>;

    /// Cheap reachability check used by the health endpoint only.
    async fn probe(&self) -> bool;

    /// Human-readable location of the backend, for status reporting.
    fn endpoint(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_do_not_leak_body() {
        let err = BackendError::Status {
            status: 502,
            body: "<html>secret stack trace</html>".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned HTTP 502");

        let err = BackendError::Unavailable {
            kind: UnavailableKind::Connect,
        };
        assert_eq!(err.to_string(), "backend unavailable (connection failed)");
        assert!(err.is_unavailable());
    }
}
