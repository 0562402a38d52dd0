use crate::pipeline::Phase;
use std::time::Duration;
use thiserror::Error;

/// Error type returned by middleware hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure raised by an [`HttpTransport`](crate::HttpTransport) before a response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("http error: {0}")]
    Http(#[from] hyper::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("too many redirects (limit {0})")]
    TooManyRedirects(usize),
    #[error("invalid redirect location {0}")]
    InvalidRedirect(String),
    #[error("{0}")]
    Other(String),
}

impl From<hyper::http::Error> for TransportError {
    fn from(e: hyper::http::Error) -> Self {
        TransportError::InvalidRequest(e.to_string())
    }
}

impl From<hyper::header::InvalidHeaderName> for TransportError {
    fn from(e: hyper::header::InvalidHeaderName) -> Self {
        TransportError::InvalidRequest(e.to_string())
    }
}

impl From<hyper::header::InvalidHeaderValue> for TransportError {
    fn from(e: hyper::header::InvalidHeaderValue) -> Self {
        TransportError::InvalidRequest(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The transport failed; displayed exactly as the underlying failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("middleware `{name}` failed during the {phase} phase: {source}")]
    Middleware {
        name: String,
        phase: Phase,
        #[source]
        source: BoxError,
    },
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn middleware(name: &str, phase: Phase, source: BoxError) -> Self {
        Error::Middleware {
            name: name.to_owned(),
            phase,
            source,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Timeout(_)))
    }
}
