use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Geocoding error: {0}")]
    Geocode(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Client-side timeouts become `Timeout` so callers can tell them apart from
/// failed responses.
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Http(e)
        }
    }
}

/// Coarse classification callers map onto transport-level outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input; the caller's fault.
    Validation,
    /// A store, geocoder or completion backend failed.
    Upstream,
    /// A backend answered with output that could not be understood.
    Parse,
    /// The request deadline expired.
    Timeout,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Parse(_) | Error::Serialization(_) => ErrorKind::Parse,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Storage(_)
            | Error::Geocode(_)
            | Error::Completion(_)
            | Error::Io(_)
            | Error::Http(_)
            | Error::External(_) => ErrorKind::Upstream,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
