use thiserror::Error;

/// Core error type shared across bulkload crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The key set or schema handed to an operation is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The data store rejected a statement or could not be reached.
    #[error("store error: {0}")]
    Store(String),
    /// A record value could not be converted by its field encoder.
    #[error("encoding error on field `{field}`: {message}")]
    Encoding { field: String, message: String },
    /// A record's pre-persist hook failed.
    #[error("pre-persist hook failed: {0}")]
    PrePersist(String),
}

/// Broad failure classes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Store,
    Encoding,
}

impl Error {
    /// Classify the error. Hook failures count as encoding failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Store(_) => ErrorKind::Store,
            Error::Encoding { .. } | Error::PrePersist(_) => ErrorKind::Encoding,
        }
    }

    pub fn encoding(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Encoding {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by bulkload crates.
pub type Result<T> = std::result::Result<T, Error>;
