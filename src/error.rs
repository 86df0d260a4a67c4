use thiserror::Error;

/// Coarse classification used by callers deciding what to do with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote unreachable, non-2xx, or unreadable body. Always recovered locally on read paths.
    Transport,
    /// Caller supplied something unusable (empty playlist name, unknown track).
    Validation,
    /// Durable storage could not be read or written.
    Persistence,
    NotFound,
    /// The bundled dataset could not be loaded.
    Dataset,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP error! Status: {0}")]
    Http(u16),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("login rejected: {0}")]
    LoginRejected(String),

    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Persistence(String),

    #[error("local dataset unavailable: {0}")]
    Dataset(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Network(_)
            | CatalogError::Http(_)
            | CatalogError::Decode(_)
            | CatalogError::NotAuthenticated
            | CatalogError::LoginRejected(_) => ErrorKind::Transport,
            CatalogError::Validation(_) => ErrorKind::Validation,
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::Persistence(_) => ErrorKind::Persistence,
            CatalogError::Dataset(_) => ErrorKind::Dataset,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CatalogError::Validation(msg.into())
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            CatalogError::Http(status.as_u16())
        } else if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}
