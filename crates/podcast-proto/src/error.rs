use thiserror::Error;

/// Failures while fetching or looking up catalog data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("show not found: {0}")]
    NotFound(String),
    /// Lookup missed while the catalog is still loading (or failed to).
    #[error("catalog not loaded")]
    NotLoaded,
    #[error("catalog load cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
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

/// Favorites snapshot could not be read or written.
///
/// Never surfaced past the store: reads fall back to an empty set and
/// writes are logged.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("favorites io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt favorites snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}
