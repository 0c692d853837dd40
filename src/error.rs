use reqwest::StatusCode;
use thiserror::Error;

use crate::db::{ArticleId, NoteId};

/// Failure to retrieve the source page. Never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("invalid {role} selector {selector:?}: {message}")]
    Selector {
        role: &'static str,
        selector: String,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("article {0} not found")]
    NotFound(ArticleId),

    #[error("note {0} not found")]
    NoteNotFound(NoteId),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a scrape run ended in `Failed`.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("persisting failed: {0}")]
    Store(#[from] StoreError),
}

/// Caller-visible failures of the query surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("article {0} not found")]
    NotFound(ArticleId),

    #[error("note {0} not found")]
    NoteNotFound(NoteId),

    #[error("storage unavailable: {0}")]
    Unavailable(#[source] StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            StoreError::NoteNotFound(id) => ApiError::NoteNotFound(id),
            other => ApiError::Unavailable(other),
        }
    }
}
