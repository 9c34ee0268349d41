//! Error types for the list engine.

use thiserror::Error;

/// Errors surfaced by the list engine.
///
/// Collaborator failures (the data source, record decorators) are wrapped
/// with the originating error attached as the source so callers can log
/// the full chain. Suppressed concurrent loads and exhausted pagination
/// are not errors; they are [`crate::pagination::LoadOutcome`] variants.
#[derive(Error, Debug)]
pub enum ListError {
    #[error("failed to load page {page}: {source}")]
    Fetch {
        page: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load full dataset: {0}")]
    LegacyFetch(#[source] anyhow::Error),

    #[error("record decoration failed: {0}")]
    Decorate(#[source] anyhow::Error),
}

pub type ListResult<T> = Result<T, ListError>;
