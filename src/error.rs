//! Error types for reading sessions.

use thiserror::Error;

use crate::engine::EngineError;

/// Errors surfaced by [`ReadingSession`](crate::session::ReadingSession) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The input could not be read into a byte buffer.
    #[error("failed to read book file: {0}")]
    FileRead(#[from] std::io::Error),

    /// The engine could not open or prepare the book.
    #[error("failed to load book: {0}")]
    BookLoad(#[from] EngineError),

    /// Rejected page-number input; recovered by resetting the page field.
    #[error(transparent)]
    NavigationInput(#[from] NavigationInputError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationInputError {
    #[error("'{0}' is not a page number")]
    NotANumber(String),

    #[error("page {page} is outside 1..={total}")]
    OutOfRange { page: i64, total: usize },

    #[error("page numbers are not available until the location index is ready")]
    IndexNotReady,

    #[error("no position recorded for page {0}")]
    Unresolved(usize),
}

/// A convenience `Result` alias using [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;
