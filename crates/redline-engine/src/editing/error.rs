use thiserror::Error;

/// Why a step could not be applied to a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("range {start}..{end} is out of bounds for a document of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("range {start}..{end} ends before it starts")]
    InvertedRange { start: usize, end: usize },

    #[error("offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}
