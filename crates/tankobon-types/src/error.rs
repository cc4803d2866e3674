//! Error types for tankobon entities.

use thiserror::Error;

/// Error for chapter numbers that are not plain decimal values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChapterNumberError {
    /// The input was empty after trimming.
    #[error("Chapter number is empty")]
    Empty,

    /// The input contained something other than digits and one decimal separator.
    #[error("Invalid chapter number: {0:?}")]
    Invalid(String),
}
