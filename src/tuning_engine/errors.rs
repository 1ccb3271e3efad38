//! Tuning-specific error types.

use thiserror::Error;

/// Errors raised when a scale definition is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The scale has no steps.
    #[error("scale definition is empty")]
    Empty,

    /// A step has a negative or non-finite cents value.
    #[error("invalid cents value {cents} at step {index}")]
    InvalidCents {
        /// Position of the offending step in the submitted list.
        index: usize,
        /// The rejected value.
        cents: f64,
    },

    /// The period (largest cents value) is not positive.
    #[error("scale period must be positive, got {0} cents")]
    NonPositivePeriod(f64),
}

/// What went wrong on a single line of a tuning file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineErrorKind {
    EmptyLine,
    NoteCount,
    Cents,
    Numerator,
    Denominator,
    Integer,
}

impl std::fmt::Display for LineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::EmptyLine => "empty pitch line",
            Self::NoteCount => "invalid note count",
            Self::Cents => "invalid cents value",
            Self::Numerator => "invalid ratio numerator",
            Self::Denominator => "invalid ratio denominator",
            Self::Integer => "invalid integer ratio",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while reading a tuning file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to open or read the file.
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    /// The file ended before the description line.
    #[error("tuning file has no description line")]
    MissingDescription,

    /// The file ended before the note count line.
    #[error("tuning file has no note count")]
    MissingNoteCount,

    /// A line could not be parsed.
    #[error("line {line}: {kind}")]
    Line {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        kind: LineErrorKind,
    },

    /// The number of pitch lines disagrees with the declared count.
    #[error("tuning file declares {declared} notes but contains {found}")]
    NoteCountMismatch {
        /// Count from the header.
        declared: usize,
        /// Pitch lines actually present.
        found: usize,
    },

    /// The parsed pitches do not form a valid scale.
    #[error("tuning file describes an invalid scale: {0}")]
    Invalid(#[from] ValidationError),
}

/// Errors that can occur while restoring persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The document is not valid JSON for the persisted layout.
    #[error("malformed persisted state: {0}")]
    Json(#[from] serde_json::Error),

    /// The persisted scale is not a valid scale.
    #[error("persisted scale is invalid: {0}")]
    Invalid(#[from] ValidationError),
}

/// Errors returned by the control-side handle of a running processor.
#[derive(Debug, Error)]
pub enum HandleError {
    /// The control ring buffer is full; the message was not sent.
    #[error("control queue is full")]
    QueueFull,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
