use std::fmt;

/// Errors that can occur while seeding a tape or interpreting Screwtape code.
#[derive(Debug, thiserror::Error)]
pub enum ScrewtapeError {
    /// A tape was seeded from an empty sequence of values.
    #[error("Invalid argument: tape data must contain at least one cell")]
    EmptyTape,

    /// Loops were not balanced; a matching `[` or `]` was not found.
    #[error("Invalid argument: unmatched bracket {kind} at instruction {ip}")]
    UnmatchedBrackets { ip: usize, kind: UnmatchedBracketKind },

    /// Writing the debug trace failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io { ip: usize, #[source] source: std::io::Error },

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    /// Execution aborted due to cooperative cancellation (e.g., timeout)
    #[error("Execution aborted: cancelled")]
    Canceled,
}

/// Coarse classification of a [`ScrewtapeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input was rejected before any tape mutation or output.
    InvalidArgument,
    /// A bounded run stopped early; the tape reflects the steps already taken.
    Aborted,
    Io,
}

impl ScrewtapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrewtapeError::EmptyTape | ScrewtapeError::UnmatchedBrackets { .. } => {
                ErrorKind::InvalidArgument
            }
            ScrewtapeError::StepLimitExceeded { .. } | ScrewtapeError::Canceled => ErrorKind::Aborted,
            ScrewtapeError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedBracketKind {
    Open,
    Close,
}

impl fmt::Display for UnmatchedBracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedBracketKind::Open => write!(f, "'['"),
            UnmatchedBracketKind::Close => write!(f, "']'"),
        }
    }
}
