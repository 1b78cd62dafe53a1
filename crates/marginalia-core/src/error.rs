//! Error types for the ranges engine.

use thiserror::Error;

/// Broad classification of a [`RangesError`].
///
/// Callers use this to decide how to react: every kind requires the whole
/// update batch to be discarded, but consistency failures additionally point
/// at an upstream sequencing bug and warrant resynchronizing the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A configured ceiling was exceeded.
    Validation,
    /// Ranges and document text disagree.
    Consistency,
    /// The input could not be classified.
    Malformed,
}

/// Errors that can occur while transforming ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangesError {
    #[error("too many comments or tracked changes")]
    TooManyRanges {
        comments: usize,
        changes: usize,
        max_comments: usize,
        max_changes: usize,
    },

    #[error("insertion does not match text in document")]
    InsertionMismatch { change_id: String, position: usize },

    #[error("comment does not match text in document")]
    CommentMismatch { comment_id: String, position: usize },

    #[error("deleted content does not match comment content")]
    DeletedCommentMismatch { comment_id: String },

    #[error("deletion does not match text in document")]
    DeletionMismatch { position: usize },

    #[error("unknown op type")]
    UnknownOpType,

    #[error("comment op is missing a thread id")]
    MissingThreadId,

    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RangesError {
    fn from(err: serde_json::Error) -> Self {
        RangesError::SerializationError(err.to_string())
    }
}

impl RangesError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RangesError::TooManyRanges { .. } => ErrorKind::Validation,
            RangesError::InsertionMismatch { .. }
            | RangesError::CommentMismatch { .. }
            | RangesError::DeletedCommentMismatch { .. }
            | RangesError::DeletionMismatch { .. } => ErrorKind::Consistency,
            RangesError::UnknownOpType
            | RangesError::MissingThreadId
            | RangesError::SerializationError(_) => ErrorKind::Malformed,
        }
    }
}

pub type Result<T> = std::result::Result<T, RangesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_wire_errors() {
        let err = RangesError::TooManyRanges {
            comments: 3,
            changes: 0,
            max_comments: 2,
            max_changes: 2,
        };
        assert_eq!(err.to_string(), "too many comments or tracked changes");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = RangesError::InsertionMismatch {
            change_id: "c1".into(),
            position: 4,
        };
        assert_eq!(err.to_string(), "insertion does not match text in document");
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn test_unknown_op_is_malformed() {
        assert_eq!(RangesError::UnknownOpType.kind(), ErrorKind::Malformed);

        let err: RangesError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(err.to_string().starts_with("serialization error"));
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
