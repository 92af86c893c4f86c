//! Error types for phabstack.
//!
//! Uses thiserror for derive macros. Every variant maps to an exit code so the
//! command layer can abort with a precise status.

use crate::exit_codes;
use thiserror::Error;

/// Structural problems found while walking a stack linked list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    #[error("Multiple heads found.")]
    MultipleHeads,

    #[error("Failed to find head.")]
    NoHead,

    #[error("Dependency loop")]
    DependencyLoop,

    /// A revision is claimed as parent by more than one child.
    #[error("Revision {0} has multiple children.")]
    MultipleChildren(String),
}

/// Main error type for phabstack operations.
#[derive(Error, Debug)]
pub enum PhabError {
    /// Invalid arguments, missing configuration, or a local state we refuse to work with.
    #[error("{0}")]
    UserError(String),

    /// Malformed hunk header or raw status record.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Stack is not a single linear chain.
    #[error("{0}")]
    StructuralError(#[from] StackError),

    /// Reconciliation produced a remote shape different from the local one.
    #[error("Internal error, stack reconciliation is inconsistent: {0}")]
    InvariantViolation(String),

    /// A git invocation failed.
    #[error("VCS operation failed: {0}")]
    VcsError(String),

    /// First failure raised by the upload pool.
    #[error("File upload failed: {0}")]
    UploadError(String),

    /// Structured error returned by the review system.
    #[error("Phabricator Error: {info} ({code})")]
    ApiError { code: String, info: String },

    /// HTTP or response decoding failure.
    #[error("Request to Phabricator failed: {0}")]
    TransportError(String),

    /// The user interrupted the command.
    #[error("Interrupted")]
    Interrupted,
}

impl PhabError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PhabError::UserError(_) => exit_codes::USER_ERROR,
            PhabError::ParseError(_) => exit_codes::STRUCTURE_FAILURE,
            PhabError::StructuralError(_) => exit_codes::STRUCTURE_FAILURE,
            PhabError::InvariantViolation(_) => exit_codes::INTERNAL_ERROR,
            PhabError::VcsError(_) => exit_codes::VCS_FAILURE,
            PhabError::UploadError(_) => exit_codes::REMOTE_FAILURE,
            PhabError::ApiError { .. } => exit_codes::REMOTE_FAILURE,
            PhabError::TransportError(_) => exit_codes::REMOTE_FAILURE,
            PhabError::Interrupted => exit_codes::INTERRUPTED,
        }
    }
}

/// Result type alias for phabstack operations.
pub type Result<T> = std::result::Result<T, PhabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = PhabError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn structural_error_converts_from_stack_error() {
        let err: PhabError = StackError::DependencyLoop.into();
        assert!(matches!(
            err,
            PhabError::StructuralError(StackError::DependencyLoop)
        ));
        assert_eq!(err.exit_code(), exit_codes::STRUCTURE_FAILURE);
        assert_eq!(err.to_string(), "Dependency loop");
    }

    #[test]
    fn remote_failures_share_exit_code() {
        let api = PhabError::ApiError {
            code: "ERR-CONDUIT-CORE".to_string(),
            info: "bad token".to_string(),
        };
        let upload = PhabError::UploadError("boom".to_string());
        assert_eq!(api.exit_code(), exit_codes::REMOTE_FAILURE);
        assert_eq!(upload.exit_code(), exit_codes::REMOTE_FAILURE);
    }

    #[test]
    fn interrupt_and_invariant_have_distinct_codes() {
        assert_eq!(PhabError::Interrupted.exit_code(), exit_codes::INTERRUPTED);
        assert_eq!(
            PhabError::InvariantViolation("A:B != B:A".to_string()).exit_code(),
            exit_codes::INTERNAL_ERROR
        );
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = PhabError::ApiError {
            code: "ERR-CONDUIT-CORE".to_string(),
            info: "Invalid token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Phabricator Error: Invalid token (ERR-CONDUIT-CORE)"
        );

        let err: PhabError = StackError::MultipleChildren("D12".to_string()).into();
        assert_eq!(err.to_string(), "Revision D12 has multiple children.");
    }
}
