//! Error types for store and engine operations
//!
//! Errors are classified by how the frontend should react:
//! - Retryable: transient I/O (simulated latency failures, busy database)
//! - NonRetryable: missing records, rejected field values, storage faults
//!
//! Engines and stores surface `CrmError` unchanged. Only the command layer
//! turns an error into an `ErrorNotice` for display.

use thiserror::Error;

use crate::entity::EntityKind;

/// Error types for store and engine operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrmError {
    #[error("{} with ID {id} not found", kind.label())]
    NotFound { kind: EntityKind, id: u64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    // Retryable
    #[error("Transient I/O failure: {0}")]
    TransientIo(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CrmError {
    pub fn not_found(kind: EntityKind, id: u64) -> Self {
        CrmError::NotFound { kind, id }
    }

    /// Returns true if repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CrmError::TransientIo(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrmError::NotFound { .. })
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CrmError::NotFound { .. } => "The record may have been removed. Refresh the view.",
            CrmError::Validation(_) => "Check the submitted values and try again.",
            CrmError::TransientIo(_) => "The service did not respond. Try again.",
            CrmError::Storage(_) => "Check that the database file is writable.",
        }
    }
}

impl From<crate::db::DbError> for CrmError {
    fn from(err: crate::db::DbError) -> Self {
        // A busy or locked database clears up on its own; everything else sticks.
        if let crate::db::DbError::Sqlite(rusqlite::Error::SqliteFailure(code, _)) = &err {
            if matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return CrmError::TransientIo(err.to_string());
            }
        }
        CrmError::Storage(err.to_string())
    }
}

/// Serializable error representation for the frontend
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    NotFound,
    Validation,
    Transient,
    Storage,
}

impl From<&CrmError> for ErrorType {
    fn from(err: &CrmError) -> Self {
        match err {
            CrmError::NotFound { .. } => ErrorType::NotFound,
            CrmError::Validation(_) => ErrorType::Validation,
            CrmError::TransientIo(_) => ErrorType::Transient,
            CrmError::Storage(_) => ErrorType::Storage,
        }
    }
}

impl ErrorNotice {
    /// Notice for a failed read. The view offers a retry button that simply
    /// re-runs the same read, except for rejected input, which would only
    /// fail again.
    pub fn for_read(err: &CrmError) -> Self {
        Self::build(err, !matches!(err, CrmError::Validation(_)))
    }

    /// Notice for a failed mutation. Mutations are never retried from the
    /// notice; the user re-issues the gesture.
    pub fn for_mutation(err: &CrmError) -> Self {
        Self::build(err, false)
    }

    fn build(err: &CrmError, can_retry: bool) -> Self {
        ErrorNotice {
            message: err.to_string(),
            error_type: ErrorType::from(err),
            can_retry,
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity() {
        let err = CrmError::not_found(EntityKind::Deal, 42);
        assert_eq!(err.to_string(), "Deal with ID 42 not found");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(CrmError::TransientIo("timeout".into()).is_retryable());
        assert!(!CrmError::Validation("bad".into()).is_retryable());
        assert!(!CrmError::Storage("disk".into()).is_retryable());
    }

    #[test]
    fn test_read_notice_allows_retry_mutation_notice_does_not() {
        let err = CrmError::TransientIo("simulated".into());
        let read = ErrorNotice::for_read(&err);
        let write = ErrorNotice::for_mutation(&err);
        assert!(read.can_retry);
        assert!(!write.can_retry);
        assert_eq!(read.error_type, ErrorType::Transient);
    }

    #[test]
    fn test_rejected_read_input_is_not_retryable() {
        let notice = ErrorNotice::for_read(&CrmError::Validation("bad filter".into()));
        assert!(!notice.can_retry);
        assert_eq!(notice.error_type, ErrorType::Validation);
    }

    #[test]
    fn test_notice_serializes_camel_case() {
        let notice = ErrorNotice::for_read(&CrmError::not_found(EntityKind::Contact, 7));
        let json = serde_json::to_value(&notice).expect("serialize");
        assert_eq!(json["errorType"], "notFound");
        assert_eq!(json["canRetry"], true);
        assert_eq!(json["message"], "Contact with ID 7 not found");
    }
}
