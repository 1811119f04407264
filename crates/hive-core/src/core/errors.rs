//! Typed error types for the hive-core service layer.

use thiserror::Error;

/// Result type alias for core service operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the hive-core service layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The user already has a rating on this item (one per user per item).
    #[error("User {user_id} has already rated item {item_id}")]
    AlreadyRated { item_id: String, user_id: String },

    /// The acting user may not perform this operation.
    #[error("User {user_id} is not allowed to {action}")]
    Unauthorized { user_id: String, action: String },

    /// Referenced content does not exist (or no longer exists).
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// A rating outside the accepted range.
    #[error("Rating {rating} is out of range ({min}..={max})")]
    InvalidRating { rating: f64, min: f64, max: f64 },

    /// A report must carry a non-empty reason.
    #[error("Report reason must not be empty")]
    EmptyReportReason,

    /// A reply must carry non-blank text.
    #[error("Reply text must not be empty")]
    EmptyReplyText,

    /// The store aborted the transaction on contention; nothing was
    /// applied and the operation is safe to retry.
    #[error("Transaction aborted on contention; retry the operation")]
    TransactionConflict,

    /// An internal storage or serialization error.
    #[error(transparent)]
    Internal(anyhow::Error),
}

/// Store-level errors convert here on `?`, surfacing lock contention
/// as the retryable [`CoreError::TransactionConflict`] variant.
impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        if crate::store::is_conflict(&err) {
            Self::TransactionConflict
        } else {
            Self::Internal(err)
        }
    }
}

impl CoreError {
    pub(crate) fn unauthorized(user_id: &str, action: &str) -> Self {
        Self::Unauthorized {
            user_id: user_id.to_string(),
            action: action.to_string(),
        }
    }

    pub(crate) fn not_found(path: &str) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }
}
