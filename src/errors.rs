use crate::ledger::PickStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Domain-specific error types for the pick ledger.
/// Rejected operations never leave a partial mutation behind:
/// - Validation and transition errors are reported before any write
/// - Storage errors abort the surrounding transaction
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: PickStatus, to: PickStatus },

    /// The operation needs the pick in a different lifecycle state.
    #[error("cannot {action} a {status} pick: only {required} picks allow it")]
    WrongState {
        action: &'static str,
        required: &'static str,
        status: PickStatus,
    },

    #[error("pick not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl LedgerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTransition { .. } | Self::WrongState { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Config(_) | Self::ChannelClosed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::WrongState { .. } => "wrong_state",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database_error",
            Self::Config(_) => "config_error",
            Self::ChannelClosed(_) => "internal_error",
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Database(e.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            LedgerError::Validation("odds".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::NotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        let err = LedgerError::InvalidTransition {
            from: PickStatus::Won,
            to: PickStatus::Lost,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "invalid transition: WON -> LOST");
    }

    #[test]
    fn test_wrong_state_names_actual_status() {
        let err = LedgerError::WrongState {
            action: "reverse",
            required: "settled",
            status: PickStatus::Pending,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "cannot reverse a PENDING pick: only settled picks allow it"
        );
    }

    #[test]
    fn test_rusqlite_error_is_database() {
        let err: LedgerError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, LedgerError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
