use sqlx::Error as SqlxError;
use thiserror::Error;
use uuid::Uuid;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Requested slots are already held by an admitted booking
    #[error("Slots already booked: {}", .conflicting.join(", "))]
    SlotConflict { conflicting: Vec<String> },

    /// Payment slip did not match the booking
    #[error("Payment verification failed: {details}")]
    PaymentVerificationFailed { details: String },

    /// Booking or payout is not in the state the action requires
    #[error("Cannot {action} while status is {from}")]
    InvalidTransition { from: String, action: String },

    /// Persistent store failure, with the operation that hit it
    #[error("Store error during {context}: {source}")]
    UpstreamStore {
        context: String,
        #[source]
        source: RepositoryError,
    },

    /// Blob storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    /// The monthly sweep did not commit
    #[error("Settlement for {period} failed for {} venue(s): {reason}", .failed_venues.len())]
    SettlementPartialFailure {
        period: chrono::NaiveDate,
        failed_venues: Vec<Uuid>,
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wrap a repository error with the operation and entity it concerned
    pub fn store(context: impl Into<String>) -> impl FnOnce(RepositoryError) -> AppError {
        let context = context.into();
        move |source| match source {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::SlotTaken(conflicting) => AppError::SlotConflict { conflicting },
            source => AppError::UpstreamStore { context, source },
        }
    }

    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Stable machine-readable kind used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::NotFound(_) => "NotFound",
            AppError::SlotConflict { .. } => "SlotConflict",
            AppError::PaymentVerificationFailed { .. } => "PaymentVerificationFailed",
            AppError::InvalidTransition { .. } => "InvalidTransition",
            AppError::SettlementPartialFailure { .. } => "SettlementPartialFailure",
            AppError::UpstreamStore { .. }
            | AppError::Storage(_)
            | AppError::ExternalService(_)
            | AppError::Config(_) => "UpstreamStoreError",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::SlotConflict { .. } | AppError::InvalidTransition { .. } => 409,
            AppError::PaymentVerificationFailed { .. } => 422,
            AppError::ExternalService(_) | AppError::Storage(_) => 502,
            AppError::UpstreamStore { .. }
            | AppError::SettlementPartialFailure { .. }
            | AppError::Config(_) => 500,
        }
    }

    /// Message safe to show to API callers. Upstream failures never expose internal text.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(_)
            | AppError::NotFound(_)
            | AppError::SlotConflict { .. }
            | AppError::PaymentVerificationFailed { .. }
            | AppError::InvalidTransition { .. } => self.to_string(),
            AppError::SettlementPartialFailure { period, .. } => {
                format!("Settlement for {} was not recorded, please try again", period)
            }
            _ => "Something went wrong on our side, please try again".to_string(),
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Slots claimed by another admitted booking
    #[error("Slots already taken: {}", .0.join(", "))]
    SlotTaken(Vec<String>),

    /// Row changed between read and conditional update
    #[error("Stale state: {0}")]
    StaleState(String),

    /// Simulated or backend-specific failure without a SQL cause
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    // Unique violation
                    Some("23505") => RepositoryError::Duplicate(db_err.message().to_string()),
                    // Foreign key / check violation
                    Some("23503") | Some("23514") => {
                        RepositoryError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => RepositoryError::Query(err),
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_taken_maps_to_conflict() {
        let err = AppError::store("reserve")(RepositoryError::SlotTaken(vec![
            "14:00-15:00".to_string(),
        ]));
        match err {
            AppError::SlotConflict { conflicting } => assert_eq!(conflicting, vec!["14:00-15:00"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_errors_hide_details() {
        let err = AppError::store("insert booking")(RepositoryError::Query(SqlxError::PoolClosed));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.kind(), "UpstreamStoreError");
        assert!(!err.public_message().contains("pool"));
        assert!(err.to_string().contains("insert booking"));
    }

    #[test]
    fn test_conflict_message_names_slots() {
        let err = AppError::SlotConflict {
            conflicting: vec!["09:00-10:00".to_string(), "10:00-11:00".to_string()],
        };
        assert_eq!(err.status_code(), 409);
        assert!(err.public_message().contains("09:00-10:00, 10:00-11:00"));
    }
}
