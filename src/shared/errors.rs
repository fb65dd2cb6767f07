use thiserror::Error;

/// Stable classification of a [`DomainError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ResourceUnavailable,
    InvalidState,
    InsufficientFunds,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ResourceUnavailable => "resource_unavailable",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid extension: {0}")]
    InvalidExtension(String),

    #[error("Parking spot {spot_id} is not available (status: {status})")]
    SpotUnavailable { spot_id: String, status: String },

    #[error("Charging station {station_id} is not available (status: {status})")]
    StationUnavailable { station_id: String, status: String },

    #[error("Cannot {operation} {entity} {id} in status '{status}'")]
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("Payment {payment_id} is not refundable: {reason}")]
    PaymentNotRefundable { payment_id: String, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidInput(_)
            | DomainError::InvalidTimeRange(_)
            | DomainError::InvalidAmount(_)
            | DomainError::InvalidExtension(_) => ErrorKind::InvalidInput,
            DomainError::SpotUnavailable { .. } | DomainError::StationUnavailable { .. } => {
                ErrorKind::ResourceUnavailable
            }
            DomainError::InvalidState { .. }
            | DomainError::InvalidTransition(_)
            | DomainError::PaymentNotRefundable { .. } => ErrorKind::InvalidState,
            DomainError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Unauthorized(_) => ErrorKind::Unauthorized,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is likely transient (lost optimistic race, DB hiccup)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Conflict(_) | DomainError::Storage(_))
    }

    pub fn not_found(entity: &'static str, value: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            field: "id",
            value: value.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Startup and wiring failures of the service process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::Infra(InfraError::Database(e))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_group_variants() {
        assert_eq!(
            DomainError::InvalidTimeRange("x".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            DomainError::SpotUnavailable {
                spot_id: "S1".into(),
                status: "reserved".into()
            }
            .kind(),
            ErrorKind::ResourceUnavailable
        );
        assert_eq!(
            DomainError::PaymentNotRefundable {
                payment_id: "p".into(),
                reason: "refunded".into()
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            DomainError::InsufficientFunds {
                available: 1,
                required: 2
            }
            .kind()
            .as_str(),
            "insufficient_funds"
        );
    }

    #[test]
    fn only_conflict_and_storage_are_transient() {
        assert!(DomainError::Conflict("version".into()).is_transient());
        assert!(DomainError::Storage("locked".into()).is_transient());
        assert!(!DomainError::InvalidAmount("0".into()).is_transient());
        assert!(!DomainError::not_found("Wallet", "w1").is_transient());
    }

    #[test]
    fn invalid_state_message_names_operation() {
        let err = DomainError::InvalidState {
            entity: "Reservation",
            id: "r1".into(),
            status: "completed".into(),
            operation: "cancel",
        };
        assert_eq!(
            err.to_string(),
            "Cannot cancel Reservation r1 in status 'completed'"
        );
    }
}
