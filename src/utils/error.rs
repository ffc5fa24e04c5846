use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{reason}")]
    Forbidden { reason: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Internal { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 協定層級的錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Forbidden,
    /// Only seen between the ledger and the orchestrator; a bind that keeps
    /// conflicting is reported as `InternalServerError`.
    Conflict,
    InternalServerError,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::Conflict => 409,
            ErrorKind::InternalServerError => 500,
        }
    }
}

/// Error payload written back to the protocol client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub description: String,
}

impl BrokerError {
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        BrokerError::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden<T: Into<String>>(reason: T) -> Self {
        BrokerError::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn conflict<T: Into<String>>(message: T) -> Self {
        BrokerError::Conflict {
            message: message.into(),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        BrokerError::Internal {
            message: message.into(),
        }
    }

    /// Configuration and IO failures never reach a protocol client as anything
    /// other than an internal error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrokerError::BadRequest { .. } => ErrorKind::BadRequest,
            BrokerError::Forbidden { .. } => ErrorKind::Forbidden,
            BrokerError::Conflict { .. } => ErrorKind::Conflict,
            BrokerError::Internal { .. }
            | BrokerError::IoError(_)
            | BrokerError::SerializationError(_)
            | BrokerError::ConfigError { .. }
            | BrokerError::MissingConfigError { .. }
            | BrokerError::InvalidConfigValueError { .. } => ErrorKind::InternalServerError,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Conflict { .. })
    }

    pub fn error_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind(),
            description: self.to_string(),
        }
    }
}

/// Failures reported by a resource store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    #[error("operation cannot be fulfilled on {kind} \"{name}\": the object has been modified")]
    Conflict { kind: String, name: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_status_codes() {
        assert_eq!(BrokerError::bad_request("x").status_code(), 400);
        assert_eq!(BrokerError::forbidden("x").status_code(), 403);
        assert_eq!(BrokerError::conflict("x").status_code(), 409);
        assert_eq!(BrokerError::internal("x").status_code(), 500);
        assert_eq!(
            BrokerError::ConfigError {
                message: "bad".to_string()
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_forbidden_body_keeps_reason_verbatim() {
        let err = BrokerError::forbidden("principal \"bob\" cannot list endpoints");
        let body = err.error_body();
        assert_eq!(body.error, ErrorKind::Forbidden);
        assert_eq!(body.description, "principal \"bob\" cannot list endpoints");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "forbidden");
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(BrokerError::conflict("x").is_retryable());
        assert!(!BrokerError::internal("x").is_retryable());
        assert!(!BrokerError::bad_request("x").is_retryable());
    }
}
