use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::errors::{DomainError, ServiceError, ValidationError};

/// Error codes for FFI boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Success (no error)
    Success = 0,

    // General errors (1-99)
    Unknown = 1,
    InvalidArgument = 2,
    NullPointer = 3,
    InvalidUtf8 = 4,
    InternalError = 6,

    // Domain errors (200-299)
    EntityNotFound = 201,
    ValidationFailed = 204,
    InvalidModule = 209,
    CsvError = 210,

    // Service errors (300-399)
    NetworkError = 308,
    ServiceUnavailable = 309,
    ConfigurationError = 310,
    ExternalServiceError = 311,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as i32)
    }
}

/// Error type for FFI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FFIError {
    /// Error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (JSON string)
    pub details: Option<String>,
}

impl fmt::Display for FFIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for FFIError {}

impl FFIError {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: &str, details: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn null_pointer(name: &str) -> Self {
        Self::new(ErrorCode::NullPointer, &format!("{} must not be null", name))
    }

    // Helper for internal errors
    pub fn internal(message: String) -> Self {
        Self::new(ErrorCode::InternalError, &message)
    }

    // Helper for converting ServiceError, commonly needed in FFI layer
    pub fn from_service_error(err: ServiceError) -> Self {
        err.into()
    }
}

// --- From<DomainError> for FFIError ---
impl From<DomainError> for FFIError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(val_err) => {
                val_err.into() // Delegate to From<ValidationError>
            },
            DomainError::EntityNotFound(entity, id) => {
                Self::with_details(
                    ErrorCode::EntityNotFound,
                    &format!("Entity not found: {} with ID {}", entity, id),
                    &json!({ "entity": entity, "id": id }).to_string(),
                )
            },
            DomainError::InvalidModule(raw) => {
                Self::with_details(
                    ErrorCode::InvalidModule,
                    &format!("Invalid module ID {}", raw),
                    &json!({ "module": raw }).to_string(),
                )
            },
            DomainError::Csv(msg) => {
                Self::new(ErrorCode::CsvError, &msg)
            },
            DomainError::Internal(msg) => {
                Self::new(ErrorCode::InternalError, &msg)
            },
        }
    }
}

// --- From<ServiceError> for FFIError ---
impl From<ServiceError> for FFIError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(domain_err) => {
                domain_err.into() // Delegate
            },
            ServiceError::Network(msg) => {
                Self::new(ErrorCode::NetworkError, &msg)
            },
            ServiceError::ServiceUnavailable(msg) => {
                Self::new(ErrorCode::ServiceUnavailable, &msg)
            },
            ServiceError::Configuration(msg) => {
                Self::new(ErrorCode::ConfigurationError, &msg)
            },
            ServiceError::ExternalService(msg) => {
                Self::new(ErrorCode::ExternalServiceError, &msg)
            },
        }
    }
}

// --- From<ValidationError> for FFIError ---
impl From<ValidationError> for FFIError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        let details = match &err {
            ValidationError::Required { field } => json!({ "field": field, "type": "required" }),
            ValidationError::MaxLength { field, max } => json!({ "field": field, "type": "max_length", "max": max }),
            ValidationError::Range { field, min, max } => {
                json!({ "field": field, "type": "range", "min": min, "max": max })
            },
            ValidationError::Format { field, reason } => json!({ "field": field, "type": "format", "reason": reason }),
        };
        Self::with_details(ErrorCode::ValidationFailed, &message, &details.to_string())
    }
}

impl From<std::ffi::NulError> for FFIError {
    fn from(_: std::ffi::NulError) -> Self {
        Self::new(ErrorCode::InvalidUtf8, "String contains null bytes, cannot create CString")
    }
}

impl From<serde_json::Error> for FFIError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_argument(&format!("json {}", err))
    }
}

// Result type alias for FFI functions
pub type FFIResult<T> = Result<T, FFIError>;
