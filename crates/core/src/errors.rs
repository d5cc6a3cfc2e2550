use thiserror::Error;

/// Failure of a single call to the external model.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("llm credential is not configured")]
    MissingCredential,
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm api returned an empty completion")]
    EmptyResponse,
    #[error("llm output did not match the declared shape: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid `{field}`: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("`{field}` is required");
        Self { field, message }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, field: Option<String> },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("bad gateway: {message}")]
    BadGateway { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::BadGateway { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }

    /// Message safe to return to a client. Upstream details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } | Self::NotFound { message } => message.clone(),
            Self::BadGateway { .. } => {
                "The language model service is unavailable. Please retry shortly.".to_string()
            }
            Self::Internal { .. } => "An unexpected internal error occurred.".to_string(),
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::BadRequest { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Validation(error) => {
                Self::BadRequest { message: error.message, field: Some(error.field) }
            }
            ApplicationError::Gateway(error) => Self::BadGateway { message: error.to_string() },
            ApplicationError::NotFound(message) => Self::NotFound { message },
            ApplicationError::Persistence(message) | ApplicationError::Internal(message) => {
                Self::Internal { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, GatewayError, InterfaceError, ValidationError};

    #[test]
    fn validation_error_maps_to_bad_request_naming_the_field() {
        let interface = InterfaceError::from(ApplicationError::from(ValidationError::missing(
            "text",
        )));

        assert_eq!(interface.status_code(), 400);
        assert_eq!(interface.field(), Some("text"));
        assert_eq!(interface.user_message(), "`text` is required");
    }

    #[test]
    fn gateway_error_maps_to_bad_gateway_without_leaking_details() {
        let interface = InterfaceError::from(ApplicationError::from(GatewayError::Status {
            status: 401,
            body: "invalid api key sk-live-123".to_string(),
        }));

        assert_eq!(interface.status_code(), 502);
        assert!(!interface.user_message().contains("sk-live-123"));
        assert!(interface.to_string().contains("401"));
    }

    #[test]
    fn persistence_error_maps_to_internal() {
        let interface =
            InterfaceError::from(ApplicationError::Persistence("database is locked".to_string()));

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn not_found_keeps_its_message() {
        let interface =
            InterfaceError::from(ApplicationError::NotFound("policy `P-1` not found".to_string()));
        assert_eq!(interface.status_code(), 404);
        assert_eq!(interface.user_message(), "policy `P-1` not found");
    }
}
