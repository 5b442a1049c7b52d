use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },

    #[error("Conflicting write on {resource} {id}: {message}")]
    Conflict {
        resource: String,
        id: String,
        message: String,
    },

    #[error("Rejected by server ({status}): {details}")]
    Validation {
        status: u16,
        details: serde_json::Value,
    },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Access token is not valid")]
    TokenInvalid,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Upload rejected: {message}")]
    UploadError { message: String },

    #[error("Edit session is {state}, cannot {operation}")]
    InvalidState { state: String, operation: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Conflict,
    NotFound,
    Validation,
    Network,
    Auth,
    Server,
    Config,
    Local,
}

impl AdminError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AdminError::Conflict { .. } => ErrorCategory::Conflict,
            AdminError::NotFound { .. } => ErrorCategory::NotFound,
            AdminError::Validation { .. } | AdminError::UploadError { .. } => {
                ErrorCategory::Validation
            }
            AdminError::Network(_) => ErrorCategory::Network,
            AdminError::TokenInvalid => ErrorCategory::Auth,
            AdminError::Http { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Auth
            }
            AdminError::Http { .. } => ErrorCategory::Server,
            AdminError::InvalidUrl(_)
            | AdminError::ConfigError { .. }
            | AdminError::InvalidConfigValueError { .. }
            | AdminError::MissingConfigError { .. } => ErrorCategory::Config,
            AdminError::IoError(_)
            | AdminError::SerializationError(_)
            | AdminError::InvalidState { .. } => ErrorCategory::Local,
        }
    }

    /// Only transport failures may be retried, and only when the caller asks.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdminError::Network(_))
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AdminError::Conflict { .. } => {
                "The record was changed by someone else after you started editing.".to_string()
            }
            AdminError::NotFound { resource, id } => {
                format!("{} {} no longer exists.", resource, id)
            }
            AdminError::Validation { details, .. } => {
                format!("The server rejected the data: {}", details)
            }
            AdminError::Network(_) => {
                "Could not reach the server. Your changes were kept; try again.".to_string()
            }
            AdminError::TokenInvalid => {
                "Your session has expired. Run `inventory-desk login` again.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Conflict => 4,
            ErrorCategory::NotFound => 5,
            ErrorCategory::Validation => 6,
            ErrorCategory::Network => 2,
            ErrorCategory::Auth => 7,
            ErrorCategory::Server => 1,
            ErrorCategory::Config => 3,
            ErrorCategory::Local => 1,
        }
    }

    pub(crate) fn not_found(resource: &str, id: impl ToString) -> Self {
        AdminError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        AdminError::Network(err)
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        let conflict = AdminError::Conflict {
            resource: "supplier".to_string(),
            id: "3".to_string(),
            message: "stale".to_string(),
        };
        assert!(!conflict.is_retryable());
        assert_eq!(conflict.category(), ErrorCategory::Conflict);

        let validation = AdminError::Validation {
            status: 400,
            details: serde_json::json!({"name": ["required"]}),
        };
        assert!(!validation.is_retryable());
        assert!(validation.user_friendly_message().contains("required"));
    }

    #[test]
    fn test_auth_statuses_map_to_auth_category() {
        assert_eq!(AdminError::TokenInvalid.category(), ErrorCategory::Auth);
        let forbidden = AdminError::Http {
            status: 403,
            body: String::new(),
        };
        assert_eq!(forbidden.category(), ErrorCategory::Auth);
        let broken = AdminError::Http {
            status: 502,
            body: String::new(),
        };
        assert_eq!(broken.category(), ErrorCategory::Server);
    }
}
