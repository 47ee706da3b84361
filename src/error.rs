//! Error types for the sentiment webhook.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Inbound webhook payload errors.
///
/// These are the only failures a webhook sender ever sees; everything past
/// parsing is recovered inside the handler.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors from the managed services (sentiment, text generation, notification).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} rejected text above its size limit: {message}")]
    TextSizeLimitExceeded { service: String, message: String },

    #[error("{service} throttled the request: {message}")]
    Throttled { service: String, message: String },

    #[error("{service} denied access ({status}): {message}")]
    AuthFailed {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{service} returned HTTP {status}: {message}")]
    Http {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("Request signing failed: {0}")]
    Signing(String),
}

impl ServiceError {
    /// Name of the service that produced the error.
    pub fn service(&self) -> &str {
        match self {
            Self::RequestFailed { service, .. }
            | Self::TextSizeLimitExceeded { service, .. }
            | Self::Throttled { service, .. }
            | Self::AuthFailed { service, .. }
            | Self::Http { service, .. }
            | Self::InvalidResponse { service, .. } => service,
            Self::Signing(_) => "signer",
        }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
