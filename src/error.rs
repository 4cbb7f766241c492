use thiserror::Error;

/// Failure to establish a session with a UPS.
///
/// Every variant carries a stable numeric code (see [`LoginError::code`]) so
/// callers and logs can tell the failure classes apart without matching on
/// message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Connection refused due to an SSL Error")]
    Tls,

    #[error("Invalid certificate, connection to host failed")]
    Certificate,

    #[error("Connection refused, host might be out of reach.")]
    Connection,

    #[error("Login Timeout > {0} seconds")]
    Timeout(u64),

    #[error("Invalid URL, no schema supplied")]
    MissingSchema,

    #[error("Invalid URL, no host supplied")]
    InvalidUrl,
}

impl LoginError {
    pub fn code(&self) -> u8 {
        match self {
            LoginError::AuthenticationFailed => 1,
            LoginError::Tls => 2,
            LoginError::Certificate => 3,
            LoginError::Connection => 4,
            LoginError::Timeout(_) => 5,
            LoginError::MissingSchema => 6,
            LoginError::InvalidUrl => 7,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LoginError::Timeout(_))
    }
}

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Login failed ({code}): {0}", code = .0.code())]
    Login(#[from] LoginError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response from {resource}: {reason}")]
    UnexpectedResponse { resource: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// Whether a section accessor may swallow this error and report the
    /// section as absent instead of failing the whole device.
    pub fn is_degradable(&self) -> bool {
        matches!(self, ExporterError::Login(_) | ExporterError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
