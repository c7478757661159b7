/*!
 * Error types for the fictrans library.
 *
 * Provider failures are classified into a closed taxonomy (`ErrorKind`) so
 * that the pipeline can decide uniformly whether a failure is worth retrying.
 * The remaining enums cover glossary parsing, threshold parsing, the
 * translation pipeline itself and the command-line application.
 */

use std::fmt;

use thiserror::Error;

/// Classification shared by every provider implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AuthInvalid,
    PermissionDenied,
    RateLimited,
    ServerOverloaded,
    NetworkError,
    Timeout,
    InvalidResponseShape,
    ContentPolicyBlocked,
    BillingExhausted,
    ModelNotFound,
    Unclassified,
}

impl ErrorKind {
    /// Whether a failure of this kind may succeed when repeated after a delay
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited
                | ErrorKind::ServerOverloaded
                | ErrorKind::NetworkError
                | ErrorKind::Timeout
                | ErrorKind::InvalidResponseShape
        )
    }

    /// Whether switching to another credential may fix the failure
    pub fn is_credential_failure(self) -> bool {
        matches!(self, ErrorKind::AuthInvalid | ErrorKind::BillingExhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::AuthInvalid => "auth_invalid",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServerOverloaded => "server_overloaded",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidResponseShape => "invalid_response_shape",
            ErrorKind::ContentPolicyBlocked => "content_policy_blocked",
            ErrorKind::BillingExhausted => "billing_exhausted",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The credential was rejected
    #[error("Authentication error: {0}")]
    AuthInvalid(String),

    /// The credential is valid but not allowed to use the resource
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The service is temporarily unable to answer
    #[error("Server overloaded: {0}")]
    ServerOverloaded(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    Network(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The response body did not have the expected structure
    #[error("Unexpected response shape: {0}")]
    InvalidResponseShape(String),

    /// The service refused the content; the message is shown verbatim
    #[error("{0}")]
    ContentPolicyBlocked(String),

    /// Account balance or quota is used up
    #[error("Billing or quota exhausted: {0}")]
    BillingExhausted(String),

    /// The selected model does not exist for this account
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Error returned by the API that fits no other class
    #[error("API responded with error: {status_code:?} - {message}")]
    Unclassified {
        /// HTTP status code, if the failure came from an HTTP response
        status_code: Option<u16>,
        /// Error message from the API
        message: String,
    },
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::AuthInvalid(_) => ErrorKind::AuthInvalid,
            ProviderError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ProviderError::RateLimited(_) => ErrorKind::RateLimited,
            ProviderError::ServerOverloaded(_) => ErrorKind::ServerOverloaded,
            ProviderError::Network(_) => ErrorKind::NetworkError,
            ProviderError::Timeout(_) => ErrorKind::Timeout,
            ProviderError::InvalidResponseShape(_) => ErrorKind::InvalidResponseShape,
            ProviderError::ContentPolicyBlocked(_) => ErrorKind::ContentPolicyBlocked,
            ProviderError::BillingExhausted(_) => ErrorKind::BillingExhausted,
            ProviderError::ModelNotFound(_) => ErrorKind::ModelNotFound,
            ProviderError::Unclassified { .. } => ErrorKind::Unclassified,
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind().is_retriable()
    }

    /// Build an error of the given kind with a message
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::AuthInvalid => ProviderError::AuthInvalid(message),
            ErrorKind::PermissionDenied => ProviderError::PermissionDenied(message),
            ErrorKind::RateLimited => ProviderError::RateLimited(message),
            ErrorKind::ServerOverloaded => ProviderError::ServerOverloaded(message),
            ErrorKind::NetworkError => ProviderError::Network(message),
            ErrorKind::Timeout => ProviderError::Timeout(message),
            ErrorKind::InvalidResponseShape => ProviderError::InvalidResponseShape(message),
            ErrorKind::ContentPolicyBlocked => ProviderError::ContentPolicyBlocked(message),
            ErrorKind::BillingExhausted => ProviderError::BillingExhausted(message),
            ErrorKind::ModelNotFound => ProviderError::ModelNotFound(message),
            ErrorKind::Unclassified => ProviderError::Unclassified {
                status_code: None,
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout(error.to_string())
        } else if error.is_connect() || error.is_request() || error.is_body() {
            ProviderError::Network(error.to_string())
        } else if error.is_decode() {
            ProviderError::InvalidResponseShape(error.to_string())
        } else {
            ProviderError::Unclassified {
                status_code: error.status().map(|s| s.as_u16()),
                message: error.to_string(),
            }
        }
    }
}

/// Errors raised while parsing or managing glossaries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GlossaryError {
    #[error("Glossary header has no version field")]
    MissingVersion,

    #[error("Glossary contains no non-empty section")]
    NoContent,

    #[error("Malformed glossary line {line}: {content}")]
    MalformedLine { line: usize, content: String },

    #[error("Invalid regex rule '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("At least one local glossary source must remain")]
    LastLocalSource,

    #[error("Unknown glossary source: {0}")]
    UnknownSource(String),

    #[error("Failed to import glossary from {url}: {message}")]
    Import { url: String, message: String },

    #[error("Rule cache error: {0}")]
    Cache(String),
}

/// A rejected validation-threshold override string
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("Threshold override is empty")]
    Empty,

    #[error("Threshold override mixes delimiters: {0}")]
    MixedDelimiters(String),

    #[error("Threshold override needs exactly 3 values, found {0}")]
    FieldCount(usize),

    #[error("Invalid threshold value '{0}'")]
    InvalidValue(String),
}

/// Errors that can occur during translation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The response did not split into one segment per unit
    #[error("Expected {expected} segments but the response contained {actual}")]
    SegmentMismatch { expected: usize, actual: usize },

    /// Too many occurrences of a placeholder were dropped
    #[error("Placeholder {token} lost: expected {expected}, found {actual}")]
    PlaceholderLoss {
        token: String,
        expected: usize,
        actual: usize,
    },

    /// The response contains a placeholder that was never issued
    #[error("Unknown placeholder in response: {0}")]
    UnknownPlaceholder(String),

    #[error("Provider returned an empty translation")]
    EmptyResponse,

    /// The run this work belonged to was paused or restarted
    #[error("Translation cancelled")]
    Cancelled,

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<TranslationError>,
    },
}

impl TranslationError {
    pub fn is_retriable(&self) -> bool {
        match self {
            TranslationError::Provider(e) => e.is_retriable(),
            TranslationError::SegmentMismatch { .. }
            | TranslationError::PlaceholderLoss { .. }
            | TranslationError::UnknownPlaceholder(_)
            | TranslationError::EmptyResponse => true,
            TranslationError::Cancelled | TranslationError::RetriesExhausted { .. } => false,
        }
    }

    /// The error that ended the retry loop, looking through `RetriesExhausted`
    pub fn root(&self) -> &TranslationError {
        match self {
            TranslationError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// Message rendered next to a failed unit; content refusals are shown verbatim
    pub fn user_message(&self) -> String {
        match self.root() {
            TranslationError::Provider(ProviderError::ContentPolicyBlocked(message)) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Glossary error: {0}")]
    Glossary(#[from] GlossaryError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
