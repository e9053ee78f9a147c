//! Error types for cohort resolution.

use std::fmt;

/// Failure reported by a paged-search backend for a single page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    /// HTTP status code, when the failure came from an HTTP response.
    pub status: Option<u16>,
    /// Status text or diagnostics returned by the backend.
    pub message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// A failure with an HTTP status attached.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    /// A failure below HTTP (connect, timeout, decoding).
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    /// Returns `true` for 401/403 responses.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BackendError {}

/// Errors that abort a cohort resolution.
#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    /// The translation service returned a non-success status or an unusable payload.
    #[error("Failed to fetch cohort queries: {status}")]
    TranslationFailure { status: String },

    /// A page fetch failed while executing one query.
    #[error("Query {resource}?{filter_expression} failed: {status}")]
    BackendQuery {
        resource: String,
        filter_expression: String,
        status: String,
        #[source]
        source: BackendError,
    },

    /// The output consumer could not store the cohort group.
    #[error("Failed to persist cohort group: {status}")]
    Persistence { status: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CohortError {
    #[must_use]
    pub fn translation(status: impl Into<String>) -> Self {
        Self::TranslationFailure {
            status: status.into(),
        }
    }

    #[must_use]
    pub fn backend_query(
        resource: impl Into<String>,
        filter_expression: impl Into<String>,
        source: BackendError,
    ) -> Self {
        Self::BackendQuery {
            resource: resource.into(),
            filter_expression: filter_expression.into(),
            status: source.to_string(),
            source,
        }
    }

    #[must_use]
    pub fn persistence(status: impl Into<String>) -> Self {
        Self::Persistence {
            status: status.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Filter expression of the failing query, for backend failures.
    #[must_use]
    pub fn filter_expression(&self) -> Option<&str> {
        match self {
            Self::BackendQuery {
                filter_expression, ..
            } => Some(filter_expression),
            _ => None,
        }
    }

    /// Returns the error category for logging.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TranslationFailure { .. } => ErrorCategory::Translation,
            Self::BackendQuery { .. } => ErrorCategory::Backend,
            Self::Persistence { .. } => ErrorCategory::Persistence,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Categories of cohort errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Translation,
    Backend,
    Persistence,
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translation => write!(f, "translation"),
            Self::Backend => write!(f, "backend"),
            Self::Persistence => write!(f, "persistence"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for cohort operations.
pub type CohortResult<T> = Result<T, CohortError>;
