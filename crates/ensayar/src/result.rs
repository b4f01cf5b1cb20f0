//! Result and error types for Ensayar.

use thiserror::Error;

/// Result type for Ensayar operations
pub type EnsayarResult<T> = Result<T, EnsayarError>;

/// Errors that can occur in Ensayar
#[derive(Debug, Error)]
pub enum EnsayarError {
    /// A page object action exceeded the driver's wait budget.
    ///
    /// Messages carry the semantic field and page name, never a raw
    /// selector, so failures read in domain terms.
    #[error("Element '{field}' on {page} not ready after {ms}ms")]
    ElementNotReady {
        /// Page object name
        page: String,
        /// Semantic field name
        field: String,
        /// Wait budget that was exceeded
        ms: u64,
    },

    /// A scenario setup step failed; the test body never ran.
    #[error("Scenario '{scenario}' build failed: {message}")]
    ScenarioBuild {
        /// Scenario (or dependency) whose step failed
        scenario: String,
        /// Underlying cause
        message: String,
    },

    /// A malformed interception rule, rejected at registration time.
    #[error("Interception rule rejected: {message}")]
    InterceptionConfig {
        /// What was wrong with the rule
        message: String,
    },

    /// A request was aborted by an interception rule.
    #[error("Request to {url} aborted: {reason}")]
    RequestAborted {
        /// Request URL
        url: String,
        /// Abort reason message
        reason: String,
    },

    /// A page object was constructed against a session in the wrong state.
    #[error("Usage error: {message}")]
    Usage {
        /// What precondition was violated
        message: String,
    },

    /// Navigation failed.
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Automation driver failure outside the element-wait path.
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Assertion helper failure (request-count assertions and friends).
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
