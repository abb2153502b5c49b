//! Result and error types for Ensayo.
//!
//! These cover registration, configuration and plan loading. Failures that
//! happen while a test body runs are not errors of this kind: they are
//! [`StepFailure`](crate::StepFailure) values that end up classified in the
//! result tree.

use thiserror::Error;

/// Result type for Ensayo operations
pub type EnsayoResult<T> = Result<T, EnsayoError>;

/// Errors that can occur in Ensayo
#[derive(Debug, Error)]
pub enum EnsayoError {
    /// Suite or test declared without a name
    #[error("Empty name in {context}")]
    EmptyName {
        /// Where the empty name was found
        context: String,
    },

    /// Two sibling suites share a name
    #[error("Duplicate suite '{name}' under '{parent}'")]
    DuplicateSuite {
        /// Parent path (empty for the top level)
        parent: String,
        /// Suite name
        name: String,
    },

    /// Two sibling tests share a name
    #[error("Duplicate test '{name}' in suite '{suite}'")]
    DuplicateTest {
        /// Owning suite path
        suite: String,
        /// Test name
        name: String,
    },

    /// A step references an empty selector
    #[error("Empty selector in test '{test}'")]
    EmptySelector {
        /// Test path
        test: String,
    },

    /// Pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern source
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Configuration rejected
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Plan could not be parsed
    #[error("Failed to parse plan: {message}")]
    PlanParse {
        /// Error message
        message: String,
    },

    /// Logging could not be installed
    #[error("Failed to initialise logging: {message}")]
    Logging {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
