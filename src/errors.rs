use std::collections::BTreeMap;

use thiserror::Error;

use panel_config::ConfigError;

/// Error type for the form and matrix core.
///
/// Field validation failures are not errors; they are returned as data in a
/// [`crate::validation::ValidationReport`].
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Schema configuration error at `{path}`: {reason}")]
    SchemaConfiguration { path: String, reason: String },
    #[error("Data integrity error at row {row}, column {column}: {reason}")]
    DataIntegrity {
        row: usize,
        column: usize,
        reason: String,
    },
    #[error("Unknown field `{0}`")]
    UnknownField(String),
    #[error("Invalid input for `{path}`: {reason}")]
    InvalidInput { path: String, reason: String },
    #[error("Submission failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Server rejected {} field(s)", .0.len())]
    ServerValidation(BTreeMap<String, String>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PanelError {
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PanelError::SchemaConfiguration {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PanelError::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure talking to the backend during a save.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network unavailable: {0}")]
    Network(String),
    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unreadable response: {0}")]
    Decode(String),
}
