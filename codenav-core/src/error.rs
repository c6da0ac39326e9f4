//! Error types for codenav operations

use serde::Serialize;

/// Structured error payload printed by the CLI in `--json` mode.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: String,
}

impl ErrorEnvelope {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodenavError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("Unknown repository: {0}")]
    UnknownRepository(i32),

    #[error("Diff parse error: {0}")]
    DiffParse(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CodenavError {
    /// Machine-readable error code and a hint for the operator.
    pub fn envelope(&self) -> ErrorEnvelope {
        let (code, hint) = match self {
            CodenavError::Configuration(_) => {
                ("configuration", "Check [request] values in the config file")
            }
            CodenavError::Git { .. } => ("git", "Check that the commit and path exist"),
            CodenavError::UnknownRepository(_) => {
                ("unknown_repository", "Register the repository before querying it")
            }
            CodenavError::DiffParse(_) => ("diff_parse", ""),
            CodenavError::ConfigParse(_) => ("config_parse", "Fix the TOML syntax"),
            CodenavError::Io(_) => ("io", ""),
            CodenavError::Serialization(_) => ("serialization", "Check the uploads JSON"),
        };
        ErrorEnvelope::new(code, self.to_string(), hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_envelope() {
        let err = CodenavError::Configuration("hunk cache size must be positive".into());
        let envelope = err.envelope();
        assert_eq!(envelope.code, "configuration");
        assert_eq!(
            envelope.message,
            "Configuration error: hunk cache size must be positive"
        );
    }
}
