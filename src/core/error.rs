use thiserror::Error;

use crate::core::types::CellId;

#[derive(Error, Debug)]
pub enum EvError {
    /// Invalid static configuration, raised before any step executes
    #[error("Configuration error: {0}")]
    Config(String),

    /// A runtime value violates a mathematical precondition
    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Unknown cell: {0}")]
    UnknownCell(CellId),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),
}

impl EvError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        Self::Domain(msg.into())
    }

    /// True for errors describing bad static configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::UnknownCell(_))
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}

pub type Result<T> = std::result::Result<T, EvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_cell_counts_as_config() {
        let err = EvError::UnknownCell(CellId::new("C9"));
        assert!(err.is_config());
        assert!(!err.is_domain());
        assert_eq!(err.to_string(), "Unknown cell: C9");
    }

    #[test]
    fn test_toml_error_converts() {
        let parsed: std::result::Result<toml::Value, _> = "key = ".parse::<toml::Value>();
        let err: EvError = parsed.unwrap_err().into();
        assert!(matches!(err, EvError::TomlError(_)));
        assert!(!err.is_config());
    }
}
