use std::num::ParseIntError;

/// Errors raised while deriving values from a [`DirectoryConfig`](crate::DirectoryConfig).
#[derive(Debug, thiserror::Error)]
pub enum DirectoryConfigError {
    /// A required collaborator was not supplied.
    #[error("{0}")]
    InvalidState(&'static str),
    /// A numeric configuration value could not be parsed.
    #[error("invalid value '{value}' for '{key}': {source}")]
    Format {
        key: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl DirectoryConfigError {
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}
