#![forbid(unsafe_code)]

//! Host-facing error type.
//!
//! Nothing on the panel or synchronisation paths returns an error: storage
//! failures degrade to ephemeral state and re-entrant events are absorbed.
//! Errors only surface while a host assembles the shell: loading config,
//! opening a preference file, parsing the initial URL or a shortcut.

use std::fmt;

use shellkit_core::ShortcutParseError;

use crate::config::ConfigError;
use crate::location::LocationError;
use crate::storage::StorageError;

/// Error raised while mounting the shell or preparing its ports.
#[derive(Debug)]
pub enum ShellError {
    /// Configuration could not be loaded or failed validation.
    Config(ConfigError),
    /// A shortcut string was malformed.
    Shortcut(ShortcutParseError),
    /// An initial location was malformed.
    Location(LocationError),
    /// A preference backend could not be opened.
    Storage(StorageError),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "shell config: {e}"),
            Self::Shortcut(e) => write!(f, "shell shortcut: {e}"),
            Self::Location(e) => write!(f, "shell location: {e}"),
            Self::Storage(e) => write!(f, "shell storage: {e}"),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Shortcut(e) => Some(e),
            Self::Location(e) => Some(e),
            Self::Storage(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ShellError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ShortcutParseError> for ShellError {
    fn from(e: ShortcutParseError) -> Self {
        Self::Shortcut(e)
    }
}

impl From<LocationError> for ShellError {
    fn from(e: LocationError) -> Self {
        Self::Location(e)
    }
}

impl From<StorageError> for ShellError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn conversions_keep_source() {
        let err: ShellError = ConfigError::Validation(vec!["sync.project_param".into()]).into();
        assert!(err.to_string().starts_with("shell config: validation errors"));
        assert!(err.source().is_some());

        let err: ShellError = ShortcutParseError::MissingKey.into();
        assert_eq!(err.to_string(), "shell shortcut: shortcut has no key");

        let err: ShellError = LocationError::NotAbsolute("board".into()).into();
        assert!(matches!(err, ShellError::Location(_)));
    }

    #[test]
    fn question_mark_from_host_code() {
        fn build() -> Result<crate::location::MemoryHistory, ShellError> {
            Ok(crate::location::MemoryHistory::new("relative")?)
        }
        assert!(matches!(build(), Err(ShellError::Location(_))));
    }
}
