//! Error taxonomy for the build-and-package pipeline.
//!
//! Every variant aborts the remaining stages; nothing is retried or
//! recovered locally.

use std::io;
use std::path::PathBuf;

/// Errors raised by a pipeline stage.
#[derive(Debug)]
pub enum PipelineError {
    /// Dependency reconciliation failed, or a toolchain command could not run
    Toolchain { command: String, detail: String },
    /// Installed compiler version differs from the pinned one
    VersionMismatch { expected: String, actual: String },
    /// Cross-compilation returned non-zero or could not be spawned
    Compile { command: String, detail: String },
    /// Read/write failure while packaging
    Io { path: PathBuf, source: io::Error },
    /// Build configuration rejected before any command ran
    Config(String),
    /// Text is not a packaged module this tool would produce
    InvalidModule(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Toolchain { command, detail } => {
                write!(f, "toolchain command `{}` failed: {}", command, detail)
            }
            PipelineError::VersionMismatch { expected, actual } => {
                let actual = if actual.is_empty() {
                    "<missing>"
                } else {
                    actual.as_str()
                };
                write!(
                    f,
                    "compiler version mismatch: expected {}, found {}",
                    expected, actual
                )
            }
            PipelineError::Compile { command, detail } => {
                write!(f, "compilation `{}` failed: {}", command, detail)
            }
            PipelineError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            PipelineError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            PipelineError::InvalidModule(msg) => write!(f, "invalid packaged module: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_mismatch_names_both_versions() {
        let err = PipelineError::VersionMismatch {
            expected: "0.33.0".into(),
            actual: "0.32.1".into(),
        };
        assert_eq!(
            err.to_string(),
            "compiler version mismatch: expected 0.33.0, found 0.32.1"
        );
    }

    #[test]
    fn missing_version_token_is_rendered() {
        let err = PipelineError::VersionMismatch {
            expected: "0.33.0".into(),
            actual: String::new(),
        };
        assert!(err.to_string().ends_with("found <missing>"));
    }

    #[test]
    fn io_error_exposes_source() {
        use std::error::Error;
        let err = PipelineError::io("out.js", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("I/O error on out.js"));
    }
}
