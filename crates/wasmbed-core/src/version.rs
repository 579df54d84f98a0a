//! Toolchain version gate.
//!
//! The compiler's flag surface and code generation are not stable across
//! releases, so the build refuses to run on anything but the pinned version.

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::runner::{CommandRunner, Invocation};

/// Pinned compiler version and where to find it in the version report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionGate {
    required: String,
    token_index: usize,
}

impl VersionGate {
    pub fn new(required: impl Into<String>, token_index: usize) -> Self {
        VersionGate {
            required: required.into(),
            token_index,
        }
    }

    pub fn required(&self) -> &str {
        &self.required
    }

    /// Whitespace token holding the version, if present.
    pub fn extract<'a>(&self, report: &'a str) -> Option<&'a str> {
        report.split_whitespace().nth(self.token_index)
    }

    /// Compare the version token in `report` with the pinned version.
    /// Returns the installed version when it matches.
    pub fn evaluate(&self, report: &str) -> Result<String> {
        match self.extract(report) {
            Some(actual) if actual == self.required => Ok(actual.to_string()),
            found => Err(PipelineError::VersionMismatch {
                expected: self.required.clone(),
                actual: found.unwrap_or_default().to_string(),
            }),
        }
    }

    /// Run `<compiler> version` and check its report.
    pub fn check<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        compiler: &[String],
        module_dir: &Path,
    ) -> Result<String> {
        let invocation = Invocation::from_argv(compiler)
            .ok_or_else(|| PipelineError::Config("compiler command is empty".into()))?
            .arg("version")
            .current_dir(module_dir);

        let output = runner
            .run(&invocation)
            .map_err(|e| PipelineError::Toolchain {
                command: invocation.to_string(),
                detail: e.to_string(),
            })?;
        if !output.success() {
            return Err(PipelineError::Toolchain {
                command: invocation.to_string(),
                detail: output.failure_summary(),
            });
        }

        self.evaluate(&output.stdout_lossy())
    }
}
