//! Dependency manifest reconciliation (`go mod tidy`).

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::runner::{CommandRunner, Invocation};

/// Run the reconciliation command in `module_dir`. Any failure is a
/// [`PipelineError::Toolchain`].
pub fn tidy<R: CommandRunner + ?Sized>(
    runner: &R,
    resolver: &[String],
    module_dir: &Path,
) -> Result<()> {
    let invocation = Invocation::from_argv(resolver)
        .ok_or_else(|| PipelineError::Config("resolver command is empty".into()))?
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

    tracing::debug!(
        target: "pipeline",
        stage = "resolve",
        stdout = %output.stdout_lossy().trim_end(),
    );
    Ok(())
}
