//! Cross-compiler invocation.

use std::path::PathBuf;

use crate::env::Environment;
use crate::error::{PipelineError, Result};
use crate::profile::{Profile, TargetDescriptor};
use crate::runner::{CommandRunner, Invocation};

/// Everything needed to run one compilation. Owns its environment, so no
/// global process state is consulted.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub compiler: Vec<String>,
    pub profile: Profile,
    pub output: PathBuf,
    pub module_dir: PathBuf,
    pub env: Environment,
}

impl CompileRequest {
    /// `env` is the inherited environment; the target variables are
    /// overlaid on top of it.
    pub fn new(
        compiler: Vec<String>,
        profile: Profile,
        output: PathBuf,
        module_dir: PathBuf,
        env: Environment,
        target: &TargetDescriptor,
    ) -> Self {
        CompileRequest {
            compiler,
            profile,
            output,
            module_dir,
            env: env.with_target(target),
        }
    }

    /// Arguments after the compiler program: `build -o <output> [flags]`.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.compiler.iter().skip(1).cloned().collect();
        args.push("build".into());
        args.push("-o".into());
        args.push(self.output.to_string_lossy().into_owned());
        args.extend(self.profile.compiler_flags().iter().map(|f| f.to_string()));
        args
    }

    pub fn invocation(&self) -> Result<Invocation> {
        let program = self
            .compiler
            .first()
            .ok_or_else(|| PipelineError::Config("compiler command is empty".into()))?;
        Ok(Invocation::new(program.clone())
            .args(self.args())
            .current_dir(&self.module_dir)
            .env(self.env.clone()))
    }

    /// Run the compiler. On success the binary exists at `self.output`
    /// (unless the compiler lied, which the packager reports as I/O).
    pub fn run<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<()> {
        let invocation = self.invocation()?;
        let output = runner.run(&invocation).map_err(|e| PipelineError::Compile {
            command: invocation.to_string(),
            detail: e.to_string(),
        })?;
        if !output.success() {
            return Err(PipelineError::Compile {
                command: invocation.to_string(),
                detail: output.failure_summary(),
            });
        }
        Ok(())
    }
}
