//! The linear build pipeline: resolve → version gate → compile → package.
//!
//! Each stage runs only if the previous one succeeded. The destination
//! module is touched only by the last stage, after a successful compile.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use crate::compile::CompileRequest;
use crate::config::BuildConfig;
use crate::env::Environment;
use crate::error::{PipelineError, Result};
use crate::package;
use crate::profile::Profile;
use crate::resolve;
use crate::runner::CommandRunner;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PipelineReport {
    pub profile: Profile,
    /// `None` when the version gate was skipped.
    pub compiler_version: Option<String>,
    /// Only set when the binary was kept outside a temporary directory.
    pub artifact_path: Option<PathBuf>,
    pub artifact_size: usize,
    pub artifact_sha256: String,
    pub module_path: PathBuf,
    pub module_size: usize,
    pub elapsed_ms: u64,
}

pub struct Pipeline<R> {
    runner: R,
    config: BuildConfig,
    env: Environment,
}

impl<R: CommandRunner> Pipeline<R> {
    /// `env` is the environment the compiler inherits before the target
    /// variables are overlaid; pass [`Environment::inherit`] for real builds.
    pub fn new(runner: R, config: BuildConfig, env: Environment) -> Self {
        Pipeline {
            runner,
            config,
            env,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn run(&self) -> Result<PipelineReport> {
        let started = Instant::now();
        self.config.validate()?;

        // Commands run inside the module directory, so every path handed to
        // them must be independent of the caller's working directory.
        let mut config = self.config.clone();
        config.module_dir = fs::canonicalize(&self.config.module_dir)
            .map_err(|e| PipelineError::io(&self.config.module_dir, e))?;

        tracing::info!(
            target: "pipeline",
            stage = "start",
            profile = %config.profile,
            target = %config.target,
            module_dir = %config.module_dir.display(),
            output = %config.output_path().display(),
        );

        if config.skip_tidy {
            tracing::warn!(target: "pipeline", stage = "resolve", status = "skipped");
        } else {
            resolve::tidy(&self.runner, &config.resolver, &config.module_dir)?;
            tracing::info!(target: "pipeline", stage = "resolve", status = "ok");
        }

        let compiler_version = if config.skip_version_check {
            tracing::warn!(
                target: "pipeline",
                stage = "version_gate",
                status = "skipped",
                required = %config.required_version,
            );
            None
        } else {
            let version = config.version_gate().check(
                &self.runner,
                &config.compiler,
                &config.module_dir,
            )?;
            tracing::info!(
                target: "pipeline",
                stage = "version_gate",
                status = "ok",
                version = %version,
            );
            Some(version)
        };

        // Hold the temporary directory until packaging has read the binary.
        let (artifact, _scratch) = match config.kept_artifact_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
                }
                (path, None)
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("wasmbed-")
                    .tempdir()
                    .map_err(|e| PipelineError::io(std::env::temp_dir(), e))?;
                (dir.path().join(&config.artifact_name), Some(dir))
            }
        };

        let request = CompileRequest::new(
            config.compiler.clone(),
            config.profile,
            artifact.clone(),
            config.module_dir.clone(),
            self.env.clone(),
            &config.target,
        );
        let compile_started = Instant::now();
        request.run(&self.runner)?;
        tracing::info!(
            target: "pipeline",
            stage = "compile",
            status = "ok",
            artifact = %artifact.display(),
            elapsed_ms = compile_started.elapsed().as_millis() as u64,
        );

        let packaged = package::package(&artifact, &config.output_path(), &config.constant_name)?;
        tracing::info!(
            target: "pipeline",
            stage = "package",
            status = "ok",
            module = %packaged.path.display(),
            artifact_size = packaged.artifact_size,
            digest = %packaged.artifact_sha256,
        );

        Ok(PipelineReport {
            profile: config.profile,
            compiler_version,
            artifact_path: config.kept_artifact_path(),
            artifact_size: packaged.artifact_size,
            artifact_sha256: packaged.artifact_sha256,
            module_path: packaged.path,
            module_size: packaged.module_size,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}
