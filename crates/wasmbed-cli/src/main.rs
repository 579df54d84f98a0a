use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use wasmbed_cli::config::{resolve_config, BuildOverrides};
use wasmbed_cli::logging::{init_logging, LogFormat, LogLevel};
use wasmbed_cli::verify::verify_module;
use wasmbed_core::{
    BuildConfig, CompileRequest, Environment, Pipeline, PipelineReport, Profile, SystemRunner,
};

#[derive(Parser, Debug)]
#[command(name = "wasmbed")]
#[command(about = "Build a TinyGo module to WebAssembly and embed it as a JS source module")]
#[command(version)]
struct Cli {
    /// Log verbosity (RUST_LOG overrides)
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tidy, check the toolchain, compile and package
    Build {
        #[command(flatten)]
        opts: BuildOpts,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a packaged module embeds the given binary
    Verify {
        /// Generated JS module
        module: PathBuf,

        /// Compiled .wasm binary
        wasm: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the compiler command a build would run, without running it
    Args {
        #[command(flatten)]
        opts: BuildOpts,
    },
}

/// Options shared by `build` and `args`. Relative paths resolve against
/// the module directory.
#[derive(Args, Debug)]
struct BuildOpts {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of the Go module to build
    #[arg(long, short = 'C')]
    module_dir: Option<PathBuf>,

    /// Build profile [default: release]
    #[arg(long, value_parser = Profile::from_str)]
    profile: Option<Profile>,

    /// Destination of the generated JS module
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Name of the exported constant
    #[arg(long)]
    constant: Option<String>,

    /// Keep the compiled binary at this path
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Pinned compiler version
    #[arg(long)]
    required_version: Option<String>,

    /// Compiler program
    #[arg(long)]
    compiler: Option<String>,

    /// Kill any toolchain command running longer than this
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Skip dependency reconciliation
    #[arg(long)]
    skip_tidy: bool,

    /// Skip the compiler version check
    #[arg(long)]
    skip_version_check: bool,
}

impl BuildOpts {
    fn resolve(self) -> Result<BuildConfig> {
        let overrides = BuildOverrides {
            module_dir: self.module_dir,
            profile: self.profile,
            output: self.output,
            constant_name: self.constant,
            artifact_path: self.artifact,
            required_version: self.required_version,
            compiler: self.compiler,
            timeout_secs: self.timeout_secs,
            skip_tidy: self.skip_tidy,
            skip_version_check: self.skip_version_check,
        };
        resolve_config(self.config.as_deref(), overrides)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    match cli.command {
        Commands::Build { opts, json } => cmd_build(opts, json),
        Commands::Verify { module, wasm, json } => cmd_verify(&module, &wasm, json),
        Commands::Args { opts } => cmd_args(opts),
    }
}

fn cmd_build(opts: BuildOpts, json: bool) -> Result<()> {
    let config = opts.resolve()?;
    let runner = SystemRunner::with_timeout(config.timeout());
    let pipeline = Pipeline::new(runner, config, Environment::inherit());

    let started = Instant::now();
    let result = pipeline.run();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::info!(target: "pipeline", stage = "finish", status = "ok", elapsed_ms),
        Err(err) => tracing::error!(
            target: "pipeline",
            stage = "finish",
            status = "error",
            elapsed_ms,
            error = %err
        ),
    }
    let report = result.context("build failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!(
        "Packaged {} bytes ({}) into {}",
        report.artifact_size,
        report.artifact_sha256,
        report.module_path.display()
    );
    match &report.compiler_version {
        Some(version) => println!("Profile: {}, compiler: tinygo {}", report.profile, version),
        None => println!("Profile: {}, compiler version not checked", report.profile),
    }
    if let Some(path) = &report.artifact_path {
        println!("Binary kept at {}", path.display());
    }
}

fn cmd_verify(module: &Path, wasm: &Path, json: bool) -> Result<()> {
    let verified = verify_module(module, wasm)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&verified)?);
        return Ok(());
    }
    println!(
        "OK: {} embeds {} bytes ({})",
        verified.constant_name, verified.size, verified.sha256
    );
    Ok(())
}

fn cmd_args(opts: BuildOpts) -> Result<()> {
    let config = opts.resolve()?;
    let artifact = config
        .kept_artifact_path()
        .unwrap_or_else(|| PathBuf::from("$TMPDIR").join(&config.artifact_name));
    let request = CompileRequest::new(
        config.compiler.clone(),
        config.profile,
        artifact,
        config.module_dir.clone(),
        Environment::new(),
        &config.target,
    );
    let invocation = request.invocation()?;

    let env: Vec<String> = request
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
        .collect();
    println!("{} {}", env.join(" "), invocation);
    Ok(())
}
