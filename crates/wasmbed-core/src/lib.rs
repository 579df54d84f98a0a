#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

//! Build a TinyGo module to WebAssembly and package the binary as an
//! embeddable JavaScript source module.

pub mod compile;
pub mod config;
mod env;
mod error;
pub mod package;
mod pipeline;
mod profile;
pub mod resolve;
pub mod runner;
pub mod version;

pub use compile::CompileRequest;
pub use config::BuildConfig;
pub use env::Environment;
pub use error::{PipelineError, Result};
pub use package::{decode_module, render_module, PackagedModule};
pub use pipeline::{Pipeline, PipelineReport};
pub use profile::{Profile, TargetDescriptor, TARGET_ARCH_VAR, TARGET_OS_VAR};
pub use runner::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use version::VersionGate;
