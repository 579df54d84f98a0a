//! Fake toolchain shared by the pipeline tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::path::PathBuf;

use wasmbed_core::{BuildConfig, CommandOutput, CommandRunner, Invocation};

pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];

pub fn version_report(version: &str) -> String {
    format!(
        "tinygo version {} linux/amd64 (using go version go1.22.5 and LLVM version 18.1.2)\n",
        version
    )
}

/// Stands in for `go` and `tinygo`, recording every invocation.
pub struct FakeToolchain {
    pub tidy_status: i32,
    pub version_report: String,
    pub compile_status: i32,
    /// Written to the `-o` path on a successful build; `None` writes nothing.
    pub artifact: Option<Vec<u8>>,
    pub calls: RefCell<Vec<Invocation>>,
}

impl Default for FakeToolchain {
    fn default() -> Self {
        FakeToolchain {
            tidy_status: 0,
            version_report: version_report("0.33.0"),
            compile_status: 0,
            artifact: Some(WASM_MAGIC.to_vec()),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl FakeToolchain {
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|inv| match inv.args.first() {
                Some(sub) => format!("{} {}", inv.program, sub),
                None => inv.program.clone(),
            })
            .collect()
    }

    pub fn build_call(&self) -> Option<Invocation> {
        self.calls
            .borrow()
            .iter()
            .find(|inv| inv.args.first().map(String::as_str) == Some("build"))
            .cloned()
    }
}

fn exited(code: i32) -> CommandOutput {
    CommandOutput {
        status: Some(code),
        ..Default::default()
    }
}

impl CommandRunner for FakeToolchain {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        match (
            invocation.program.as_str(),
            invocation.args.first().map(String::as_str),
        ) {
            ("go", Some("mod")) => Ok(exited(self.tidy_status)),
            ("tinygo", Some("version")) => Ok(CommandOutput {
                status: Some(0),
                stdout: self.version_report.clone().into_bytes(),
                ..Default::default()
            }),
            ("tinygo", Some("build")) => {
                if self.compile_status != 0 {
                    return Ok(CommandOutput {
                        status: Some(self.compile_status),
                        stderr: b"main.go:3:1: syntax error\n".to_vec(),
                        ..Default::default()
                    });
                }
                let out = invocation
                    .args
                    .iter()
                    .position(|a| a == "-o")
                    .and_then(|i| invocation.args.get(i + 1))
                    .expect("build without -o");
                if let Some(bytes) = &self.artifact {
                    std::fs::write(out, bytes)?;
                }
                Ok(exited(0))
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such program: {}", invocation.program),
            )),
        }
    }
}

/// Config rooted in `module_dir`, writing `dist/s2-bindings.js`.
pub fn config_in(module_dir: PathBuf) -> BuildConfig {
    BuildConfig {
        module_dir,
        output: PathBuf::from("dist/s2-bindings.js"),
        ..BuildConfig::default()
    }
}
