//! Artifact packaging: wrap a compiled binary as a JS source module.
//!
//! The module is a single line, `export const <name> = "<base64>";`,
//! written atomically over the destination.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};

const EXPORT_PREFIX: &str = "export const ";

/// Render the module text for `bytes`.
pub fn render_module(constant_name: &str, bytes: &[u8]) -> String {
    format!(
        "{}{} = \"{}\";\n",
        EXPORT_PREFIX,
        constant_name,
        STANDARD.encode(bytes)
    )
}

/// Parse module text produced by [`render_module`], returning the constant
/// name and the decoded payload.
pub fn decode_module(text: &str) -> Result<(String, Vec<u8>)> {
    let invalid = |msg: &str| PipelineError::InvalidModule(msg.to_string());

    let line = text
        .strip_suffix('\n')
        .ok_or_else(|| invalid("missing trailing newline"))?;
    if line.contains('\n') {
        return Err(invalid("expected a single line"));
    }
    let rest = line
        .strip_prefix(EXPORT_PREFIX)
        .ok_or_else(|| invalid("missing `export const`"))?;
    let (name, literal) = rest
        .split_once(" = ")
        .ok_or_else(|| invalid("missing assignment"))?;
    let encoded = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix("\";"))
        .ok_or_else(|| invalid("payload is not a terminated string literal"))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| PipelineError::InvalidModule(format!("bad base64 payload: {}", e)))?;
    Ok((name.to_string(), bytes))
}

/// `sha256:<hex>` digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("sha256:{:x}", Sha256::digest(bytes))
}

/// Result of packaging one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedModule {
    pub path: PathBuf,
    pub artifact_size: usize,
    pub artifact_sha256: String,
    pub module_size: usize,
}

/// Read `artifact` whole, encode it and replace `destination`.
///
/// The text goes to a temporary file next to the destination and is then
/// renamed over it, so readers never observe a partial module.
pub fn package(artifact: &Path, destination: &Path, constant_name: &str) -> Result<PackagedModule> {
    let bytes = fs::read(artifact).map_err(|e| PipelineError::io(artifact, e))?;
    let module = render_module(constant_name, &bytes);
    write_atomic(destination, module.as_bytes())?;

    Ok(PackagedModule {
        path: destination.to_path_buf(),
        artifact_size: bytes.len(),
        artifact_sha256: sha256_hex(&bytes),
        module_size: module.len(),
    })
}

fn write_atomic(destination: &Path, contents: &[u8]) -> Result<()> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".wasmbed-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| PipelineError::io(dir, e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| PipelineError::io(tmp.path(), e))?;
    tmp.persist(destination)
        .map_err(|e| PipelineError::io(destination, e.error))?;
    Ok(())
}
