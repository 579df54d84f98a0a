//! Check that a packaged module embeds a given binary.

use std::path::Path;

use anyhow::{bail, Context, Result};
use wasmbed_core::package::{decode_module, sha256_hex};

/// Outcome of a successful verification.
#[derive(Debug, PartialEq, Eq, serde::Serialize)]
pub struct Verified {
    pub constant_name: String,
    pub size: usize,
    pub sha256: String,
}

pub fn verify_module(module: &Path, wasm: &Path) -> Result<Verified> {
    let text = std::fs::read_to_string(module)
        .with_context(|| format!("failed to read module '{}'", module.display()))?;
    let expected =
        std::fs::read(wasm).with_context(|| format!("failed to read binary '{}'", wasm.display()))?;
    let (constant_name, embedded) = decode_module(&text)
        .with_context(|| format!("failed to decode '{}'", module.display()))?;

    if embedded != expected {
        bail!(
            "'{}' embeds {} bytes ({}) but '{}' has {} bytes ({})",
            module.display(),
            embedded.len(),
            sha256_hex(&embedded),
            wasm.display(),
            expected.len(),
            sha256_hex(&expected)
        );
    }

    Ok(Verified {
        constant_name,
        size: embedded.len(),
        sha256: sha256_hex(&embedded),
    })
}
