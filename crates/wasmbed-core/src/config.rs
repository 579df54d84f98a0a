//! Build configuration.
//!
//! Every field has a default matching the S2 bindings layout, so an empty
//! JSON object is a valid configuration.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::profile::{Profile, TargetDescriptor};
use crate::version::VersionGate;

pub const DEFAULT_REQUIRED_VERSION: &str = "0.33.0";
pub const DEFAULT_VERSION_TOKEN_INDEX: usize = 2;
pub const DEFAULT_CONSTANT_NAME: &str = "wasmSource";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory holding the Go module; commands run here and relative
    /// paths below resolve against it.
    pub module_dir: PathBuf,
    pub profile: Profile,
    /// Destination of the packaged JS module.
    pub output: PathBuf,
    pub constant_name: String,
    /// Keep the compiled binary here instead of a temporary directory.
    pub artifact_path: Option<PathBuf>,
    /// File name of the binary inside the temporary directory.
    pub artifact_name: String,
    pub required_version: String,
    pub version_token_index: usize,
    /// Dependency reconciliation command, program first.
    pub resolver: Vec<String>,
    /// Compiler program and any leading arguments.
    pub compiler: Vec<String>,
    pub target: TargetDescriptor,
    pub timeout_secs: Option<u64>,
    pub skip_tidy: bool,
    pub skip_version_check: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            module_dir: PathBuf::from("."),
            profile: Profile::default(),
            output: PathBuf::from("../dist/s2-bindings.js"),
            constant_name: DEFAULT_CONSTANT_NAME.into(),
            artifact_path: None,
            artifact_name: "s2-bindings.wasm".into(),
            required_version: DEFAULT_REQUIRED_VERSION.into(),
            version_token_index: DEFAULT_VERSION_TOKEN_INDEX,
            resolver: vec!["go".into(), "mod".into(), "tidy".into()],
            compiler: vec!["tinygo".into()],
            target: TargetDescriptor::default(),
            timeout_secs: None,
            skip_tidy: false,
            skip_version_check: false,
        }
    }
}

impl BuildConfig {
    /// Reject configurations that would fail only after commands ran.
    pub fn validate(&self) -> Result<()> {
        if self.resolver.is_empty() || self.resolver[0].is_empty() {
            return Err(PipelineError::Config("resolver command is empty".into()));
        }
        if self.compiler.is_empty() || self.compiler[0].is_empty() {
            return Err(PipelineError::Config("compiler command is empty".into()));
        }
        if !is_js_identifier(&self.constant_name) {
            return Err(PipelineError::Config(format!(
                "`{}` is not a valid JavaScript identifier",
                self.constant_name
            )));
        }
        if self.artifact_name.is_empty()
            || Path::new(&self.artifact_name).file_name() != Some(OsStr::new(&self.artifact_name))
        {
            return Err(PipelineError::Config(format!(
                "artifact name `{}` must be a plain file name",
                self.artifact_name
            )));
        }
        if self.required_version.trim().is_empty() {
            return Err(PipelineError::Config("required version is empty".into()));
        }
        if self.target.os.is_empty() || self.target.arch.is_empty() {
            return Err(PipelineError::Config(format!(
                "incomplete target `{}`",
                self.target
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(PipelineError::Config("timeout must be positive".into()));
        }
        Ok(())
    }

    /// Resolve `path` against the module directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.module_dir.join(path)
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve_path(&self.output)
    }

    pub fn kept_artifact_path(&self) -> Option<PathBuf> {
        self.artifact_path.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn version_gate(&self) -> VersionGate {
        VersionGate::new(self.required_version.clone(), self.version_token_index)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// ASCII subset of ECMAScript identifier syntax, excluding reserved words
/// that cannot follow `export const`.
pub fn is_js_identifier(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
        "function", "if", "import", "in", "instanceof", "let", "new", "null", "return", "static",
        "super", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while",
        "with", "yield",
    ];
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let head_ok = first.is_ascii_alphabetic() || first == '_' || first == '$';
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config: BuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BuildConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = serde_json::from_str::<BuildConfig>(r#"{"optimise": true}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn partial_json_overrides_selected_fields() {
        let config: BuildConfig = serde_json::from_str(
            r#"{"profile": "debug", "target": {"os": "wasip1", "arch": "wasm"}, "timeout_secs": 30}"#,
        )
        .unwrap();
        assert_eq!(config.profile, Profile::Debug);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.compiler, vec!["tinygo"]);
    }

    #[test]
    fn identifiers() {
        assert!(is_js_identifier("wasmSource"));
        assert!(is_js_identifier("_s2"));
        assert!(is_js_identifier("$wasm"));
        assert!(!is_js_identifier(""));
        assert!(!is_js_identifier("2fast"));
        assert!(!is_js_identifier("wasm-source"));
        assert!(!is_js_identifier("const"));
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let bad = |f: fn(&mut BuildConfig)| {
            let mut c = BuildConfig::default();
            f(&mut c);
            matches!(c.validate(), Err(PipelineError::Config(_)))
        };
        assert!(bad(|c| c.constant_name = "not valid".into()));
        assert!(bad(|c| c.compiler.clear()));
        assert!(bad(|c| c.resolver = vec![String::new()]));
        assert!(bad(|c| c.artifact_name = "dir/out.wasm".into()));
        assert!(bad(|c| c.required_version = " ".into()));
        assert!(bad(|c| c.target.arch.clear()));
        assert!(bad(|c| c.timeout_secs = Some(0)));
    }

    #[test]
    fn relative_paths_resolve_against_module_dir() {
        let config = BuildConfig {
            module_dir: PathBuf::from("/src/s2-bindings"),
            artifact_path: Some(PathBuf::from("/tmp/out.wasm")),
            ..BuildConfig::default()
        };
        assert_eq!(
            config.output_path(),
            PathBuf::from("/src/s2-bindings/../dist/s2-bindings.js")
        );
        assert_eq!(config.kept_artifact_path(), Some(PathBuf::from("/tmp/out.wasm")));
    }
}
