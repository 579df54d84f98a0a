//! Configuration loading: JSON file first, then command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use wasmbed_core::{BuildConfig, Profile};

/// Read a JSON build configuration. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<BuildConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    let config: BuildConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
    Ok(config)
}

/// Values given on the command line; `None`/`false` leaves the loaded
/// configuration alone.
#[derive(Debug, Default, Clone)]
pub struct BuildOverrides {
    pub module_dir: Option<PathBuf>,
    pub profile: Option<Profile>,
    pub output: Option<PathBuf>,
    pub constant_name: Option<String>,
    pub artifact_path: Option<PathBuf>,
    pub required_version: Option<String>,
    pub compiler: Option<String>,
    pub timeout_secs: Option<u64>,
    pub skip_tidy: bool,
    pub skip_version_check: bool,
}

impl BuildOverrides {
    pub fn apply(self, config: &mut BuildConfig) {
        if let Some(dir) = self.module_dir {
            config.module_dir = dir;
        }
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(name) = self.constant_name {
            config.constant_name = name;
        }
        if let Some(path) = self.artifact_path {
            config.artifact_path = Some(path);
        }
        if let Some(version) = self.required_version {
            config.required_version = version;
        }
        if let Some(program) = self.compiler {
            config.compiler = vec![program];
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = Some(secs);
        }
        config.skip_tidy |= self.skip_tidy;
        config.skip_version_check |= self.skip_version_check;
    }
}

/// Load `path` (or defaults) and apply `overrides` on top.
pub fn resolve_config(path: Option<&Path>, overrides: BuildOverrides) -> Result<BuildConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => BuildConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("configuration rejected")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_file() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("wasmbed.json");
        std::fs::write(
            &path,
            r#"{"profile": "debug", "constant_name": "s2Wasm", "compiler": ["sh", "tinygo.sh"]}"#,
        )
        .expect("write config");

        let config = resolve_config(
            Some(&path),
            BuildOverrides {
                profile: Some(Profile::ReleaseLeaking),
                skip_tidy: true,
                ..BuildOverrides::default()
            },
        )
        .expect("resolve config");

        assert_eq!(config.profile, Profile::ReleaseLeaking);
        assert_eq!(config.constant_name, "s2Wasm");
        assert_eq!(config.compiler, vec!["sh", "tinygo.sh"]);
        assert!(config.skip_tidy);
        assert!(!config.skip_version_check);
    }

    #[test]
    fn compiler_flag_replaces_whole_command() {
        let mut config = BuildConfig {
            compiler: vec!["sh".into(), "tinygo.sh".into()],
            ..BuildConfig::default()
        };
        BuildOverrides {
            compiler: Some("/opt/tinygo/bin/tinygo".into()),
            ..BuildOverrides::default()
        }
        .apply(&mut config);
        assert_eq!(config.compiler, vec!["/opt/tinygo/bin/tinygo"]);
    }

    #[test]
    fn no_file_means_defaults() {
        let config = resolve_config(None, BuildOverrides::default()).expect("defaults");
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ profile: ").expect("write config");

        let err = resolve_config(Some(&path), BuildOverrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = resolve_config(
            None,
            BuildOverrides {
                constant_name: Some("export".into()),
                ..BuildOverrides::default()
            },
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("not a valid JavaScript identifier"));
    }
}
