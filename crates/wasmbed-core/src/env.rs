//! Explicit process environment handed to external commands.
//!
//! The inherited environment is captured once and passed by value, so the
//! compiler stage never reads or mutates global process state.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use crate::profile::{TargetDescriptor, TARGET_ARCH_VAR, TARGET_OS_VAR};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    pub fn inherit() -> Self {
        std::env::vars_os().collect()
    }

    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Override the target selection variables, keeping everything else.
    pub fn with_target(mut self, target: &TargetDescriptor) -> Self {
        self.set(TARGET_OS_VAR, &target.os);
        self.set(TARGET_ARCH_VAR, &target.arch);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (k, v) in iter {
            env.set(k, v);
        }
        env
    }
}
