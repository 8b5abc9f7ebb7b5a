//! Run configuration.
//!
//! The config file is TOML with two sections:
//!
//! ```toml
//! [general]
//! maven_install_paths = ["tools/maven_install.json", "tools/extra_install.json"]
//! locked_requirements_paths = ["tools/pip/requirements_lock.txt@pip"]
//! override_file_paths = ["tools/overrides/*.bzl"]
//!
//! [artifact]
//! jar_classifier = "jdk11"
//! ```
//!
//! All paths are relative to the repository root. The config layer is a
//! read-only source of values; path expansion and file reading happen in the
//! lockfile modules.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::core::RelgenError;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub artifact: ArtifactConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Pinned Maven lockfile paths; glob patterns allowed, `-` prefix
    /// excludes a path from glob expansion.
    pub maven_install_paths: Vec<String>,
    /// Pinned Python requirements paths, each suffixed with
    /// `@repository_name`.
    pub locked_requirements_paths: Vec<String>,
    /// Override file paths (`.bzl`); glob patterns allowed.
    pub override_file_paths: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            maven_install_paths: vec!["maven_install.json".to_string()],
            locked_requirements_paths: Vec::new(),
            override_file_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// The classifier to use for jar artifacts built from source.
    pub jar_classifier: Option<String>,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, RelgenError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file [{}]", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file [{}]", path.display()))
    }
}
