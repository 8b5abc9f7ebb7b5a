//! Expansion of configured pinned-lockfile paths.
//!
//! Configured paths are relative to the repository root and may be glob
//! patterns. The lockfile namespace is derived from the file name by
//! stripping the `_install.json` suffix, so `tools/maven_install.json`
//! yields the namespace `maven`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::core::RelgenError;

const INSTALL_FILE_SUFFIX: &str = "_install.json";

/// The configured pinned-lockfile locations.
#[derive(Debug, Default)]
pub struct MavenInstallInfo {
    maven_install_paths: Vec<String>,
}

impl MavenInstallInfo {
    pub fn new(maven_install_paths: &[String]) -> Self {
        Self {
            maven_install_paths: maven_install_paths.to_vec(),
        }
    }

    /// Returns `(namespace, path)` pairs for all configured lockfiles.
    ///
    /// Paths that start with `-` exclude their path from glob expansions.
    /// A non-glob path that does not point at a `*_install.json` file is a
    /// hard error; glob expansions are sorted for a predictable traversal
    /// order.
    pub fn names_and_paths(&self, repository_root: &Path) -> Result<Vec<(String, PathBuf)>> {
        let excluded_paths: Vec<&str> = self
            .maven_install_paths
            .iter()
            .filter(|p| p.starts_with('-'))
            .map(|p| p[1..].trim())
            .collect();
        let mut names_and_paths = Vec::new();
        for rel_path in &self.maven_install_paths {
            if rel_path.starts_with('-') {
                // exclusions are applied during glob expansion below
                continue;
            }
            let path = repository_root.join(rel_path);
            if let Some(name_and_path) = process_path(&path) {
                names_and_paths.push(name_and_path);
            } else if rel_path.contains('*') {
                let pattern = path.to_string_lossy().into_owned();
                let mut globbed = Vec::new();
                for entry in glob::glob(&pattern).map_err(|e| RelgenError::ConfigError {
                    reason: format!("invalid maven_install path pattern [{rel_path}]: {e}"),
                })? {
                    let candidate = entry.map_err(|e| RelgenError::ConfigError {
                        reason: format!("cannot expand [{rel_path}]: {e}"),
                    })?;
                    let rel = candidate
                        .strip_prefix(repository_root)
                        .unwrap_or(&candidate)
                        .to_string_lossy()
                        .into_owned();
                    if excluded_paths.contains(&rel.as_str()) {
                        continue;
                    }
                    if let Some(name_and_path) = process_path(&candidate) {
                        globbed.push(name_and_path);
                    }
                }
                globbed.sort();
                names_and_paths.extend(globbed);
            } else {
                return Err(RelgenError::PathNotFound {
                    kind: "maven_install json file",
                    path: path.to_string_lossy().into_owned(),
                }
                .into());
            }
        }
        Ok(names_and_paths)
    }
}

/// Returns `(namespace, path)` for a valid lockfile path, None otherwise.
fn process_path(path: &Path) -> Option<(String, PathBuf)> {
    if !path.exists() {
        return None;
    }
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.strip_suffix(INSTALL_FILE_SUFFIX)?;
    Some((name.to_string(), path.to_path_buf()))
}
