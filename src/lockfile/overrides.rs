//! Override file parsing.
//!
//! An override file redirects, for a whole run, every graph edge pointing at
//! one external dependency to another. The file is a `.bzl` fragment shaped
//! like a JSON object, with `#` line comments:
//!
//! ```text
//! # overrides for the spring upgrade
//! DEPS = {
//!     "org.springframework:spring-jcl": "@spring6//:org_springframework_spring_jcl",
//! }
//! ```
//!
//! Keys are normalized to unqualified label form: `:`, `-` and `.` become
//! `_`, except a `.` between two decimal digits, which is preserved
//! (`lang3` stays `lang3`, `2.5` stays `2.5`).

use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::RelgenError;

const OVERRIDE_FILE_SUFFIX: &str = ".bzl";

/// The run-level override mapping, parsed from the configured files.
#[derive(Debug, Default)]
pub struct OverrideFileInfo {
    label_to_fq_label: BTreeMap<String, String>,
}

impl OverrideFileInfo {
    /// Parses all configured override files, relative to the repository
    /// root. Glob patterns expand sorted; a missing non-glob path is a hard
    /// error.
    pub fn new(override_file_paths: &[String], repository_root: &Path) -> Result<Self> {
        let mut label_to_fq_label = BTreeMap::new();
        for path in names_and_paths(override_file_paths, repository_root)? {
            let content = std::fs::read_to_string(&path).map_err(RelgenError::from)?;
            let parsed = parse_override_content(&content)
                .map_err(|e| with_path(e, &path))?;
            label_to_fq_label.extend(parsed);
        }
        Ok(Self { label_to_fq_label })
    }

    /// Unqualified label -> fully-qualified label of the replacement.
    pub fn label_to_overridden_fq_label(&self) -> &BTreeMap<String, String> {
        &self.label_to_fq_label
    }
}

fn with_path(error: RelgenError, path: &Path) -> RelgenError {
    match error {
        RelgenError::MalformedOverrideFile { reason, .. } => RelgenError::MalformedOverrideFile {
            path: path.to_string_lossy().into_owned(),
            reason,
        },
        other => other,
    }
}

fn names_and_paths(paths: &[String], repository_root: &Path) -> Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    for rel_path in paths {
        let path = repository_root.join(rel_path);
        if let Some(path) = process_path(&path) {
            result.push(path);
        } else if rel_path.contains('*') {
            let pattern = path.to_string_lossy().into_owned();
            let mut globbed = Vec::new();
            for entry in glob::glob(&pattern).map_err(|e| RelgenError::ConfigError {
                reason: format!("invalid override path pattern [{rel_path}]: {e}"),
            })? {
                let candidate = entry.map_err(|e| RelgenError::ConfigError {
                    reason: format!("cannot expand [{rel_path}]: {e}"),
                })?;
                if let Some(path) = process_path(&candidate) {
                    globbed.push(path);
                }
            }
            globbed.sort();
            result.extend(globbed);
        } else {
            return Err(RelgenError::PathNotFound {
                kind: "override file",
                path: path.to_string_lossy().into_owned(),
            }
            .into());
        }
    }
    Ok(result)
}

fn process_path(path: &Path) -> Option<PathBuf> {
    if path.exists()
        && path
            .file_name()?
            .to_str()?
            .ends_with(OVERRIDE_FILE_SUFFIX)
    {
        return Some(path.to_path_buf());
    }
    None
}

/// Parses the `{ "dep": "overridden_dep", ... }` block out of override file
/// content, normalizing the keys.
pub(crate) fn parse_override_content(
    content: &str,
) -> Result<BTreeMap<String, String>, RelgenError> {
    // strip comments
    let without_comments = Regex::new("#.*\n").unwrap().replace_all(content, "");
    // everything between the first '{' and the first '}'
    let body = without_comments
        .split_once('{')
        .and_then(|(_, rest)| rest.split_once('}'))
        .map(|(body, _)| body)
        .ok_or_else(|| RelgenError::MalformedOverrideFile {
            path: String::new(),
            reason: "no { ... } block found".to_string(),
        })?;
    // normalize whitespace so the block parses as strict JSON
    let body = Regex::new("\":\\s+").unwrap().replace_all(body, "\":");
    let body = Regex::new(",\\s+").unwrap().replace_all(&body, ",");
    let body = body.trim().strip_suffix(',').unwrap_or(body.trim());
    let json = format!("{{{body}}}");
    let overrides: BTreeMap<String, String> =
        serde_json::from_str(&json).map_err(|e| RelgenError::MalformedOverrideFile {
            path: String::new(),
            reason: e.to_string(),
        })?;
    Ok(overrides
        .into_iter()
        .map(|(dep, overridden)| (normalize_key(&dep), overridden))
        .collect())
}

/// Replaces `:`, `-` and `.` with `_`, keeping a `.` that sits between two
/// decimal digits: `org.springframework:spring-jcl` becomes
/// `org_springframework_spring_jcl`, while a `2.5` in an artifact name
/// stays intact.
pub(crate) fn normalize_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut normalized = String::with_capacity(key.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            ':' | '-' => normalized.push('_'),
            '.' => {
                let prev_is_digit = i > 0 && chars[i - 1].is_ascii_digit();
                let next_is_digit = chars.get(i + 1).is_some_and(char::is_ascii_digit);
                if prev_is_digit && next_is_digit {
                    normalized.push('.');
                } else {
                    normalized.push('_');
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
