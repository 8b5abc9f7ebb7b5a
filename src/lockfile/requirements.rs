//! Pinned Python requirements lock file parsing.
//!
//! A requirements lock file pins `name==version` lines, each optionally
//! preceded by a `# via ...` comment group naming the requirements that
//! pulled it in. Hashes and `--` flag lines are ignored. The `via` comments
//! are the only edge information in the file, so the graph built here has
//! direct edges only - transitive closures for the Python ecosystem are
//! deliberately empty.

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::RelgenError;

/// A pinned Python package requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PythonRequirement {
    name: String,
    version: String,
    extras: Vec<String>,
}

impl PythonRequirement {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            extras: Vec::new(),
        }
    }

    pub fn with_extras(name: &str, version: &str, extras: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            extras,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// The dependency rendered for a pyproject dependencies list.
    pub fn to_pyproject_format(&self) -> String {
        if self.extras.is_empty() {
            format!("{}=={}", self.name, self.version)
        } else {
            format!("{}[{}]=={}", self.name, self.extras.join(","), self.version)
        }
    }
}

impl fmt::Display for PythonRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_pyproject_format())
    }
}

/// Parses requirements lock file content.
///
/// Returns, in file order, each requirement together with its direct
/// children - the requirements that name it in their `# via` comments.
pub fn parse_requirements_lock(
    content: &str,
) -> Result<Vec<(Arc<PythonRequirement>, Vec<Arc<PythonRequirement>>)>> {
    let mut order: Vec<String> = Vec::new();
    let mut name_to_requirement: HashMap<String, Arc<PythonRequirement>> = HashMap::new();
    let mut name_to_vias: HashMap<String, Vec<String>> = HashMap::new();
    // the requirement the current `# via` comment group belongs to
    let mut current_name: Option<String> = None;
    let mut in_via_group = false;

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("--") {
            // blank lines and pip flags (--hash continuation lines included)
        } else if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if let Some(via) = comment.strip_prefix("via") {
                let name = current_name
                    .clone()
                    .filter(|name| !name_to_vias.contains_key(name))
                    .ok_or_else(|| RelgenError::InvalidRequirementLine {
                        line: raw_line.to_string(),
                    })?;
                let mut vias = Vec::new();
                let via = via.trim();
                // "via -r path/to/requirements.in" means directly
                // referenced, no via
                if !via.is_empty() && !via.starts_with("-r ") {
                    vias.push(via.to_string());
                }
                name_to_vias.insert(name, vias);
                in_via_group = true;
            } else if in_via_group {
                if comment.starts_with("-r ") || comment.starts_with("The following") {
                    // continuation noise, not a via entry
                } else if let Some(name) = &current_name {
                    name_to_vias
                        .get_mut(name)
                        .expect("via group opened above")
                        .push(comment.to_string());
                }
            }
        } else {
            let (name, version) =
                parse_requirement_line(line).ok_or_else(|| RelgenError::InvalidRequirementLine {
                    line: raw_line.to_string(),
                })?;
            let (name, extras) = split_extras(name);
            if name_to_requirement.contains_key(&name) {
                return Err(RelgenError::DuplicateRequirement { name }.into());
            }
            let requirement = Arc::new(PythonRequirement::with_extras(&name, version, extras));
            order.push(name.clone());
            name_to_requirement.insert(name.clone(), requirement);
            current_name = Some(name);
            in_via_group = false;
        }
    }

    // attach children based on the via relationships
    let mut name_to_children: HashMap<String, Vec<Arc<PythonRequirement>>> = HashMap::new();
    let no_vias = Vec::new();
    for child_name in &order {
        for via in name_to_vias.get(child_name).unwrap_or(&no_vias) {
            let parent =
                name_to_requirement
                    .get(via)
                    .ok_or_else(|| RelgenError::UnknownViaReference {
                        name: child_name.clone(),
                        via: via.clone(),
                    })?;
            name_to_children
                .entry(parent.name().to_string())
                .or_default()
                .push(Arc::clone(&name_to_requirement[child_name]));
        }
    }

    Ok(order
        .into_iter()
        .map(|name| {
            let requirement = name_to_requirement.remove(&name).expect("inserted above");
            let children = name_to_children.remove(&name).unwrap_or_default();
            (requirement, children)
        })
        .collect())
}

fn parse_requirement_line(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.split_once("==")?;
    let version = rest.split_whitespace().next()?;
    Some((name, version))
}

fn split_extras(name: &str) -> (String, Vec<String>) {
    if let Some(stripped) = name.strip_suffix(']') {
        if let Some((base, extras)) = stripped.split_once('[') {
            let extras = extras.split(',').map(|e| e.trim().to_string()).collect();
            return (base.to_string(), extras);
        }
    }
    (name.to_string(), Vec::new())
}
