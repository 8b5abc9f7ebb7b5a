//! The Python generation strategy.
//!
//! External dependencies come from pinned requirements lock files, each
//! registered as `path/to/requirements_lock.txt@repository_name` and keyed
//! by `@repository_name//<package>` labels (dashes become underscores).
//! Requirements lockfiles only carry direct `via` edges, so transitive
//! closures are empty for this ecosystem.

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::core::RelgenError;
use crate::generate::{GenerationContext, GenerationStrategy, ManifestGenerator};
use crate::label::Label;
use crate::lockfile::requirements::{PythonRequirement, parse_requirements_lock};
use crate::metadata::artifact::ArtifactDef;

pub struct PyGenerationStrategy {
    repository_root: PathBuf,
    locked_requirements_paths: Vec<String>,
    label_to_ext_dep: HashMap<Label, Arc<PythonRequirement>>,
}

impl PyGenerationStrategy {
    pub fn new(repository_root: &Path, config: &Config) -> Self {
        Self {
            repository_root: repository_root.to_path_buf(),
            locked_requirements_paths: config.general.locked_requirements_paths.clone(),
            label_to_ext_dep: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.label_to_ext_dep.clear();
    }

    fn known_requirements(&self) -> String {
        let mut labels: Vec<String> =
            self.label_to_ext_dep.keys().map(Label::canonical_form).collect();
        labels.sort_unstable();
        labels.join(", ")
    }
}

impl GenerationStrategy for PyGenerationStrategy {
    type Dep = PythonRequirement;
    type Generator = PyProjectGenerator;

    fn initialize(&mut self) -> Result<()> {
        for configured_path in &self.locked_requirements_paths {
            // path/to/requirements_lock.txt@repository_name
            let (rel_path, repository_name) = configured_path
                .split_once('@')
                .filter(|(path, name)| !path.is_empty() && !name.is_empty())
                .ok_or_else(|| RelgenError::ConfigError {
                    reason: format!(
                        "specify the path to the requirements lock file, followed by \"@repository_name\", for example tools/pip/requirements_lock.txt@pip - got [{configured_path}]"
                    ),
                })?;
            let path = self.repository_root.join(rel_path);
            if !path.exists() {
                return Err(RelgenError::PathNotFound {
                    kind: "requirements lock file",
                    path: path.to_string_lossy().into_owned(),
                }
                .into());
            }
            debug!("Parsing locked file [{}]", path.display());
            let content = std::fs::read_to_string(&path).map_err(RelgenError::from)?;
            for (dependency, _directs) in parse_requirements_lock(&content)? {
                let label_name = dependency.name().replace('-', "_");
                let label = Label::new(&format!("@{repository_name}//{label_name}"))?;
                debug!("  {label}->{dependency}");
                self.label_to_ext_dep.insert(label, dependency);
            }
        }
        Ok(())
    }

    fn metadata_path(&self) -> &'static str {
        "md/pyproject.in"
    }

    fn manifest_file_extension(&self) -> &'static str {
        "toml"
    }

    fn load_dependency(
        &self,
        label: &Label,
        artifact_def: Option<&Arc<ArtifactDef>>,
    ) -> Result<Arc<PythonRequirement>> {
        if label.is_source_ref() {
            let def = artifact_def.ok_or_else(|| RelgenError::MissingArtifactDef {
                label: label.canonical_form(),
            })?;
            Ok(Arc::new(PythonRequirement::new(
                &def.artifact_id,
                &def.version,
            )))
        } else {
            self.label_to_ext_dep.get(label).cloned().ok_or_else(|| {
                RelgenError::UnknownExternalDependency {
                    label: label.canonical_form(),
                    known: self.known_requirements(),
                }
                .into()
            })
        }
    }

    /// Requirements lockfiles only carry direct edges; there is no closure
    /// to look up for the Python ecosystem.
    fn load_transitive_closure(&self, _dependency: &PythonRequirement) -> Vec<Arc<PythonRequirement>> {
        Vec::new()
    }

    fn load_external_dependencies(&self) -> Vec<Arc<PythonRequirement>> {
        let mut dependencies: Vec<Arc<PythonRequirement>> =
            self.label_to_ext_dep.values().cloned().collect();
        dependencies.sort_by(|a, b| a.name().cmp(b.name()));
        dependencies
    }

    fn new_generator(
        &self,
        context: &GenerationContext<PythonRequirement>,
    ) -> Result<PyProjectGenerator> {
        let mut dependencies = context.direct_dependencies()?.to_vec();
        dependencies.sort_by(|a, b| a.name().cmp(b.name()));
        // the closures are validated here even though pyproject output does
        // not embed transitive pins
        context.artifact_transitive_closure()?;
        context.library_transitive_closure()?;
        let artifact_def = context.artifact_def();
        Ok(PyProjectGenerator {
            name: artifact_def.artifact_id.clone(),
            version: artifact_def.version.clone(),
            dependencies,
        })
    }
}

/// Renders a pyproject skeleton with a pinned dependencies list.
pub struct PyProjectGenerator {
    name: String,
    version: String,
    dependencies: Vec<Arc<PythonRequirement>>,
}

impl ManifestGenerator for PyProjectGenerator {
    fn generate(&self) -> Result<String> {
        let dependencies = if self.dependencies.is_empty() {
            "dependencies = []".to_string()
        } else {
            let lines: Vec<String> = self
                .dependencies
                .iter()
                .map(|d| format!("    \"{}\",", d.to_pyproject_format()))
                .collect();
            format!("dependencies = [\n{}\n]", lines.join("\n"))
        };
        Ok(format!(
            "[build-system]\nrequires = [\"setuptools>=61.0\", \"wheel\"]\nbuild-backend = \"setuptools.build_meta\"\n\n[project]\nname = \"{}\"\nversion = \"{}\"\n{}\nrequires-python = \">=3.11\"\n",
            self.name, self.version, dependencies
        ))
    }
}
