//! The Maven generation strategy.
//!
//! Wires the configured pinned lockfiles, the override files and the
//! dependency metadata registry together: `initialize` builds the external
//! dependency graph once, registers every transitive closure, and keeps a
//! canonical-label lookup for `load_dependency`. The generator built by
//! `new_generator` renders a pom skeleton whose `<dependencies>` section is
//! driven entirely by the resolved dependency sets - classifier and
//! exclusions are resolved through the registry at construction time, so
//! the generator itself is plain data.

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::core::RelgenError;
use crate::dependency::Dependency;
use crate::generate::{GenerationContext, GenerationStrategy, ManifestGenerator};
use crate::label::Label;
use crate::lockfile::{MavenInstallInfo, OverrideFileInfo, parse_maven_install};
use crate::metadata::artifact::ArtifactDef;
use crate::registry::DependencyMetadata;

pub struct MavenGenerationStrategy {
    repository_root: PathBuf,
    install_info: MavenInstallInfo,
    overrides: BTreeMap<String, String>,
    registry: DependencyMetadata,
    label_to_ext_dep: HashMap<String, Arc<Dependency>>,
}

impl MavenGenerationStrategy {
    /// Builds the strategy from config. Override files are parsed here;
    /// lockfiles are parsed by `initialize`.
    pub fn new(repository_root: &Path, config: &Config) -> Result<Self> {
        let override_info =
            OverrideFileInfo::new(&config.general.override_file_paths, repository_root)?;
        Ok(Self {
            repository_root: repository_root.to_path_buf(),
            install_info: MavenInstallInfo::new(&config.general.maven_install_paths),
            overrides: override_info.label_to_overridden_fq_label().clone(),
            registry: DependencyMetadata::new(config.artifact.jar_classifier.as_deref()),
            label_to_ext_dep: HashMap::new(),
        })
    }

    pub fn dependency_metadata(&self) -> &DependencyMetadata {
        &self.registry
    }

    /// Registers manifest-level exclusions for a dependency, once per run.
    /// Exclusions are discovered by the crawler, not by lockfile parsing.
    pub fn register_exclusions(
        &mut self,
        dependency: &Arc<Dependency>,
        exclusions: Vec<Arc<Dependency>>,
    ) -> Result<(), RelgenError> {
        self.registry.register_exclusions(dependency, exclusions)
    }

    /// Resets all resolution state so the strategy can be initialized again
    /// within the same process.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.label_to_ext_dep.clear();
    }

    fn known_external_dependencies(&self) -> String {
        let mut labels: Vec<&str> = self.label_to_ext_dep.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels.join(", ")
    }
}

impl GenerationStrategy for MavenGenerationStrategy {
    type Dep = Dependency;
    type Generator = PomGenerator;

    fn initialize(&mut self) -> Result<()> {
        let names_and_paths = self.install_info.names_and_paths(&self.repository_root)?;
        for (dependency, transitives) in parse_maven_install(&names_and_paths, &self.overrides)? {
            let label = dependency.bazel_label().expect("external deps have labels");
            debug!("Registered dep {label}");
            self.registry.register_transitives(&dependency, transitives)?;
            self.label_to_ext_dep.insert(label, dependency);
        }
        Ok(())
    }

    fn metadata_path(&self) -> &'static str {
        "MVN-INF/BUILD.pom"
    }

    fn manifest_file_extension(&self) -> &'static str {
        "xml"
    }

    fn load_dependency(
        &self,
        label: &Label,
        artifact_def: Option<&Arc<ArtifactDef>>,
    ) -> Result<Arc<Dependency>> {
        if label.is_source_ref() {
            let def = artifact_def.ok_or_else(|| RelgenError::MissingArtifactDef {
                label: label.canonical_form(),
            })?;
            Ok(Dependency::from_artifact_def(Arc::clone(def)))
        } else {
            let canonical = label.canonical_form();
            self.label_to_ext_dep.get(&canonical).cloned().ok_or_else(|| {
                RelgenError::UnknownExternalDependency {
                    label: canonical,
                    known: self.known_external_dependencies(),
                }
                .into()
            })
        }
    }

    fn load_transitive_closure(&self, dependency: &Dependency) -> Vec<Arc<Dependency>> {
        self.registry.get_transitive_closure(dependency).to_vec()
    }

    fn load_external_dependencies(&self) -> Vec<Arc<Dependency>> {
        let mut dependencies: Vec<Arc<Dependency>> =
            self.label_to_ext_dep.values().cloned().collect();
        dependencies.sort_by_key(|d| d.ordering_key());
        dependencies
    }

    fn new_generator(&self, context: &GenerationContext<Dependency>) -> Result<PomGenerator> {
        let mut directs = context.direct_dependencies()?.to_vec();
        directs.sort_by_key(|d| d.ordering_key());
        let entries = directs
            .iter()
            .map(|dependency| PomDependencyEntry {
                group_id: dependency.group_id().to_string(),
                artifact_id: dependency.artifact_id().to_string(),
                version: dependency.version().to_string(),
                classifier: self.registry.get_classifier(dependency),
                scope: dependency.scope().map(str::to_string),
                exclusions: self
                    .registry
                    .get_transitive_exclusions(dependency)
                    .iter()
                    .map(|e| (e.group_id().to_string(), e.artifact_id().to_string()))
                    .collect(),
            })
            .collect();
        let artifact_def = context.artifact_def();
        Ok(PomGenerator {
            group_id: artifact_def.group_id.clone(),
            artifact_id: artifact_def.artifact_id.clone(),
            version: artifact_def.effective_version().to_string(),
            entries,
            artifact_transitive_closure: context.artifact_transitive_closure()?.to_vec(),
            library_transitive_closure: context.library_transitive_closure()?.to_vec(),
        })
    }
}

/// A fully-populated pom generator: one package's coordinates plus its
/// render-ready dependency entries.
pub struct PomGenerator {
    group_id: String,
    artifact_id: String,
    version: String,
    entries: Vec<PomDependencyEntry>,
    artifact_transitive_closure: Vec<Arc<Dependency>>,
    library_transitive_closure: Vec<Arc<Dependency>>,
}

struct PomDependencyEntry {
    group_id: String,
    artifact_id: String,
    version: String,
    classifier: Option<String>,
    scope: Option<String>,
    exclusions: Vec<(String, String)>,
}

impl PomGenerator {
    /// The transitive closure of the artifact, for consumers that compare
    /// generated manifests against previously released ones.
    pub fn artifact_transitive_closure(&self) -> &[Arc<Dependency>] {
        &self.artifact_transitive_closure
    }

    /// The transitive closure of the owning library.
    pub fn library_transitive_closure(&self) -> &[Arc<Dependency>] {
        &self.library_transitive_closure
    }
}

impl ManifestGenerator for PomGenerator {
    fn generate(&self) -> Result<String> {
        let mut pom = String::new();
        pom.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        pom.push_str(concat!(
            "<project xmlns=\"http://maven.apache.org/POM/4.0.0\" ",
            "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
            "xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 ",
            "http://maven.apache.org/xsd/maven-4.0.0.xsd\">\n"
        ));
        pom.push_str("    <modelVersion>4.0.0</modelVersion>\n\n");
        pom.push_str(&format!("    <groupId>{}</groupId>\n", self.group_id));
        pom.push_str(&format!("    <artifactId>{}</artifactId>\n", self.artifact_id));
        pom.push_str(&format!("    <version>{}</version>\n", self.version));
        if !self.entries.is_empty() {
            pom.push_str("\n    <dependencies>\n");
            for entry in &self.entries {
                entry.render(&mut pom);
            }
            pom.push_str("    </dependencies>\n");
        }
        pom.push_str("</project>\n");
        Ok(pom)
    }
}

impl PomDependencyEntry {
    fn render(&self, pom: &mut String) {
        pom.push_str("        <dependency>\n");
        pom.push_str(&format!("            <groupId>{}</groupId>\n", self.group_id));
        pom.push_str(&format!(
            "            <artifactId>{}</artifactId>\n",
            self.artifact_id
        ));
        pom.push_str(&format!("            <version>{}</version>\n", self.version));
        if let Some(classifier) = &self.classifier {
            pom.push_str(&format!(
                "            <classifier>{classifier}</classifier>\n"
            ));
        }
        if let Some(scope) = &self.scope {
            pom.push_str(&format!("            <scope>{scope}</scope>\n"));
        }
        if !self.exclusions.is_empty() {
            pom.push_str("            <exclusions>\n");
            for (group_id, artifact_id) in &self.exclusions {
                pom.push_str("                <exclusion>\n");
                pom.push_str(&format!(
                    "                    <groupId>{group_id}</groupId>\n"
                ));
                pom.push_str(&format!(
                    "                    <artifactId>{artifact_id}</artifactId>\n"
                ));
                pom.push_str("                </exclusion>\n");
            }
            pom.push_str("            </exclusions>\n");
        }
        pom.push_str("        </dependency>\n");
    }
}
