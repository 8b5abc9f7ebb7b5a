//! The dependency metadata registry.
//!
//! [`DependencyMetadata`] stores what cannot be discovered by crawling build
//! files: per external dependency, the transitive closure and the exclusions
//! parsed out of the pinned lockfiles. Keys are fully-qualified label
//! strings. Source dependencies have no label and are expected to be
//! unregistered - closure and exclusion queries for them return an empty
//! list silently.
//!
//! The registry is populated once per run during strategy initialization and
//! only read afterwards; call [`DependencyMetadata::clear`] before resolving
//! again in the same process.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::RelgenError;
use crate::dependency::Dependency;

#[derive(Debug, Default)]
pub struct DependencyMetadata {
    dep_to_transitives: HashMap<String, Vec<Arc<Dependency>>>,
    dep_to_exclusions: HashMap<String, Vec<Arc<Dependency>>>,
    key_to_dependency: HashMap<String, Arc<Dependency>>,
    jar_artifact_classifier: Option<String>,
}

impl DependencyMetadata {
    /// Creates a registry; `jar_artifact_classifier` is the run-level
    /// classifier configured for jars built from source.
    pub fn new(jar_artifact_classifier: Option<&str>) -> Self {
        Self {
            jar_artifact_classifier: jar_artifact_classifier.map(str::to_string),
            ..Self::default()
        }
    }

    /// The transitive closure of the given dependency.
    ///
    /// A no-op (empty result) for dependencies that are not registered -
    /// source dependencies in particular.
    pub fn get_transitive_closure(&self, dependency: &Dependency) -> &[Arc<Dependency>] {
        self.lookup(&self.dep_to_transitives, dependency)
    }

    /// The exclusions of the given dependency, in the manifest sense: nodes
    /// excluded from its transitive closure. Empty for unregistered keys.
    pub fn get_transitive_exclusions(&self, dependency: &Dependency) -> &[Arc<Dependency>] {
        self.lookup(&self.dep_to_exclusions, dependency)
    }

    fn lookup<'a>(
        &self,
        map: &'a HashMap<String, Vec<Arc<Dependency>>>,
        dependency: &Dependency,
    ) -> &'a [Arc<Dependency>] {
        dependency
            .bazel_label()
            .and_then(|key| map.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All registered dependencies whose closure contains a node with the
    /// given dependency's fully-qualified label.
    ///
    /// The match is on label identity rather than full structural equality,
    /// so it holds across dependencies from different lockfile namespaces
    /// that happen to share a label.
    pub fn get_ancestors(&self, dependency: &Dependency) -> Vec<Arc<Dependency>> {
        let label = dependency.bazel_label();
        let mut ancestors = Vec::new();
        for (key, transitives) in &self.dep_to_transitives {
            if transitives.iter().any(|t| t.bazel_label() == label) {
                ancestors.push(Arc::clone(&self.key_to_dependency[key]));
            }
        }
        ancestors
    }

    /// The classifier to emit for the given dependency: its own explicit
    /// classifier wins; otherwise the configured jar classifier applies, but
    /// only to dependencies the build system builds from source.
    pub fn get_classifier(&self, dependency: &Dependency) -> Option<String> {
        if let Some(classifier) = dependency.classifier() {
            return Some(classifier.to_string());
        }
        if dependency.bazel_buildable() {
            return self.jar_artifact_classifier.clone();
        }
        None
    }

    /// Registers the transitive closure for a dependency. Each external
    /// dependency registers exactly once per run.
    pub fn register_transitives(
        &mut self,
        dependency: &Arc<Dependency>,
        transitives: Vec<Arc<Dependency>>,
    ) -> Result<(), RelgenError> {
        let key = self.key_for(dependency)?;
        if self.dep_to_transitives.contains_key(&key) {
            return Err(RelgenError::DuplicateRegistration {
                key,
                dependency: dependency.to_string(),
            });
        }
        self.dep_to_transitives.insert(key.clone(), transitives);
        self.key_to_dependency.insert(key, Arc::clone(dependency));
        Ok(())
    }

    /// Registers the exclusions for a dependency, once per run.
    pub fn register_exclusions(
        &mut self,
        dependency: &Arc<Dependency>,
        exclusions: Vec<Arc<Dependency>>,
    ) -> Result<(), RelgenError> {
        let key = self.key_for(dependency)?;
        if self.dep_to_exclusions.contains_key(&key) {
            return Err(RelgenError::DuplicateRegistration {
                key,
                dependency: dependency.to_string(),
            });
        }
        self.dep_to_exclusions.insert(key, exclusions);
        Ok(())
    }

    /// Resets all internal state, for safe reuse across independent runs in
    /// one process.
    pub fn clear(&mut self) {
        self.dep_to_transitives.clear();
        self.dep_to_exclusions.clear();
        self.key_to_dependency.clear();
    }

    fn key_for(&self, dependency: &Dependency) -> Result<String, RelgenError> {
        dependency
            .bazel_label()
            .ok_or_else(|| RelgenError::UnkeyedDependency {
                dependency: dependency.to_string(),
            })
    }
}
