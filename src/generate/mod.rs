//! Strategy dispatch: resolving labels to dependency nodes and handing
//! fully-populated dependency sets to manifest generators.
//!
//! A [`GenerationStrategy`] ties the label model to the parsed lockfile
//! graph for one ecosystem. The (external) crawler walks the build packages,
//! resolves each declared dependency label through
//! [`GenerationStrategy::load_dependency`], fills a [`GenerationContext`]
//! with the three dependency sets of a package, and asks the strategy for a
//! generator. Generator internals (template substitution) stay out of this
//! crate; the contract is only that a generator receives the three sets and
//! returns manifest text.

pub mod maven;
pub mod python;

use anyhow::Result;
use std::sync::Arc;

use crate::core::RelgenError;
use crate::label::Label;
use crate::metadata::artifact::ArtifactDef;

pub use maven::MavenGenerationStrategy;
pub use python::PyGenerationStrategy;

/// Produces manifest text for one package from registered dependency sets.
pub trait ManifestGenerator {
    fn generate(&self) -> Result<String>;
}

/// Resolution and generation for one external-dependency ecosystem.
pub trait GenerationStrategy {
    /// The ecosystem's dependency node type.
    type Dep;
    type Generator: ManifestGenerator;

    /// One-time setup: parses all configured lockfiles and populates the
    /// metadata registry. Must be called before any load operation.
    fn initialize(&mut self) -> Result<()>;

    /// Path, relative to a package directory, of the metadata file that
    /// marks a package as belonging to this strategy.
    fn metadata_path(&self) -> &'static str;

    /// File extension of generated manifests.
    fn manifest_file_extension(&self) -> &'static str;

    /// Resolves a label to a dependency node.
    ///
    /// Source refs build a source dependency from the given artifact
    /// definition (required for them); any other label must resolve to a
    /// known external dependency, or the resolution fails listing all known
    /// external dependencies.
    fn load_dependency(
        &self,
        label: &Label,
        artifact_def: Option<&Arc<ArtifactDef>>,
    ) -> Result<Arc<Self::Dep>>;

    /// The transitive closure of the given dependency. Empty for
    /// dependencies without registered closures.
    fn load_transitive_closure(&self, dependency: &Self::Dep) -> Vec<Arc<Self::Dep>>;

    /// All external dependencies parsed out of the configured lockfiles.
    fn load_external_dependencies(&self) -> Vec<Arc<Self::Dep>>;

    /// Builds a manifest generator for one package, moving the context's
    /// registered direct dependencies, artifact-level transitive closure and
    /// library-level transitive closure into it.
    fn new_generator(&self, context: &GenerationContext<Self::Dep>) -> Result<Self::Generator>;
}

/// Per-package generation state: the label and artifact definition of a
/// crawled package, plus the three dependency sets the crawler registers
/// before a generator is built.
#[derive(Debug)]
pub struct GenerationContext<D> {
    label: Label,
    artifact_def: Arc<ArtifactDef>,
    direct_dependencies: Option<Vec<Arc<D>>>,
    artifact_transitive_closure: Option<Vec<Arc<D>>>,
    library_transitive_closure: Option<Vec<Arc<D>>>,
}

impl<D> GenerationContext<D> {
    pub fn new(label: Label, artifact_def: Arc<ArtifactDef>) -> Self {
        Self {
            label,
            artifact_def,
            direct_dependencies: None,
            artifact_transitive_closure: None,
            library_transitive_closure: None,
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn artifact_def(&self) -> &Arc<ArtifactDef> {
        &self.artifact_def
    }

    /// Registers the dependencies this package references explicitly.
    pub fn register_direct_dependencies(&mut self, dependencies: Vec<Arc<D>>) {
        self.direct_dependencies = Some(dependencies);
    }

    /// Registers the transitive closure of the package's artifact.
    pub fn register_artifact_transitive_closure(&mut self, dependencies: Vec<Arc<D>>) {
        self.artifact_transitive_closure = Some(dependencies);
    }

    /// Registers the transitive closure of the library the package belongs
    /// to.
    pub fn register_library_transitive_closure(&mut self, dependencies: Vec<Arc<D>>) {
        self.library_transitive_closure = Some(dependencies);
    }

    pub fn direct_dependencies(&self) -> Result<&[Arc<D>], RelgenError> {
        self.registered(&self.direct_dependencies, "direct dependencies")
    }

    pub fn artifact_transitive_closure(&self) -> Result<&[Arc<D>], RelgenError> {
        self.registered(
            &self.artifact_transitive_closure,
            "its artifact transitive closure",
        )
    }

    pub fn library_transitive_closure(&self) -> Result<&[Arc<D>], RelgenError> {
        self.registered(
            &self.library_transitive_closure,
            "its library transitive closure",
        )
    }

    fn registered<'a>(
        &self,
        set: &'a Option<Vec<Arc<D>>>,
        missing: &'static str,
    ) -> Result<&'a [Arc<D>], RelgenError> {
        set.as_deref()
            .ok_or_else(|| RelgenError::IncompleteGenerationContext {
                package: self.artifact_def.package.clone(),
                missing,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Dependency;

    #[test]
    fn test_context_requires_registration() {
        let def = Arc::new(ArtifactDef::new("g", "a", "1.0", "p1"));
        let label = Label::new("//p1").unwrap();
        let mut context: GenerationContext<Dependency> = GenerationContext::new(label, def);

        assert!(context.direct_dependencies().is_err());
        context.register_direct_dependencies(vec![]);
        assert!(context.direct_dependencies().is_ok());

        assert!(context.artifact_transitive_closure().is_err());
        context.register_artifact_transitive_closure(vec![]);
        assert!(context.artifact_transitive_closure().is_ok());

        assert!(context.library_transitive_closure().is_err());
        context.register_library_transitive_closure(vec![]);
        assert!(context.library_transitive_closure().is_ok());
    }
}
