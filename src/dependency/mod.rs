//! The unified dependency node model.
//!
//! A [`Dependency`] is a node in the resolved graph. It comes in exactly two
//! flavors behind one capability surface:
//!
//! - [`ExternalDependency`] - an artifact pinned in an external-dependency
//!   lockfile, identified by Maven coordinates and addressed in build files
//!   through a `@namespace//:group_artifact` label
//! - [`SourceDependency`] - an artifact built from source in the same
//!   repository, backed by a parsed [`ArtifactDef`]
//!
//! Equality and hashing use `(group_id, artifact_id, classifier)` across both
//! flavors - version and packaging are deliberately excluded, which is what
//! lockfile conflict-resolution lookups and closure deduplication rely on.
//! Graph ownership: nodes are created by the lockfile graph builder and
//! shared as `Arc<Dependency>`; the registry and the strategies hold clones
//! of the `Arc`, never diverging copies.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::RelgenError;
use crate::metadata::artifact::ArtifactDef;

const DEFAULT_PACKAGING: &str = "jar";

/// A node in the dependency graph.
#[derive(Debug, Clone)]
pub enum Dependency {
    External(ExternalDependency),
    Source(SourceDependency),
}

/// An artifact pinned in an external-dependency lockfile.
#[derive(Debug, Clone)]
pub struct ExternalDependency {
    /// The lockfile namespace this artifact was pinned in, without the
    /// leading `@`. None for dependencies built outside any namespace (tests
    /// mostly).
    namespace: Option<String>,
    group_id: String,
    artifact_id: String,
    version: String,
    packaging: String,
    classifier: Option<String>,
    scope: Option<String>,
}

impl ExternalDependency {
    /// Parses a Maven coordinate string:
    /// `group:artifact:version`, `group:artifact:packaging:version` or
    /// `group:artifact:packaging:classifier:version`.
    pub fn from_coordinate(
        coordinate: &str,
        namespace: Option<&str>,
    ) -> Result<ExternalDependency, RelgenError> {
        let segments: Vec<&str> = coordinate.split(':').collect();
        let (group_id, artifact_id, packaging, classifier, version) = match segments.as_slice() {
            // com.google.guava:guava:20.0
            [g, a, v] => (*g, *a, DEFAULT_PACKAGING, None, *v),
            // com.squareup:javapoet:jar:1.11.1
            [g, a, p, v] => (*g, *a, *p, None, *v),
            // com.grail.servicelibs:dynamic-keystore-impl:jar:tests:2.0.39
            [g, a, p, c, v] => (*g, *a, *p, Some(*c), *v),
            _ => {
                return Err(RelgenError::InvalidCoordinate {
                    coordinate: coordinate.to_string(),
                });
            }
        };
        let version = version.trim();
        if version.is_empty() {
            // version is always specified for external dependencies
            return Err(RelgenError::InvalidVersion {
                coordinate: coordinate.to_string(),
            });
        }
        Ok(ExternalDependency {
            namespace: namespace.map(|ns| ns.trim_start_matches('@').to_string()),
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            packaging: packaging.to_string(),
            classifier: classifier.map(str::to_string),
            scope: None,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn packaging(&self) -> &str {
        &self.packaging
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn set_scope(&mut self, scope: Option<&str>) {
        self.scope = scope.map(str::to_string);
    }

    /// A name based on the Maven coordinates. The packaging is included
    /// whenever it is needed to keep the segments unambiguous.
    pub fn maven_coordinates_name(&self) -> String {
        match (&self.classifier, self.packaging.as_str()) {
            (Some(classifier), _) => format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.packaging, classifier
            ),
            (None, DEFAULT_PACKAGING) => format!("{}:{}", self.group_id, self.artifact_id),
            (None, packaging) => {
                format!("{}:{}:{}", self.group_id, self.artifact_id, packaging)
            }
        }
    }

    /// The label target name without the namespace prefix, used for
    /// cross-namespace matching.
    pub fn unqualified_label(&self) -> String {
        let mut name = format!(
            "{}_{}",
            sanitize_label_segment(&self.group_id),
            sanitize_label_segment(&self.artifact_id)
        );
        if self.packaging != DEFAULT_PACKAGING {
            name.push('_');
            name.push_str(&sanitize_label_segment(&self.packaging));
        }
        if let Some(classifier) = &self.classifier {
            name.push('_');
            name.push_str(&sanitize_label_segment(classifier));
        }
        name
    }

    /// The fully-qualified label this artifact is addressed by in build
    /// files, eg `@maven//:com_google_guava_guava`.
    pub fn bazel_label(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("@{}//:{}", namespace, self.unqualified_label()),
            None => self.unqualified_label(),
        }
    }
}

/// An artifact built from source in this repository.
#[derive(Debug, Clone)]
pub struct SourceDependency {
    artifact_def: Arc<ArtifactDef>,
    target: Option<String>,
}

impl SourceDependency {
    pub fn new(artifact_def: Arc<ArtifactDef>) -> SourceDependency {
        SourceDependency {
            artifact_def,
            target: None,
        }
    }

    /// A source dependency pointing at a specific (non-default) target.
    pub fn with_target(artifact_def: Arc<ArtifactDef>, target: &str) -> SourceDependency {
        SourceDependency {
            artifact_def,
            target: Some(target.to_string()),
        }
    }

    pub fn artifact_def(&self) -> &Arc<ArtifactDef> {
        &self.artifact_def
    }

    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.artifact_def.target)
    }
}

impl Dependency {
    pub fn from_coordinate(
        coordinate: &str,
        namespace: Option<&str>,
    ) -> Result<Arc<Dependency>, RelgenError> {
        Ok(Arc::new(Dependency::External(
            ExternalDependency::from_coordinate(coordinate, namespace)?,
        )))
    }

    pub fn from_artifact_def(artifact_def: Arc<ArtifactDef>) -> Arc<Dependency> {
        Arc::new(Dependency::Source(SourceDependency::new(artifact_def)))
    }

    pub fn group_id(&self) -> &str {
        match self {
            Dependency::External(d) => &d.group_id,
            Dependency::Source(d) => &d.artifact_def.group_id,
        }
    }

    pub fn artifact_id(&self) -> &str {
        match self {
            Dependency::External(d) => &d.artifact_id,
            Dependency::Source(d) => &d.artifact_def.artifact_id,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Dependency::External(d) => &d.version,
            Dependency::Source(d) => d.artifact_def.effective_version(),
        }
    }

    pub fn classifier(&self) -> Option<&str> {
        match self {
            Dependency::External(d) => d.classifier(),
            Dependency::Source(_) => None,
        }
    }

    pub fn scope(&self) -> Option<&str> {
        match self {
            Dependency::External(d) => d.scope(),
            Dependency::Source(_) => None,
        }
    }

    /// Whether this dependency references an already-released artifact
    /// rather than the source tree.
    pub fn external(&self) -> bool {
        match self {
            Dependency::External(_) => true,
            Dependency::Source(d) => d.artifact_def.uses_previously_released_artifact(),
        }
    }

    /// The build package this dependency lives in; None for artifacts that
    /// are not built out of the monorepo.
    pub fn bazel_package(&self) -> Option<&str> {
        match self {
            Dependency::External(_) => None,
            Dependency::Source(d) => Some(&d.artifact_def.package),
        }
    }

    pub fn bazel_target(&self) -> Option<&str> {
        match self {
            Dependency::External(_) => None,
            Dependency::Source(d) => Some(d.target()),
        }
    }

    /// Whether this dependency references a release artifact at all, or is
    /// only traversed on the way to ones that do.
    pub fn references_artifact(&self) -> bool {
        match self {
            Dependency::External(_) => true,
            Dependency::Source(d) => d.artifact_def.generation_mode.produces_artifact(),
        }
    }

    /// Whether the build system builds this dependency from source.
    pub fn bazel_buildable(&self) -> bool {
        match self {
            Dependency::External(_) => false,
            Dependency::Source(d) => {
                let template = d.artifact_def.custom_template_content.as_deref().unwrap_or("");
                d.artifact_def.generation_mode.bazel_produced_artifact(template)
            }
        }
    }

    /// The fully-qualified label used in build files; None for source
    /// dependencies, whose identity is their package.
    pub fn bazel_label(&self) -> Option<String> {
        match self {
            Dependency::External(d) => Some(d.bazel_label()),
            Dependency::Source(_) => None,
        }
    }

    /// The label without the namespace prefix, for cross-namespace matching.
    pub fn unqualified_label(&self) -> Option<String> {
        match self {
            Dependency::External(d) => Some(d.unqualified_label()),
            Dependency::Source(_) => None,
        }
    }

    pub fn maven_coordinates_name(&self) -> String {
        match self {
            Dependency::External(d) => d.maven_coordinates_name(),
            Dependency::Source(d) => format!(
                "{}:{}",
                d.artifact_def.group_id, d.artifact_def.artifact_id
            ),
        }
    }

    /// Sort key for manifest emission: monorepo artifacts first, then by
    /// coordinates.
    pub fn ordering_key(&self) -> (bool, String, String, String, String, String) {
        (
            self.bazel_package().is_none(),
            self.group_id().to_string(),
            self.artifact_id().to_string(),
            match self {
                Dependency::External(d) => d.packaging.clone(),
                Dependency::Source(_) => String::new(),
            },
            self.classifier().unwrap_or("").to_string(),
            self.scope().unwrap_or("").to_string(),
        )
    }
}

fn sanitize_label_segment(segment: &str) -> String {
    segment.replace(['.', '-'], "_")
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.group_id() == other.group_id()
            && self.artifact_id() == other.artifact_id()
            && self.classifier() == other.classifier()
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id().hash(state);
        self.artifact_id().hash(state);
        self.classifier().hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.references_artifact() {
            write!(f, "{}", self.maven_coordinates_name())
        } else {
            write!(f, "{} (ref)", self.bazel_package().unwrap_or("?"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genmode::GenerationMode;

    #[test]
    fn test_three_coordinates() {
        let dep = ExternalDependency::from_coordinate("com.google.guava:guava:20.0", Some("name"))
            .unwrap();
        assert_eq!("com.google.guava", dep.group_id());
        assert_eq!("guava", dep.artifact_id());
        assert_eq!("20.0", dep.version());
        assert_eq!(None, dep.classifier());
        assert_eq!("jar", dep.packaging());
        assert_eq!(None, dep.scope());
    }

    #[test]
    fn test_four_coordinates() {
        let dep = ExternalDependency::from_coordinate(
            "com.grail.log-tokenizer:core-log-tokenizer-api:jar:0.0.21",
            Some("name"),
        )
        .unwrap();
        assert_eq!("com.grail.log-tokenizer", dep.group_id());
        assert_eq!("core-log-tokenizer-api", dep.artifact_id());
        assert_eq!("0.0.21", dep.version());
        assert_eq!(None, dep.classifier());
        assert_eq!("jar", dep.packaging());
    }

    #[test]
    fn test_five_coordinates() {
        let dep = ExternalDependency::from_coordinate(
            "com.grail.servicelibs:dynamic-keystore-impl:jar:tests:2.0.39",
            Some("name"),
        )
        .unwrap();
        assert_eq!("com.grail.servicelibs", dep.group_id());
        assert_eq!("dynamic-keystore-impl", dep.artifact_id());
        assert_eq!("2.0.39", dep.version());
        assert_eq!(Some("tests"), dep.classifier());
        assert_eq!("jar", dep.packaging());
    }

    #[test]
    fn test_names() {
        let dep = ExternalDependency::from_coordinate("group:art:ver", Some("maven")).unwrap();
        assert_eq!("group:art", dep.maven_coordinates_name());
        assert_eq!("@maven//:group_art", dep.bazel_label());
        assert_eq!("group_art", dep.unqualified_label());
    }

    #[test]
    fn test_names_without_namespace() {
        let dep = ExternalDependency::from_coordinate("group:art:ver", None).unwrap();
        assert_eq!("group_art", dep.bazel_label());
        assert_eq!("group_art", dep.unqualified_label());
    }

    #[test]
    fn test_names_namespace_with_leading_at() {
        let dep = ExternalDependency::from_coordinate("group:art:ver", Some("@maven")).unwrap();
        assert_eq!("@maven//:group_art", dep.bazel_label());
    }

    #[test]
    fn test_names_with_packaging() {
        let dep =
            ExternalDependency::from_coordinate("group:art:packaging:version", Some("maven"))
                .unwrap();
        assert_eq!("group:art:packaging", dep.maven_coordinates_name());
        assert_eq!("@maven//:group_art_packaging", dep.bazel_label());
        assert_eq!("group_art_packaging", dep.unqualified_label());
    }

    #[test]
    fn test_names_with_packaging_and_classifier() {
        let dep =
            ExternalDependency::from_coordinate("group:art:pack:class:version", Some("mvn"))
                .unwrap();
        assert_eq!("group:art:pack:class", dep.maven_coordinates_name());
        assert_eq!("@mvn//:group_art_pack_class", dep.bazel_label());
        assert_eq!("group_art_pack_class", dep.unqualified_label());
    }

    #[test]
    fn test_names_with_classifier_and_default_packaging() {
        let dep =
            ExternalDependency::from_coordinate("group:art:jar:class:1.0.0", Some("name")).unwrap();
        assert_eq!("group:art:jar:class", dep.maven_coordinates_name());
        assert_eq!("@name//:group_art_class", dep.bazel_label());
        assert_eq!("group_art_class", dep.unqualified_label());
    }

    #[test]
    fn test_label_sanitizes_dots_and_dashes() {
        let dep = ExternalDependency::from_coordinate(
            "org.springframework:spring-jcl:5.3.0",
            Some("maven"),
        )
        .unwrap();
        assert_eq!(
            "@maven//:org_springframework_spring_jcl",
            dep.bazel_label()
        );
    }

    #[test]
    fn test_unparsable_coordinate() {
        assert!(ExternalDependency::from_coordinate("group:artifact", Some("n")).is_err());
    }

    #[test]
    fn test_empty_version() {
        let err = ExternalDependency::from_coordinate(
            "org.glassfish.jersey.ext:jersey-bean-validation:",
            Some("n"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid version"));
    }

    #[test]
    fn test_external_capability_surface() {
        let dep = Dependency::from_coordinate("group:art:ver", Some("name")).unwrap();
        assert!(dep.external());
        assert!(dep.references_artifact());
        assert!(!dep.bazel_buildable());
        assert_eq!(None, dep.bazel_package());
    }

    #[test]
    fn test_source_dependency_defaults() {
        let def = Arc::new(ArtifactDef::new("g1", "a1", "1.1.0", "pack1"));
        let dep = Dependency::from_artifact_def(def);
        assert_eq!("g1", dep.group_id());
        assert_eq!("a1", dep.artifact_id());
        assert_eq!("1.1.0", dep.version());
        assert_eq!(Some("pack1"), dep.bazel_package());
        assert_eq!(Some("pack1"), dep.bazel_target());
        assert!(!dep.external());
        assert_eq!(None, dep.bazel_label());
    }

    #[test]
    fn test_source_dependency_released_artifact() {
        let mut def = ArtifactDef::new("g1", "a1", "1.1.0", "pack1");
        def.requires_release = Some(false);
        def.released_version = Some("1.2.3".to_string());
        let dep = Dependency::from_artifact_def(Arc::new(def));
        assert_eq!("1.2.3", dep.version());
        assert!(dep.external());
    }

    #[test]
    fn test_source_dependency_references_artifact_by_mode() {
        for (mode, expected) in [
            (GenerationMode::Skip, false),
            (GenerationMode::Dynamic, true),
            (GenerationMode::Template, true),
        ] {
            let mut def = ArtifactDef::new("g1", "a1", "1.1.0", "pack1/pack2");
            def.generation_mode = mode;
            let dep = Dependency::from_artifact_def(Arc::new(def));
            assert_eq!(expected, dep.references_artifact(), "mode {mode}");
        }
    }

    #[test]
    fn test_bazel_buildable() {
        let mut def = ArtifactDef::new("g1", "a1", "1.0", "pack1");
        def.generation_mode = GenerationMode::Skip;
        assert!(!Dependency::from_artifact_def(Arc::new(def.clone())).bazel_buildable());

        def.generation_mode = GenerationMode::Dynamic;
        assert!(Dependency::from_artifact_def(Arc::new(def.clone())).bazel_buildable());

        def.generation_mode = GenerationMode::Template;
        def.custom_template_content = Some("<packaging>pom</packaging>".to_string());
        assert!(!Dependency::from_artifact_def(Arc::new(def.clone())).bazel_buildable());

        def.custom_template_content = Some("<packaging>maven-plugin</packaging>".to_string());
        assert!(Dependency::from_artifact_def(Arc::new(def)).bazel_buildable());
    }

    #[test]
    fn test_equality_ignores_version_and_packaging() {
        let dep1 = Dependency::from_coordinate("com.google.guava:guava:20.0", Some("name")).unwrap();
        let dep2 = Dependency::from_coordinate("com.google.guava:guava:100", Some("name")).unwrap();
        let dep3 = Dependency::from_coordinate("com.google.guava:guava:jar:20.0", Some("name"))
            .unwrap();
        assert_eq!(dep1, dep2);
        assert_eq!(dep1, dep3);

        let other =
            Dependency::from_coordinate("com.google.guava22:guava:20.0", Some("name")).unwrap();
        assert_ne!(dep1, other);
    }

    #[test]
    fn test_hash_set_dedup() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Dependency::from_coordinate("com.google.guava:guava:20.0", Some("n")).unwrap());
        set.insert(Dependency::from_coordinate("com.google.guava:guava:20.0", Some("n")).unwrap());
        set.insert(
            Dependency::from_coordinate("com.google.guava22:guava:20.0", Some("n")).unwrap(),
        );
        assert_eq!(2, set.len());
    }

    #[test]
    fn test_sort_order_monorepo_first() {
        let dep1 = Dependency::from_coordinate("com.google.guava:guava:20.0", Some("n")).unwrap();
        let dep2 = Dependency::from_coordinate("com.google.guava:zoouava:20.0", Some("n")).unwrap();
        let dep3 =
            Dependency::from_artifact_def(Arc::new(ArtifactDef::new("com.zoogle.guava", "art1", "1.0", "p1")));
        let dep4 =
            Dependency::from_artifact_def(Arc::new(ArtifactDef::new("com.google.guava", "art1", "1.0", "p2")));

        let mut deps = vec![dep3.clone(), dep2.clone(), dep1.clone(), dep4.clone()];
        deps.sort_by_key(|d| d.ordering_key());
        assert!(Arc::ptr_eq(&deps[0], &dep4));
        assert!(Arc::ptr_eq(&deps[1], &dep3));
        assert!(Arc::ptr_eq(&deps[2], &dep1));
        assert!(Arc::ptr_eq(&deps[3], &dep2));
    }

    #[test]
    fn test_sort_order_includes_classifier() {
        let dep1 = Dependency::from_coordinate("g:a:2.2.17", Some("n1")).unwrap();
        let dep2 = Dependency::from_coordinate("g:a:jar:idl:2.2.17", Some("n2")).unwrap();
        let dep3 = Dependency::from_coordinate("g:a:jar:aaa:2.2.17", Some("n3")).unwrap();
        let mut deps = vec![dep1.clone(), dep2.clone(), dep3.clone()];
        deps.sort_by_key(|d| d.ordering_key());
        assert!(Arc::ptr_eq(&deps[0], &dep1));
        assert!(Arc::ptr_eq(&deps[1], &dep3));
        assert!(Arc::ptr_eq(&deps[2], &dep2));
    }

    #[test]
    fn test_display() {
        let dep = Dependency::from_coordinate("group:art:1.0", Some("n")).unwrap();
        assert_eq!("group:art", format!("{dep}"));

        let mut def = ArtifactDef::new("g1", "a1", "1.0", "pack1");
        def.generation_mode = GenerationMode::Skip;
        let dep = Dependency::from_artifact_def(Arc::new(def));
        assert_eq!("pack1 (ref)", format!("{dep}"));
    }
}
