//! Generation modes: the per-package artifact-production policy.
//!
//! A package's metadata declares one of a closed set of modes. The mode
//! decides whether the package produces a release artifact at all, which
//! rule attributes denote dependencies to follow, and whether the build
//! system itself produces the artifact (as opposed to, say, a pom-only
//! template artifact).
//!
//! Modes are plain enum variants with a static behavior table - there is one
//! value per mode for the whole process and nothing about a mode is ever
//! mutated.

use crate::core::RelgenError;

/// The dependency attributes every mode follows.
const BASE_DEPENDENCY_ATTRIBUTES: [&str; 2] = ["deps", "runtime_deps"];
/// `skip` packages additionally forward their `exports`.
const SKIP_DEPENDENCY_ATTRIBUTES: [&str; 3] = ["deps", "runtime_deps", "exports"];

/// The artifact generation mode of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    /// The manifest is generated from scratch; the dynamic content is the
    /// dependencies section, based on build metadata.
    Dynamic,
    /// The manifest is generated from a custom template file only.
    Template,
    /// The package is skipped at generation time; its dependencies are
    /// pushed up to the closest ancestor package that produces an artifact.
    Skip,
    /// Like [`GenerationMode::Dynamic`], for a module using the build
    /// system's 1:1:1 layout (many child packages).
    Dynamic111,
    /// Marks a child package inside a 1:1:1 enabled module. Not selectable
    /// by name in metadata files.
    OneOneOneChild,
}

impl GenerationMode {
    /// The modes that may be set explicitly in package metadata files.
    pub const USER_SELECTABLE: [GenerationMode; 4] = [
        GenerationMode::Dynamic,
        GenerationMode::Template,
        GenerationMode::Skip,
        GenerationMode::Dynamic111,
    ];

    /// The default mode when the metadata does not specify one.
    pub const DEFAULT: GenerationMode = GenerationMode::Dynamic;

    /// Looks up a user-selectable mode by its metadata name. An unknown
    /// name is a hard error.
    pub fn from_name(name: &str) -> Result<GenerationMode, RelgenError> {
        for mode in Self::USER_SELECTABLE {
            if mode.name() == name {
                return Ok(mode);
            }
        }
        Err(RelgenError::UnknownGenerationMode {
            name: name.to_string(),
        })
    }

    /// The user-selectable mode name closest to the given one, for error
    /// suggestions.
    pub fn closest_name(name: &str) -> Option<&'static str> {
        Self::USER_SELECTABLE
            .iter()
            .map(|m| (m.name(), strsim::levenshtein(name, m.name())))
            .filter(|(_, distance)| *distance <= 3)
            .min_by_key(|(_, distance)| *distance)
            .map(|(candidate, _)| candidate)
    }

    pub fn name(&self) -> &'static str {
        match self {
            GenerationMode::Dynamic => "dynamic",
            GenerationMode::Template => "template",
            GenerationMode::Skip => "skip",
            GenerationMode::Dynamic111 => "dynamic_111",
            GenerationMode::OneOneOneChild => "111_child",
        }
    }

    /// Whether this mode produces a release artifact (a jar, a pom, a
    /// wheel).
    pub fn produces_artifact(&self) -> bool {
        match self {
            GenerationMode::Dynamic | GenerationMode::Template | GenerationMode::Dynamic111 => true,
            GenerationMode::Skip | GenerationMode::OneOneOneChild => false,
        }
    }

    /// Whether the dependency attributes of the package's rules should be
    /// queried (and the referenced packages crawled).
    pub fn query_dependency_attributes(&self) -> bool {
        match self {
            // template manifests may or may not have a build file next to
            // them - when there is one, it is generally unrelated
            GenerationMode::Template => false,
            _ => true,
        }
    }

    /// The rule attributes that point at other dependencies.
    pub fn dependency_attributes(&self) -> &'static [&'static str] {
        match self {
            GenerationMode::Skip => &SKIP_DEPENDENCY_ATTRIBUTES,
            _ => &BASE_DEPENDENCY_ATTRIBUTES,
        }
    }

    /// Whether the build system produces the artifact itself.
    ///
    /// For template mode the packaging tends to be "pom" - that is the whole
    /// point of a custom template - but a few templates declare a different
    /// packaging (maven-plugin for example), in which case the build is
    /// expected to produce something as well.
    pub fn bazel_produced_artifact(&self, template_content: &str) -> bool {
        match self {
            GenerationMode::Dynamic | GenerationMode::Dynamic111 => true,
            GenerationMode::Template => !template_content.contains("<packaging>pom</packaging>"),
            GenerationMode::Skip | GenerationMode::OneOneOneChild => false,
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
