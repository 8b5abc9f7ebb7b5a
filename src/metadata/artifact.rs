//! Parsed artifact definitions.
//!
//! An [`ArtifactDef`] is the structured form of a package's artifact
//! metadata block. The (external) crawler discovers the metadata files and
//! hands their text here; everything below the text level - locating the
//! blocks, literal values, spans - goes through [`super::parse_artifact_attributes`].

use std::sync::Arc;

use crate::core::RelgenError;
use crate::genmode::GenerationMode;
use crate::metadata::ParsedAttributes;

/// The artifact definition of a single build package.
#[derive(Debug, Clone)]
pub struct ArtifactDef {
    /// The released artifact's group id.
    pub group_id: String,
    /// The released artifact's id.
    pub artifact_id: String,
    /// The artifact version.
    pub version: String,
    /// The generation policy for this package.
    pub generation_mode: GenerationMode,
    /// Relative path to a custom manifest template, for template mode.
    pub template_file: Option<String>,
    /// The content of the custom template, loaded by the crawler.
    pub custom_template_content: Option<String>,
    /// Whether dependencies are included in the generated manifest. Disabling
    /// this also disables crawling source dependencies of this package.
    pub include_deps: bool,
    /// Whether releases are driven by detected changes since the last
    /// release. When explicitly disabled the artifact is unconditionally
    /// marked as needing a release.
    pub change_detection: bool,
    /// Additional packages to check for changes when deciding whether this
    /// artifact needs a release.
    pub additional_change_detected_packages: Vec<String>,
    /// Extra targets this package depends on, as label strings. Typically
    /// only used in tests.
    pub deps: Vec<String>,
    /// Extra dependencies to include (or, with a `-` prefix, exclude) in the
    /// generated manifest, in manifest-native syntax.
    pub emitted_dependencies: Vec<String>,
    /// The build package (relative directory path) the metadata lives in.
    pub package: String,
    /// The target that builds this artifact; defaults to the last package
    /// path segment.
    pub target: String,
    /// Root directory of the library this artifact belongs to; set by the
    /// crawler.
    pub library_path: Option<String>,
    /// Whether this artifact must be released. None until release planning
    /// has run; an explicit false means the previously released artifact is
    /// referenced instead.
    pub requires_release: Option<bool>,
    /// The previously released version, if any.
    pub released_version: Option<String>,
    /// How this artifact's version is incremented, from the update block.
    pub version_increment_strategy: Option<String>,
}

impl ArtifactDef {
    /// Creates a definition with default values, the way a metadata file
    /// with only the coordinate attributes would.
    pub fn new(group_id: &str, artifact_id: &str, version: &str, package: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            generation_mode: GenerationMode::DEFAULT,
            template_file: None,
            custom_template_content: None,
            include_deps: true,
            change_detection: true,
            additional_change_detected_packages: Vec::new(),
            deps: Vec::new(),
            emitted_dependencies: Vec::new(),
            package: package.to_string(),
            target: default_target(package),
            library_path: None,
            requires_release: None,
            released_version: None,
            version_increment_strategy: None,
        }
    }

    /// Parses the artifact definition out of metadata file content for the
    /// given package.
    pub fn parse(content: &str, package: &str) -> Result<Arc<ArtifactDef>, RelgenError> {
        let attrs = crate::metadata::parse_artifact_attributes(content)?;
        let mut def = ArtifactDef::new(
            required_str(&attrs, "group_id", package)?,
            required_str(&attrs, "artifact_id", package)?,
            required_str(&attrs, "version", package)?,
            package,
        );
        // current name first, then the legacy metadata attribute
        let mode_name = attrs
            .str_value("generation_mode")
            .or_else(|| attrs.str_value("pom_generation_mode"));
        if let Some(name) = mode_name {
            def.generation_mode = GenerationMode::from_name(name)?;
        }
        def.template_file = attrs
            .str_value("template_file")
            .or_else(|| attrs.str_value("pom_template_file"))
            .map(str::to_string);
        if let Some(include_deps) = attrs.bool_value("include_deps") {
            def.include_deps = include_deps;
        }
        if let Some(change_detection) = attrs.bool_value("change_detection") {
            def.change_detection = change_detection;
        }
        if let Some(packages) = attrs.str_list_value("additional_change_detected_packages") {
            // these are paths relative to the repo root
            def.additional_change_detected_packages = packages
                .into_iter()
                .map(|p| p.strip_prefix("//").unwrap_or(&p).to_string())
                .collect();
        }
        if let Some(deps) = attrs.str_list_value("deps") {
            def.deps = deps;
        }
        if let Some(emitted) = attrs.str_list_value("emitted_dependencies") {
            def.emitted_dependencies = emitted;
        }
        if let Some(target) = attrs.str_value("target_name") {
            def.target = target.to_string();
        }
        def.version_increment_strategy = attrs
            .str_value("version_increment_strategy")
            .map(str::to_string);
        Ok(Arc::new(def))
    }

    /// The effective version: the previously released one when this artifact
    /// is explicitly marked as not requiring a release.
    pub fn effective_version(&self) -> &str {
        if self.uses_previously_released_artifact() {
            if let Some(released) = &self.released_version {
                return released;
            }
        }
        &self.version
    }

    /// Whether references to this artifact resolve to the previously
    /// released artifact instead of the source tree.
    pub fn uses_previously_released_artifact(&self) -> bool {
        // explicit is better here: only an explicitly set false counts
        self.requires_release == Some(false)
    }
}

impl std::fmt::Display for ArtifactDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

fn required_str<'a>(
    attrs: &'a ParsedAttributes,
    name: &str,
    package: &str,
) -> Result<&'a str, RelgenError> {
    attrs
        .str_value(name)
        .ok_or_else(|| RelgenError::MissingAttribute {
            attribute: name.to_string(),
            package: package.to_string(),
        })
}

fn default_target(package: &str) -> String {
    package
        .rsplit('/')
        .next()
        .unwrap_or(package)
        .to_string()
}
