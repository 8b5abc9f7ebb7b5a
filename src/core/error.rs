//! Error handling for relgen
//!
//! The error system has two layers:
//! 1. [`RelgenError`] - strongly-typed errors for every failure mode in the
//!    resolution engine, so callers can match on precise conditions
//! 2. [`ErrorContext`] - a wrapper that adds user-facing details and an
//!    actionable suggestion, displayed with terminal colors
//!
//! Most code propagates `anyhow::Result` with a `RelgenError` at the root;
//! [`user_friendly_error`] converts any error chain into an [`ErrorContext`]
//! for display at the top level of a run.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for relgen operations.
///
/// Hard failures abort the run with a descriptive message and no partial
/// output; see the individual variants for the condition each one covers.
#[derive(Error, Debug)]
pub enum RelgenError {
    /// A label string was empty or otherwise unusable.
    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    /// A generation mode name that is not in the user-selectable set.
    #[error("Unknown generation_mode: {name}")]
    UnknownGenerationMode { name: String },

    /// Neither `artifact` nor the legacy `maven_artifact` block was found in
    /// a metadata file.
    #[error("Required metadata block not found (expected '{expected}' or legacy '{legacy}')")]
    MetadataBlockNotFound {
        expected: &'static str,
        legacy: &'static str,
    },

    /// A function block had no terminating `)`.
    #[error("Unterminated '{name}(' block in metadata content")]
    UnterminatedBlock { name: String },

    /// An attribute value could not be evaluated as a literal.
    #[error("Cannot evaluate literal [{text}]: {reason}")]
    InvalidLiteral { text: String, reason: String },

    /// A required attribute was missing from a parsed metadata block.
    #[error("Missing required attribute '{attribute}' in metadata for package [{package}]")]
    MissingAttribute { attribute: String, package: String },

    /// A Maven coordinate string did not have 3, 4 or 5 segments.
    #[error("Cannot parse Maven coordinate [{coordinate}]")]
    InvalidCoordinate { coordinate: String },

    /// A Maven coordinate had an empty version segment.
    #[error("Invalid version in artifact [{coordinate}]")]
    InvalidVersion { coordinate: String },

    /// The same catalog coordinate appeared twice within one pinned file.
    #[error("Duplicate coordinate [{coordinate}] in pinned file for namespace [{namespace}]")]
    DuplicateCoordinate {
        coordinate: String,
        namespace: String,
    },

    /// The same fully-qualified label was produced by more than one pinned
    /// lockfile - a configuration error.
    #[error("Dependency label [{label}] is declared by more than one pinned lockfile")]
    DuplicateDependencyLabel { label: String },

    /// A conflict_resolution block mapped the same pinned coordinate twice.
    #[error("Duplicate conflict_resolution entry for [{coordinate}] in namespace [{namespace}]")]
    DuplicateConflictResolution {
        coordinate: String,
        namespace: String,
    },

    /// A direct dependency coordinate could not be matched to any top-level
    /// catalog entry, even after the verbose re-diagnosis pass.
    #[error(
        "Failed to find top level dependency instance for [{namespace}] with direct dep coord [{coordinate}]"
    )]
    MissingDirectDependency {
        coordinate: String,
        namespace: String,
    },

    /// `register_transitives`/`register_exclusions` was called twice for the
    /// same fully-qualified label.
    #[error("Duplicate key [{key}] registered for dependency [{dependency}]")]
    DuplicateRegistration { key: String, dependency: String },

    /// A dependency without a fully-qualified label cannot be registered.
    #[error("No registry key for dependency [{dependency}]")]
    UnkeyedDependency { dependency: String },

    /// A label handed to a strategy was neither a source ref nor a known
    /// external dependency.
    #[error(
        "Unknown external dependency [{label}] - make sure all pinned lockfiles have been registered in the relgen config. Known dependencies: {known}"
    )]
    UnknownExternalDependency { label: String, known: String },

    /// A source-ref label was resolved without an artifact definition.
    #[error("Label [{label}] is a source ref but no artifact definition was supplied")]
    MissingArtifactDef { label: String },

    /// A configured lockfile or override path did not match anything.
    #[error("{kind} path not found [{path}]")]
    PathNotFound { kind: &'static str, path: String },

    /// A pinned lockfile was structurally valid JSON but semantically off.
    #[error("Malformed pinned lockfile for namespace [{namespace}]: {reason}")]
    MalformedLockfile { namespace: String, reason: String },

    /// An override file did not contain the expected `{ ... }` block.
    #[error("Malformed override file [{path}]: {reason}")]
    MalformedOverrideFile { path: String, reason: String },

    /// A pinned requirements lock file declared the same package twice.
    #[error("Duplicate requirement [{name}] in requirements lock file")]
    DuplicateRequirement { name: String },

    /// A `# via` comment referenced a requirement that is not in the file.
    #[error("Requirement [{name}] is via unknown requirement [{via}]")]
    UnknownViaReference { name: String, via: String },

    /// A generation context was handed to a generator before the crawler
    /// registered all three dependency sets.
    #[error("Generation context for package [{package}] is missing {missing}")]
    IncompleteGenerationContext {
        package: String,
        missing: &'static str,
    },

    /// A requirements lock file line could not be parsed.
    #[error("Cannot parse requirements lock line [{line}]")]
    InvalidRequirementLine { line: String },

    /// Configuration file issues beyond TOML syntax.
    #[error("Config error: {reason}")]
    ConfigError { reason: String },

    /// JSON parsing errors from pinned lockfiles.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing errors from config files.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO errors from reading lockfiles, override files and metadata files.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A user-facing wrapper around an error with optional details and an
/// actionable suggestion.
pub struct ErrorContext {
    /// The underlying error.
    pub error: anyhow::Error,
    /// Additional context about what went wrong.
    pub details: Option<String>,
    /// What the user can do about it.
    pub suggestion: Option<String>,
}

impl ErrorContext {
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            details: None,
            suggestion: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("  {} {}", "details:".yellow(), details);
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("  {} {}", "suggestion:".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\n  details: {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  suggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Convert any error chain into an [`ErrorContext`] with a suggestion for
/// the known failure modes.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<RelgenError>() {
        Some(RelgenError::UnknownGenerationMode { name }) => {
            let valid = "valid generation modes are: dynamic, template, skip, dynamic_111";
            Some(match crate::genmode::GenerationMode::closest_name(name) {
                Some(closest) => format!("did you mean '{closest}'? {valid}"),
                None => valid.to_string(),
            })
        }
        Some(RelgenError::MetadataBlockNotFound { .. }) => Some(
            "add an 'artifact(...)' block to the package metadata file".to_string(),
        ),
        Some(RelgenError::UnknownExternalDependency { .. }) => Some(
            "set maven_install_paths in the relgen config file so all pinned lockfiles are registered".to_string(),
        ),
        Some(RelgenError::DuplicateDependencyLabel { .. }) => Some(
            "the same artifact is pinned in more than one lockfile namespace - remove one of the entries".to_string(),
        ),
        Some(RelgenError::PathNotFound { .. }) => {
            Some("paths are relative to the repository root".to_string())
        }
        _ => None,
    };
    let mut ctx = ErrorContext::new(error);
    if let Some(s) = suggestion {
        ctx = ctx.with_suggestion(s);
    }
    ctx
}
