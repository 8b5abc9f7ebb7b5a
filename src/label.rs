//! Bazel-style label identity.
//!
//! A [`Label`] is parsed from a target-reference string such as
//! `//projects/libs/base:core` or `@maven//:com_google_guava_guava` and
//! decomposed into a repository prefix, a package path and a target. Two
//! labels are equal iff those three components are equal, regardless of
//! whether the original string spelled out the default target explicitly -
//! `a/b/c`, `//a/b/c` and `//a/b/c:c` are all the same label.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::RelgenError;

/// A reference to a target in a Bazel-like build graph.
#[derive(Debug, Clone)]
pub struct Label {
    name: String,
}

impl Label {
    /// Parses a label from a raw string.
    ///
    /// The input is trimmed and a single trailing `/` is dropped. Empty (or
    /// whitespace-only) input is rejected so the internal offset helpers
    /// never see it.
    pub fn new(name: &str) -> Result<Self, RelgenError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RelgenError::InvalidLabel {
                label: name.to_string(),
                reason: "label must not be empty".to_string(),
            });
        }
        Ok(Self::from_normalized(
            trimmed.strip_suffix('/').unwrap_or(trimmed).to_string(),
        ))
    }

    fn from_normalized(name: String) -> Self {
        Self { name }
    }

    /// The name this label was created with, after normalization.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The package part of this label, including any repository prefix.
    ///
    /// For `//a/b/c:foo` this is `//a/b/c`. A trailing `...` wildcard
    /// segment is stripped.
    pub fn package(&self) -> &str {
        match self.name.find(':') {
            Some(i) => &self.name[..i],
            None => self.name.strip_suffix("...").unwrap_or(&self.name),
        }
    }

    /// The package of this label as a relative path: no repository prefix,
    /// no leading `//`, no trailing slash.
    pub fn package_path(&self) -> &str {
        let mut p = self.package();
        if p.starts_with('@') {
            if let Some(i) = p.find("//") {
                p = &p[i + 2..];
            }
        } else if let Some(stripped) = p.strip_prefix("//") {
            p = stripped;
        }
        p.strip_suffix('/').unwrap_or(p)
    }

    /// The target of this label: the substring after the last `:`, or the
    /// last path segment when no target is spelled out.
    pub fn target(&self) -> &str {
        match self.name.rfind(':') {
            Some(i) => &self.name[i + 1..],
            None => basename(self.package()),
        }
    }

    /// Whether this label refers to the default target of its package, ie
    /// the target named like the last package path segment.
    pub fn is_default_target(&self) -> bool {
        basename(self.package_path()) == self.target()
    }

    /// Whether this label's target lives in the root build file (`//:`).
    pub fn is_root_target(&self) -> bool {
        self.name.contains("//:")
    }

    /// The repository prefix including the leading `@`, or an empty string.
    pub fn repository_prefix(&self) -> &str {
        if self.name.starts_with('@') {
            if let Some(i) = self.name.find("//") {
                return &self.name[..i];
            }
        }
        ""
    }

    pub fn has_repository_prefix(&self) -> bool {
        !self.repository_prefix().is_empty()
    }

    /// Whether this label references source in the same repository.
    pub fn is_source_ref(&self) -> bool {
        self.name.starts_with("//")
    }

    /// The canonical rendering `[@repo]//package[:target]`, omitting the
    /// target when it is the package's default target.
    pub fn canonical_form(&self) -> String {
        let prefix = self.repository_prefix();
        let path = self.package_path();
        if self.is_default_target() {
            format!("{prefix}//{path}")
        } else {
            format!("{prefix}//{path}:{target}", target = self.target())
        }
    }

    /// Returns a new label with the given target, preserving the repository
    /// prefix and package path.
    #[must_use]
    pub fn with_target(&self, target: &str) -> Label {
        Label::from_normalized(format!("{}:{}", self.package(), target))
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.repository_prefix() == other.repository_prefix()
            && self.package_path() == other.package_path()
            && self.target() == other.target()
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repository_prefix().hash(state);
        self.package_path().hash(state);
        self.target().hash(state);
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
