//! relgen - release-manifest dependency resolution for Bazel-style
//! monorepos.
//!
//! A monorepo built with a Bazel-like build graph declares its external
//! dependencies in pinned lockfiles and its publishable units in per-package
//! metadata files. To emit release manifests (Maven POMs, Python packaging
//! metadata) for those units, the complete dependency closure of each one
//! has to be resolved first - that resolution engine is this crate.
//!
//! # Architecture Overview
//!
//! Leaf-first:
//! - [`label`] - parses and canonicalizes target-reference strings into
//!   (repository prefix, package path, target); equality ignores how the
//!   default target was spelled
//! - [`metadata`] - extracts named literal values, and their exact byte
//!   spans, from rule-invocation shaped metadata blocks; also the parsed
//!   [`metadata::artifact::ArtifactDef`]
//! - [`dependency`] - the unified dependency node: external (pinned Maven
//!   coordinates) or source (backed by an artifact definition)
//! - [`lockfile`] - parses pinned lockfiles into a dependency graph,
//!   applies conflict resolution and run-level override rewriting, computes
//!   transitive closures; covers Maven pinned JSON and Python requirements
//!   locks
//! - [`registry`] - the queryable store over the built graph: closures,
//!   exclusions, ancestors, classifier resolution
//! - [`genmode`] - the closed set of per-package generation policies
//! - [`generate`] - strategy dispatch: resolves labels to dependency nodes
//!   and hands fully-populated dependency sets to manifest generators
//!
//! Supporting modules: [`config`] (TOML run configuration), [`core`]
//! (errors), [`logging`].
//!
//! # Data Flow
//!
//! An external crawler walks the build packages and supplies, per package, a
//! [`label::Label`] and a parsed artifact definition. A
//! [`generate::GenerationStrategy`] resolves each declared dependency label
//! to a node - source refs through the artifact definition, everything else
//! through the lockfile graph built during `initialize()` - then closure
//! queries go through the [`registry::DependencyMetadata`], and the
//! assembled direct + transitive sets are handed to a manifest generator.
//!
//! Execution is single-threaded, synchronous and batch: a run resolves the
//! whole graph before any manifest is emitted, and either completes or fails
//! as a unit. The registry is the only shared mutable resource; it is
//! written once during initialization and must be explicitly cleared before
//! resolving again in the same process.

pub mod config;
pub mod core;
pub mod dependency;
pub mod generate;
pub mod genmode;
pub mod label;
pub mod lockfile;
pub mod logging;
pub mod metadata;
pub mod registry;

pub use crate::core::{ErrorContext, RelgenError, user_friendly_error};
pub use crate::dependency::{Dependency, ExternalDependency, SourceDependency};
pub use crate::generate::{
    GenerationContext, GenerationStrategy, ManifestGenerator, MavenGenerationStrategy,
    PyGenerationStrategy,
};
pub use crate::genmode::GenerationMode;
pub use crate::label::Label;
pub use crate::metadata::artifact::ArtifactDef;
pub use crate::registry::DependencyMetadata;
