//! Parsing of pinned external-dependency lockfiles.
//!
//! Two ecosystems are supported:
//!
//! - [`maven_install`] - pinned JSON lockfiles of Maven artifacts, turned
//!   into a dependency graph with conflict resolution, override rewriting
//!   and per-node transitive closures
//! - [`requirements`] - pinned Python requirements lock files with their
//!   `# via` provenance comments
//!
//! [`install_info`] expands the configured lockfile paths into
//! `(namespace, path)` pairs and [`overrides`] parses the run-level override
//! files that redirect graph edges from one external dependency to another.

pub mod install_info;
pub mod maven_install;
pub mod overrides;
pub mod requirements;

pub use install_info::MavenInstallInfo;
pub use maven_install::parse_maven_install;
pub use overrides::OverrideFileInfo;
pub use requirements::{PythonRequirement, parse_requirements_lock};
