//! Pinned Maven lockfile parsing and graph construction.
//!
//! Each pinned file contributes a set of [`Dependency`] nodes plus direct
//! edges between them. After every configured namespace has been parsed,
//! run-level overrides are applied as a second pass over the whole graph -
//! scheduling the rewrite after all files are loaded is what guarantees that
//! every override target is resolvable regardless of which file it came
//! from. Finally each node's transitive closure is computed by a depth-first
//! walk of the direct edges.
//!
//! Node identity is an index into the builder's arena; "replace this exact
//! edge" during override rewriting and closure deduplication are both
//! defined in terms of that identity, not structural equality.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::RelgenError;
use crate::dependency::{Dependency, ExternalDependency};

/// A provisional version for catalog entries; the real version is looked up
/// in the `artifacts` table before the node is built.
const PROVISIONAL_VERSION: &str = "-1";

#[derive(Debug, Deserialize)]
struct PinnedFile {
    /// Repository URL -> list of coordinates. The first entry (in document
    /// order) is the artifact-coordinate catalog.
    repositories: serde_json::Map<String, serde_json::Value>,
    /// `group:artifact` -> resolved version (and checksums, ignored here).
    artifacts: HashMap<String, ArtifactEntry>,
    /// Coordinate (without version) -> direct coordinates.
    #[serde(default)]
    dependencies: HashMap<String, Vec<String>>,
    /// Actual GAV -> GAV used in the rest of the file.
    #[serde(default)]
    conflict_resolution: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ArtifactEntry {
    version: String,
}

struct Node {
    dep: Arc<Dependency>,
    directs: Vec<usize>,
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<Node>,
    /// Fully-qualified label -> node, across all namespaces.
    fq_label_to_node: HashMap<String, usize>,
    /// Unqualified label -> nodes; one-to-many because the same artifact may
    /// be pinned in several namespaces.
    unqual_label_to_nodes: HashMap<String, Vec<usize>>,
}

/// Parses the given pinned lockfiles and returns, per top-level dependency,
/// the dependency and its full transitive closure.
///
/// `overrides` maps unqualified labels to the fully-qualified label whose
/// node should replace every graph edge currently pointing at a matching
/// dependency.
pub fn parse_maven_install(
    names_and_paths: &[(String, PathBuf)],
    overrides: &BTreeMap<String, String>,
) -> Result<Vec<(Arc<Dependency>, Vec<Arc<Dependency>>)>> {
    let mut builder = GraphBuilder::default();
    for (namespace, path) in names_and_paths {
        debug!("Processing pinned file [{}]", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pinned file [{}]", path.display()))?;
        builder
            .add_pinned_file(namespace, &content)
            .with_context(|| format!("Failed to parse pinned file [{}]", path.display()))?;
    }
    builder.apply_overrides(overrides);
    Ok(builder.into_dependencies_and_transitives())
}

/// Parses pinned lockfile contents directly; `parse_maven_install` is the
/// file-based entry point.
pub fn parse_pinned_contents(
    names_and_contents: &[(String, String)],
    overrides: &BTreeMap<String, String>,
) -> Result<Vec<(Arc<Dependency>, Vec<Arc<Dependency>>)>> {
    let mut builder = GraphBuilder::default();
    for (namespace, content) in names_and_contents {
        builder.add_pinned_file(namespace, content)?;
    }
    builder.apply_overrides(overrides);
    Ok(builder.into_dependencies_and_transitives())
}

impl GraphBuilder {
    fn add_pinned_file(&mut self, namespace: &str, content: &str) -> Result<()> {
        let pinned: PinnedFile = serde_json::from_str(content).map_err(RelgenError::from)?;
        let catalog = catalog_coordinates(&pinned, namespace)?;
        let conflict_resolution = parse_conflict_resolution(&pinned, namespace)?;

        // collect top level dependencies; the catalog coordinate (without
        // version) is the lookup key used by the rest of the pinned file
        let mut coord_to_node: HashMap<String, usize> = HashMap::new();
        let mut catalog_order: Vec<String> = Vec::new();
        for coord_wo_version in catalog {
            // the provisional dep exists to find group/artifact for the
            // version lookup, then the node is rebuilt at the real version
            let provisional = ExternalDependency::from_coordinate(
                &format!("{coord_wo_version}:{PROVISIONAL_VERSION}"),
                Some(namespace),
            )?;
            let group_artifact =
                format!("{}:{}", provisional.group_id(), provisional.artifact_id());
            let version = pinned
                .artifacts
                .get(&group_artifact)
                .map(|entry| entry.version.as_str())
                .ok_or_else(|| RelgenError::MalformedLockfile {
                    namespace: namespace.to_string(),
                    reason: format!("no artifacts entry for [{group_artifact}]"),
                })?;
            let mut dep =
                Dependency::from_coordinate(&format!("{coord_wo_version}:{version}"), Some(namespace))?;
            if let Some(wanted) = conflict_resolution.get(&dep) {
                dep = Arc::clone(wanted);
            }
            if dep.classifier() == Some("sources") {
                // sources artifacts never become graph nodes
                continue;
            }
            if coord_to_node.contains_key(&coord_wo_version) {
                return Err(RelgenError::DuplicateCoordinate {
                    coordinate: coord_wo_version,
                    namespace: namespace.to_string(),
                }
                .into());
            }
            let fq_label = dep.bazel_label().expect("external deps always have a label");
            if self.fq_label_to_node.contains_key(&fq_label) {
                return Err(RelgenError::DuplicateDependencyLabel { label: fq_label }.into());
            }
            let unqual_label = dep.unqualified_label().expect("external deps have one");
            let index = self.nodes.len();
            self.nodes.push(Node {
                dep,
                directs: Vec::new(),
            });
            self.fq_label_to_node.insert(fq_label, index);
            self.unqual_label_to_nodes
                .entry(unqual_label)
                .or_default()
                .push(index);
            coord_to_node.insert(coord_wo_version.clone(), index);
            catalog_order.push(coord_wo_version);
        }

        // attach direct edges
        for coord in &catalog_order {
            let direct_coords = pinned
                .dependencies
                .get(coord)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut directs =
                resolve_directs(direct_coords, &coord_to_node, namespace, false, false)?;
            if directs.is_empty() {
                // something may have failed quietly - rerun with more
                // logging, and this time blow up when the failure hits
                directs = resolve_directs(direct_coords, &coord_to_node, namespace, true, true)?;
            }
            self.nodes[coord_to_node[coord]].directs = directs;
        }
        Ok(())
    }

    /// Rewrites direct edges per the given overrides. For every node in the
    /// whole graph - any namespace - an edge pointing at a dependency whose
    /// unqualified label matches is replaced with the override's target
    /// node. Unresolvable target labels are skipped.
    fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) {
        for (unqual_label, fq_label) in overrides {
            let Some(&target) = self.fq_label_to_node.get(fq_label) else {
                continue;
            };
            let Some(sources) = self.unqual_label_to_nodes.get(unqual_label) else {
                continue;
            };
            let sources: HashSet<usize> = sources.iter().copied().collect();
            for node in &mut self.nodes {
                for direct in &mut node.directs {
                    if sources.contains(direct) {
                        *direct = target;
                    }
                }
            }
        }
    }

    fn into_dependencies_and_transitives(self) -> Vec<(Arc<Dependency>, Vec<Arc<Dependency>>)> {
        let mut result = Vec::with_capacity(self.nodes.len());
        for index in 0..self.nodes.len() {
            let mut seen = HashSet::new();
            let mut closure = Vec::new();
            collect_directs(&self.nodes, index, &mut seen, &mut closure);
            let transitives = closure
                .into_iter()
                .map(|i| Arc::clone(&self.nodes[i].dep))
                .collect();
            result.push((Arc::clone(&self.nodes[index].dep), transitives));
        }
        result
    }
}

/// Depth-first collection of the nodes reachable from `index`, deduplicated
/// by node identity; the traversal order defines the closure order.
fn collect_directs(nodes: &[Node], index: usize, seen: &mut HashSet<usize>, closure: &mut Vec<usize>) {
    for &direct in &nodes[index].directs {
        if seen.insert(direct) {
            closure.push(direct);
            collect_directs(nodes, direct, seen, closure);
        }
    }
}

fn catalog_coordinates(pinned: &PinnedFile, namespace: &str) -> Result<Vec<String>> {
    let (_, catalog) =
        pinned
            .repositories
            .iter()
            .next()
            .ok_or_else(|| RelgenError::MalformedLockfile {
                namespace: namespace.to_string(),
                reason: "pinned file has no repositories".to_string(),
            })?;
    let coordinates: Vec<String> =
        serde_json::from_value(catalog.clone()).map_err(RelgenError::from)?;
    Ok(coordinates)
}

/// Builds the conflict-resolution lookup: dep used in the pinned file ->
/// dep we actually want. The file maps the other way around (actual gav ->
/// gav used in the rest of the file, the only difference being the version).
fn parse_conflict_resolution(
    pinned: &PinnedFile,
    namespace: &str,
) -> Result<HashMap<Arc<Dependency>, Arc<Dependency>>> {
    let mut conflict_resolution = HashMap::new();
    for (gav_wanted, gav_pinned) in &pinned.conflict_resolution {
        let wanted = Dependency::from_coordinate(gav_wanted, Some(namespace))?;
        let pinned_dep = Dependency::from_coordinate(gav_pinned, Some(namespace))?;
        if conflict_resolution.insert(pinned_dep, wanted).is_some() {
            return Err(RelgenError::DuplicateConflictResolution {
                coordinate: gav_pinned.clone(),
                namespace: namespace.to_string(),
            }
            .into());
        }
    }
    Ok(conflict_resolution)
}

fn resolve_directs(
    direct_coords: &[String],
    coord_to_node: &HashMap<String, usize>,
    namespace: &str,
    verbose: bool,
    fail_on_missing: bool,
) -> Result<Vec<usize>> {
    let mut directs = Vec::new();
    for coord in direct_coords {
        let mut found = coord_to_node.get(coord).copied();
        if found.is_some() {
            if verbose {
                debug!("Found top level dep in [{namespace}] as [{coord}]");
            }
        } else {
            for alt_coord in alternate_lookup_coordinates(coord)? {
                if let Some(&index) = coord_to_node.get(&alt_coord) {
                    if verbose {
                        debug!(
                            "Found top level dep in [{namespace}] using alt coord [{alt_coord}] instead of [{coord}]"
                        );
                    }
                    found = Some(index);
                    break;
                }
            }
        }
        match found {
            Some(index) => directs.push(index),
            None => {
                if coord.ends_with(":pom") {
                    // a direct dependency on a pom has no jar to resolve to
                    warn!(
                        "Direct dependency on a pom [{coord}] in namespace [{namespace}] is ignored. Please depend on actual jar files instead."
                    );
                } else {
                    warn!(
                        "Failed to find top level dependency instance for [{namespace}] with direct dep coord [{coord}]"
                    );
                    if fail_on_missing {
                        return Err(RelgenError::MissingDirectDependency {
                            coordinate: coord.clone(),
                            namespace: namespace.to_string(),
                        }
                        .into());
                    }
                    return Ok(Vec::new());
                }
            }
        }
    }
    Ok(directs)
}

/// Alternate coordinates observed in pinned files: a `test-jar` packaging
/// reference may match a `jar` artifact carrying a `tests` classifier.
fn alternate_lookup_coordinates(coord_wo_version: &str) -> Result<Vec<String>> {
    let dep = ExternalDependency::from_coordinate(
        &format!("{coord_wo_version}:{PROVISIONAL_VERSION}"),
        None,
    )?;
    let mut alternates = Vec::new();
    if dep.packaging() == "test-jar" {
        alternates.push(format!("{}:{}:jar:tests", dep.group_id(), dep.artifact_id()));
    }
    Ok(alternates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn parse_single(content: &str) -> Vec<(Arc<Dependency>, Vec<Arc<Dependency>>)> {
        parse_pinned_contents(&[("maven".to_string(), content.to_string())], &no_overrides())
            .unwrap()
    }

    fn closure_names(result: &[(Arc<Dependency>, Vec<Arc<Dependency>>)], coords: &str) -> Vec<String> {
        result
            .iter()
            .find(|(dep, _)| dep.maven_coordinates_name() == coords)
            .map(|(_, transitives)| transitives.iter().map(|t| t.maven_coordinates_name()).collect())
            .unwrap()
    }

    const BASIC: &str = r#"
{
    "repositories": {
        "https://repo1.maven.org/maven2/": [
            "com.google.guava:guava",
            "com.google.guava:failureaccess",
            "org.checkerframework:checker-qual"
        ]
    },
    "artifacts": {
        "com.google.guava:guava": {"version": "31.1-jre"},
        "com.google.guava:failureaccess": {"version": "1.0.1"},
        "org.checkerframework:checker-qual": {"version": "3.12.0"}
    },
    "dependencies": {
        "com.google.guava:guava": ["com.google.guava:failureaccess", "org.checkerframework:checker-qual"],
        "com.google.guava:failureaccess": ["org.checkerframework:checker-qual"]
    }
}
"#;

    #[test]
    fn test_basic_graph() {
        let result = parse_single(BASIC);
        assert_eq!(3, result.len());

        let guava = result
            .iter()
            .find(|(dep, _)| dep.artifact_id() == "guava")
            .unwrap();
        assert_eq!("31.1-jre", guava.0.version());
        assert_eq!(
            Some("@maven//:com_google_guava_guava".to_string()),
            guava.0.bazel_label()
        );
        assert_eq!(
            vec![
                "com.google.guava:failureaccess",
                "org.checkerframework:checker-qual"
            ],
            closure_names(&result, "com.google.guava:guava")
        );
        // closures are deduplicated: checker-qual is reachable twice but
        // appears once
        assert_eq!(
            vec!["org.checkerframework:checker-qual"],
            closure_names(&result, "com.google.guava:failureaccess")
        );
        assert!(closure_names(&result, "org.checkerframework:checker-qual").is_empty());
    }

    #[test]
    fn test_closure_is_exactly_reachable_set() {
        let result = parse_single(BASIC);
        for (_, transitives) in &result {
            let mut labels: Vec<_> = transitives.iter().map(|t| t.bazel_label()).collect();
            let len = labels.len();
            labels.dedup();
            assert_eq!(len, labels.len(), "closure contains duplicates");
        }
    }

    #[test]
    fn test_sources_classifier_dropped() {
        let content = r#"
{
    "repositories": {"central": ["g:a", "g:a:jar:sources"]},
    "artifacts": {"g:a": {"version": "1.0"}},
    "dependencies": {}
}
"#;
        let result = parse_single(content);
        assert_eq!(1, result.len());
        assert_eq!("g:a", result[0].0.maven_coordinates_name());
    }

    #[test]
    fn test_conflict_resolution_rewrites_version() {
        // the rest of the file pins 1.17; the wanted version is 1.17-ext
        let content = r#"
{
    "repositories": {"central": ["com.sun.jersey:jersey-client"]},
    "artifacts": {"com.sun.jersey:jersey-client": {"version": "1.17"}},
    "dependencies": {},
    "conflict_resolution": {
        "com.sun.jersey:jersey-client:1.17-ext": "com.sun.jersey:jersey-client:1.17"
    }
}
"#;
        let result = parse_single(content);
        assert_eq!("1.17-ext", result[0].0.version());
    }

    #[test]
    fn test_test_jar_alternate_coordinates() {
        let content = r#"
{
    "repositories": {"central": ["g:impl", "g:keystore:jar:tests"]},
    "artifacts": {
        "g:impl": {"version": "1.0"},
        "g:keystore": {"version": "2.0.39"}
    },
    "dependencies": {
        "g:impl": ["g:keystore:test-jar"]
    }
}
"#;
        let result = parse_single(content);
        let closure = closure_names(&result, "g:impl");
        assert_eq!(vec!["g:keystore:jar:tests"], closure);
    }

    #[test]
    fn test_missing_pom_direct_is_soft() {
        let content = r#"
{
    "repositories": {"central": ["g:a"]},
    "artifacts": {"g:a": {"version": "1.0"}},
    "dependencies": {
        "g:a": ["org.kie.modules:org-apache-commons-lang3:pom"]
    }
}
"#;
        // a warning and an empty direct-edge contribution, not a failure
        let result = parse_single(content);
        assert!(closure_names(&result, "g:a").is_empty());
    }

    #[test]
    fn test_missing_direct_is_hard_after_rediagnosis() {
        let content = r#"
{
    "repositories": {"central": ["g:a"]},
    "artifacts": {"g:a": {"version": "1.0"}},
    "dependencies": {
        "g:a": ["g:not-in-catalog"]
    }
}
"#;
        let err = parse_pinned_contents(
            &[("maven".to_string(), content.to_string())],
            &no_overrides(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("g:not-in-catalog"));
    }

    #[test]
    fn test_duplicate_label_across_files_is_hard() {
        let content = r#"
{
    "repositories": {"central": ["g:a"]},
    "artifacts": {"g:a": {"version": "1.0"}},
    "dependencies": {}
}
"#;
        let err = parse_pinned_contents(
            &[
                ("maven".to_string(), content.to_string()),
                ("maven".to_string(), content.to_string()),
            ],
            &no_overrides(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than one pinned lockfile"));
    }

    #[test]
    fn test_same_artifact_in_two_namespaces_is_fine() {
        let content = r#"
{
    "repositories": {"central": ["g:a"]},
    "artifacts": {"g:a": {"version": "1.0"}},
    "dependencies": {}
}
"#;
        let result = parse_pinned_contents(
            &[
                ("maven".to_string(), content.to_string()),
                ("other".to_string(), content.to_string()),
            ],
            &no_overrides(),
        )
        .unwrap();
        assert_eq!(2, result.len());
    }

    #[test]
    fn test_override_rewrites_edges_across_namespaces() {
        let first = r#"
{
    "repositories": {"central": ["g:parent", "g:child"]},
    "artifacts": {
        "g:parent": {"version": "1.0"},
        "g:child": {"version": "1.0"}
    },
    "dependencies": {"g:parent": ["g:child"]}
}
"#;
        let second = r#"
{
    "repositories": {"central": ["g:child"]},
    "artifacts": {"g:child": {"version": "9.9"}},
    "dependencies": {}
}
"#;
        let mut overrides = BTreeMap::new();
        overrides.insert("g_child".to_string(), "@newer//:g_child".to_string());
        let result = parse_pinned_contents(
            &[
                ("maven".to_string(), first.to_string()),
                ("newer".to_string(), second.to_string()),
            ],
            &overrides,
        )
        .unwrap();

        let parent_closure: Vec<String> = result
            .iter()
            .find(|(dep, _)| dep.artifact_id() == "parent")
            .map(|(_, t)| t.iter().map(|d| d.bazel_label().unwrap()).collect())
            .unwrap();
        // every edge that pointed at the "maven" namespace child now points
        // at the "newer" one, transitively
        assert_eq!(vec!["@newer//:g_child"], parent_closure);
        let rewritten = result
            .iter()
            .find(|(dep, _)| dep.artifact_id() == "parent")
            .unwrap()
            .1[0]
            .version();
        assert_eq!("9.9", rewritten);
    }

    #[test]
    fn test_override_with_unknown_target_is_skipped() {
        let mut overrides = BTreeMap::new();
        overrides.insert("g_a".to_string(), "@nowhere//:g_a".to_string());
        let result = parse_pinned_contents(
            &[("maven".to_string(), BASIC.to_string())],
            &overrides,
        );
        assert!(result.is_ok());
    }
}
