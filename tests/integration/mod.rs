//! End-to-end resolution runs: config on disk, pinned lockfiles, override
//! files, strategy initialization, label resolution, closure queries and
//! manifest generation.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use relgen::config::Config;
use relgen::generate::{GenerationContext, GenerationStrategy, ManifestGenerator};
use relgen::{ArtifactDef, Label, MavenGenerationStrategy, PyGenerationStrategy};

const MAIN_PINNED: &str = r#"
{
    "repositories": {
        "https://repo1.maven.org/maven2/": [
            "com.google.guava:guava",
            "com.google.guava:failureaccess",
            "org.checkerframework:checker-qual",
            "ch.qos.logback:logback-classic"
        ]
    },
    "artifacts": {
        "com.google.guava:guava": {"version": "31.1-jre"},
        "com.google.guava:failureaccess": {"version": "1.0.1"},
        "org.checkerframework:checker-qual": {"version": "3.12.0"},
        "ch.qos.logback:logback-classic": {"version": "1.4.14"}
    },
    "dependencies": {
        "com.google.guava:guava": [
            "com.google.guava:failureaccess",
            "org.checkerframework:checker-qual"
        ],
        "ch.qos.logback:logback-classic": ["org.kie.modules:org-apache-commons-lang3:pom"]
    }
}
"#;

const UPGRADE_PINNED: &str = r#"
{
    "repositories": {
        "central": ["org.checkerframework:checker-qual"]
    },
    "artifacts": {
        "org.checkerframework:checker-qual": {"version": "3.42.0"}
    },
    "dependencies": {}
}
"#;

const OVERRIDES: &str = r#"
# route every edge pointing at the old checker-qual to the upgrade namespace
OVERRIDES = {
    "org.checkerframework:checker-qual": "@upgrade//:org_checkerframework_checker_qual",
}
"#;

const REQUIREMENTS: &str = "\
numpy==1.26.4
    # via pandas
pandas==2.2.1
    # via -r requirements.in
";

const CONFIG: &str = r#"
[general]
maven_install_paths = ["tools/*_install.json"]
locked_requirements_paths = ["tools/pip/requirements_lock.txt@pip"]
override_file_paths = ["tools/overrides.bzl"]

[artifact]
jar_classifier = "jdk11"
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn repo() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "tools/maven_install.json", MAIN_PINNED);
    write(temp.path(), "tools/upgrade_install.json", UPGRADE_PINNED);
    write(temp.path(), "tools/overrides.bzl", OVERRIDES);
    write(temp.path(), "tools/pip/requirements_lock.txt", REQUIREMENTS);
    write(temp.path(), "relgen.toml", CONFIG);
    temp
}

fn label(s: &str) -> Label {
    Label::new(s).unwrap()
}

#[test]
fn maven_resolution_end_to_end() {
    let temp = repo();
    let config = Config::load(&temp.path().join("relgen.toml")).unwrap();
    let mut strategy = MavenGenerationStrategy::new(temp.path(), &config).unwrap();
    strategy.initialize().unwrap();

    // external lookup by canonical label
    let guava = strategy
        .load_dependency(&label("@maven//:com_google_guava_guava"), None)
        .unwrap();
    assert_eq!("31.1-jre", guava.version());

    // the override rewired guava's checker-qual edge to the upgrade
    // namespace, so the closure carries the upgraded version
    let closure = strategy.load_transitive_closure(&guava);
    let labels: Vec<String> = closure.iter().map(|d| d.bazel_label().unwrap()).collect();
    assert!(labels.contains(&"@maven//:com_google_guava_failureaccess".to_string()));
    assert!(labels.contains(&"@upgrade//:org_checkerframework_checker_qual".to_string()));
    assert!(!labels.contains(&"@maven//:org_checkerframework_checker_qual".to_string()));
    let checker = closure
        .iter()
        .find(|d| d.artifact_id() == "checker-qual")
        .unwrap();
    assert_eq!("3.42.0", checker.version());

    // ancestor query follows the rewritten closure
    let ancestors = strategy.dependency_metadata().get_ancestors(checker);
    assert_eq!(1, ancestors.len());
    assert_eq!("com.google.guava:guava", ancestors[0].maven_coordinates_name());

    // the pom-only direct dependency was warned about and skipped, so
    // logback resolves with an empty closure rather than failing the run
    let logback = strategy
        .load_dependency(&label("@maven//:ch_qos_logback_logback_classic"), None)
        .unwrap();
    assert!(strategy.load_transitive_closure(&logback).is_empty());
}

#[test]
fn manifest_generation_end_to_end() {
    let temp = repo();
    let config = Config::load(&temp.path().join("relgen.toml")).unwrap();
    let mut strategy = MavenGenerationStrategy::new(temp.path(), &config).unwrap();
    strategy.initialize().unwrap();

    // the crawler parsed this package's metadata file
    let metadata_content = r#"
artifact(
    group_id = "com.grail.srpc",
    artifact_id = "srpc-api",
    version = "4.2.0",
)
"#;
    let def = ArtifactDef::parse(metadata_content, "projects/libs/srpc/api").unwrap();
    let package_label = label("//projects/libs/srpc/api");
    let source_self = strategy.load_dependency(&package_label, Some(&def)).unwrap();
    assert!(!source_self.external());

    let guava = strategy
        .load_dependency(&label("@maven//:com_google_guava_guava"), None)
        .unwrap();
    let base_def = Arc::new(ArtifactDef::new(
        "com.grail.srpc",
        "srpc-base",
        "4.2.0",
        "projects/libs/srpc/base",
    ));
    let base = strategy
        .load_dependency(&label("//projects/libs/srpc/base"), Some(&base_def))
        .unwrap();

    let mut context = GenerationContext::new(package_label, Arc::clone(&def));
    let mut artifact_closure = vec![Arc::clone(&guava)];
    artifact_closure.extend(strategy.load_transitive_closure(&guava));
    context.register_direct_dependencies(vec![guava, base]);
    context.register_artifact_transitive_closure(artifact_closure.clone());
    context.register_library_transitive_closure(artifact_closure);

    let generator = strategy.new_generator(&context).unwrap();
    let pom = generator.generate().unwrap();

    assert!(pom.contains("<groupId>com.grail.srpc</groupId>"));
    assert!(pom.contains("<artifactId>srpc-api</artifactId>"));
    // the source-tree direct is emitted first and, being buildable, picks
    // up the configured jar classifier
    let base_at = pom.find("<artifactId>srpc-base</artifactId>").unwrap();
    let guava_at = pom.find("<artifactId>guava</artifactId>").unwrap();
    assert!(base_at < guava_at);
    assert!(pom.contains("<classifier>jdk11</classifier>"));
    assert_eq!(3, generator.artifact_transitive_closure().len());
}

#[test]
fn registry_reuse_requires_clear() {
    let temp = repo();
    let config = Config::load(&temp.path().join("relgen.toml")).unwrap();
    let mut strategy = MavenGenerationStrategy::new(temp.path(), &config).unwrap();
    strategy.initialize().unwrap();

    // re-running resolution without clearing duplicates every registration
    assert!(strategy.initialize().is_err());

    strategy.clear();
    strategy.initialize().unwrap();
    let guava = strategy
        .load_dependency(&label("@maven//:com_google_guava_guava"), None)
        .unwrap();
    assert_eq!(2, strategy.load_transitive_closure(&guava).len());
}

#[test]
fn python_resolution_end_to_end() {
    let temp = repo();
    let config = Config::load(&temp.path().join("relgen.toml")).unwrap();
    let mut strategy = PyGenerationStrategy::new(temp.path(), &config);
    strategy.initialize().unwrap();

    let pandas = strategy.load_dependency(&label("@pip//pandas"), None).unwrap();
    assert_eq!("2.2.1", pandas.version());
    assert!(strategy.load_transitive_closure(&pandas).is_empty());

    let def = ArtifactDef::parse(
        "artifact(\n  group_id = \"-\",\n  artifact_id = \"phone\",\n  version = \"0.3.0\",\n)\n",
        "communicator/phone",
    )
    .unwrap();
    let mut context = GenerationContext::new(label("//communicator/phone"), Arc::clone(&def));
    context.register_direct_dependencies(vec![pandas]);
    context.register_artifact_transitive_closure(vec![]);
    context.register_library_transitive_closure(vec![]);

    let output = strategy.new_generator(&context).unwrap().generate().unwrap();
    assert!(output.contains("name = \"phone\""));
    assert!(output.contains("\"pandas==2.2.1\","));
}

#[test]
fn unknown_labels_fail_with_known_dependency_listing() {
    let temp = repo();
    let config = Config::load(&temp.path().join("relgen.toml")).unwrap();
    let mut strategy = MavenGenerationStrategy::new(temp.path(), &config).unwrap();
    strategy.initialize().unwrap();

    let err = strategy
        .load_dependency(&label("@maven//:org_junit_jupiter_junit_jupiter"), None)
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("org_junit_jupiter_junit_jupiter"));
    assert!(message.contains("@maven//:com_google_guava_guava"));
    assert!(message.contains("@upgrade//:org_checkerframework_checker_qual"));
}
