#![forbid(unsafe_code)]

use metricgen_core::Metric;
use metricgen_engine::{generate, FatalError, PackageId, Resolution, TypeGraph};
use metricgen_loader::{LoadError, Loader, MemTree};
use metricgen_markers::{MarkerError, Registry};

const LIB: &str = "pub mod api;\n";

const COMMON: &str = r##"
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// +Metrics:stateset:name=condition,list={True,False,Unknown},labelName=status
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
}
"##;

const WIDGETS: &str = r##"//! Widget API.
//! +groupName=example.com

use serde::{Deserialize, Serialize};
use crate::api::common::Condition;

/// Widget is the tracked kind.
/// +Metrics:gvk
/// +Metrics:namePrefix=widgets
/// +Metrics:labelFromPath:name=owner,JSONPath=.metadata.labels.owner
#[derive(Debug, Serialize, Deserialize)]
pub struct Widget {
    /// +Metrics:gauge:name=widget_size,JSONPath=.size,help="Requested size"
    pub spec: WidgetSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WidgetStatus>,
    pub metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WidgetSpec {
    pub size: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStatus {
    /// +Metrics:gauge:name=ready_replicas,nilIsZero
    pub ready_replicas: Option<i32>,
    pub conditions: Vec<Condition>,
    pub primary: Option<Condition>,
    /// +Metrics:gauge:name=cache
    #[serde(skip)]
    pub cache: u64,
}
"##;

fn widget_tree() -> MemTree {
    MemTree::new()
        .with("src/lib.rs", LIB)
        .with("src/api/common/mod.rs", COMMON)
        .with("src/api/v1/mod.rs", WIDGETS)
}

#[test]
fn widget_document() {
    let registry = Registry::metrics();
    let universe = Loader::new(widget_tree(), &registry).load_roots(&["src/api/v1"]).unwrap();
    assert!(universe.diagnostics().is_empty(), "{:?}", universe.diagnostics());
    assert!(universe.package(&PackageId::new("src/api/common")).is_some(), "imported package is loaded");

    let out = generate(&universe).unwrap();
    assert!(out.is_clean(), "{:?}", out.diagnostics);
    let resources = &out.document.spec.resources;
    assert_eq!(resources.len(), 1);
    let widget = &resources[0];
    assert_eq!(widget.gvk_key(), "example.com/v1/Widget");
    assert_eq!(widget.metric_name_prefix.as_deref(), Some("widgets"));
    assert_eq!(widget.labels_from_path["owner"], ["metadata", "labels", "owner"]);

    let got: Vec<(&str, &str, Vec<String>)> =
        widget.metrics.iter().map(|g| (g.name.as_str(), g.each.type_name(), g.path().to_vec())).collect();
    let path = |p: &[&str]| p.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    assert_eq!(got, vec![
        ("condition", "StateSet", path(&["status", "primary", "status"])),
        ("ready_replicas", "Gauge", path(&["status", "readyReplicas"])),
        ("widget_size", "Gauge", path(&["spec", "size"])),
    ]);
    assert_eq!(widget.metrics[2].help, "Requested size");
    match &widget.metrics[1].each {
        Metric::Gauge { gauge } => assert!(gauge.nil_is_zero),
        other => panic!("unexpected metric {other:?}"),
    }
}

#[test]
fn output_is_byte_identical_across_runs() {
    let registry = Registry::metrics();
    let render = || {
        let universe = Loader::new(widget_tree(), &registry).load_roots(&["./src/api/v1"]).unwrap();
        serde_yaml::to_string(&generate(&universe).unwrap().document).unwrap()
    };
    let first = render();
    assert_eq!(first, render());
    assert!(first.starts_with("kind: CustomResourceStateMetrics\n"));
}

#[test]
fn external_types_stay_unresolved() {
    let registry = Registry::metrics();
    let universe = Loader::new(widget_tree(), &registry).load_roots(&["src/api/v1"]).unwrap();
    let v1 = PackageId::new("src/api/v1");
    let meta: Vec<String> = "k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta"
        .split("::")
        .map(str::to_string)
        .collect();
    assert_eq!(universe.resolve(&v1, &meta), Resolution::Unresolved);
    assert_eq!(universe.resolve(&v1, &["i32".to_string()]), Resolution::Basic);
    assert!(matches!(universe.resolve(&v1, &["Condition".to_string()]), Resolution::Named(ref t) if t.package.as_str() == "src/api/common"));
}

#[test]
fn version_defaults_to_directory_and_kind_conflicts_across_versions() {
    let kind = |version_marker: &str| {
        format!(
            "//! +groupName=example.com\n{version_marker}\nuse serde::Serialize;\n/// +Metrics:gvk\n#[derive(Serialize)]\npub struct Widget {{\n    /// +Metrics:gauge:name=size\n    pub size: i32,\n}}\n"
        )
    };
    let registry = Registry::metrics();

    let tree = MemTree::new().with("v1/types.rs", kind("")).with("v2/types.rs", kind("//! +versionName=v2beta1"));
    let universe = Loader::new(tree, &registry).load_roots(&["v1", "v2"]).unwrap();
    assert_eq!(universe.group_version_of(&PackageId::new("v1")).unwrap().version, "v1");
    assert_eq!(universe.group_version_of(&PackageId::new("v2")).unwrap().version, "v2beta1");
    match generate(&universe) {
        Err(FatalError::VersionConflict { existing, found, .. }) => assert_eq!((existing.as_str(), found.as_str()), ("v1", "v2beta1")),
        other => panic!("expected a version conflict, got {other:?}"),
    }
}

#[test]
fn marker_errors_carry_positions() {
    let src = "//! +groupName=example.com\nuse serde::Serialize;\n\n/// +Metrics:gvk\n#[derive(Serialize)]\npub struct Widget {\n    /// +Metrics:gauge:JSONPath=.x\n    pub size: i32,\n    /// +Metrics:info:name=ok\n    pub owner: String,\n}\n";
    let registry = Registry::metrics();
    let mut universe = Loader::new(MemTree::new().with("v1/types.rs", src), &registry).load_roots(&["v1"]).unwrap();
    let diagnostics = universe.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(diagnostics[0].error, MarkerError::MissingArgument { ref arg, .. } if arg == "name"));
    assert_eq!(diagnostics[0].position.file.to_str(), Some("v1/types.rs"));
    assert_eq!(diagnostics[0].position.line, 7);

    let out = generate(&universe).unwrap();
    let names: Vec<&str> = out.document.spec.resources[0].metrics.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["ok"]);
}

#[test]
fn glob_imports_and_flattened_newtypes() {
    let shared = "use serde::Serialize;\n#[derive(Serialize)]\npub struct Replicas(\n    /// +Metrics:gauge:name=replicas\n    pub i32,\n);\n";
    let kind = "//! +groupName=example.com\nuse serde::Serialize;\nuse super::shared::*;\n/// +Metrics:gvk\n#[derive(Serialize)]\n#[serde(rename_all = \"camelCase\")]\npub struct Widget {\n    pub desired_replicas: Replicas,\n    #[serde(flatten)]\n    pub inline: Replicas,\n}\n";
    let tree = MemTree::new().with("api/shared/mod.rs", shared).with("api/v1/mod.rs", kind);
    let registry = Registry::metrics();
    let universe = Loader::new(tree, &registry).load_roots(&["api/v1"]).unwrap();
    let out = generate(&universe).unwrap();
    // Replicas is expanded once per run; the second occurrence adds nothing.
    let paths: Vec<Vec<String>> = out.document.spec.resources[0].metrics.iter().map(|g| g.path().to_vec()).collect();
    assert_eq!(paths, vec![vec!["desiredReplicas".to_string()]]);
}

#[test]
fn roots_without_kinds_or_sources_fail() {
    let registry = Registry::metrics();
    let tree = MemTree::new().with("v1/types.rs", "//! +groupName=example.com\npub struct Helper;\n");
    let universe = Loader::new(tree.clone(), &registry).load_roots(&["v1"]).unwrap();
    assert!(matches!(generate(&universe), Err(FatalError::NoKinds(_))));

    assert!(matches!(Loader::new(tree.clone(), &registry).load_roots(&["v9"]), Err(LoadError::NotAPackage(_))));

    let broken = tree.with("v2/types.rs", "pub struct {");
    let err = Loader::new(broken, &registry).load_roots(&["v2"]).unwrap_err();
    assert!(matches!(err, LoadError::Parse { line: 1, .. }), "{err}");
}

#[test]
fn grouped_root_without_metrics_does_not_abort_other_roots() {
    let registry = Registry::metrics();
    let widgets = "//! +groupName=example.com\n/// +Metrics:gvk\npub struct Widget {\n    /// +Metrics:gauge:name=size\n    pub size: i32,\n}\n";
    let gizmos = "//! +groupName=other.example.com\npub struct Gizmo {\n    pub size: i32,\n}\n";
    let tree = MemTree::new().with("widgets/v1/types.rs", widgets).with("gizmos/v1/types.rs", gizmos);
    let universe = Loader::new(tree, &registry).load_roots(&["widgets/v1", "gizmos/v1"]).unwrap();

    let out = generate(&universe).unwrap();
    assert!(out.is_clean(), "{:?}", out.diagnostics);
    let keys: Vec<String> = out.document.spec.resources.iter().map(|r| r.gvk_key()).collect();
    assert_eq!(keys, ["example.com/v1/Widget"]);
}

#[test]
fn packages_without_group_are_skipped() {
    let registry = Registry::metrics();
    let tree = MemTree::new().with("util/mod.rs", "/// +Metrics:gvk\npub struct Orphan;\n");
    let universe = Loader::new(tree, &registry).load_roots(&["util"]).unwrap();
    let out = generate(&universe).unwrap();
    assert!(out.document.spec.resources.is_empty());
}
