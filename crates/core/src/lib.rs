//! metric-gen core types: the CustomResourceStateMetrics document model.
//!
//! The model mirrors the configuration consumed by kube-state-metrics'
//! custom resource state collector. Everything here is plain data; the
//! engine crate decides what goes into it.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use kube::core::GroupVersionKind;

pub mod path;

pub use path::{resolve, PathError};

/// Discriminator written at the top of every generated document.
pub const DOCUMENT_KIND: &str = "CustomResourceStateMetrics";

/// Label name -> path segments locating the label value.
pub type LabelsFromPath = BTreeMap<String, Vec<String>>;

fn is_false(b: &bool) -> bool { !*b }

/// Fields shared by every metric kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricMeta {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels_from_path: LabelsFromPath,
    /// Location of the value inside a serialized object.
    #[serde(default)]
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricGauge {
    #[serde(flatten)]
    pub meta: MetricMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_from: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_from_key: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nil_is_zero: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricInfo {
    #[serde(flatten)]
    pub meta: MetricMeta,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_from_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStateSet {
    #[serde(flatten)]
    pub meta: MetricMeta,
    #[serde(default)]
    pub list: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_from: Vec<String>,
}

/// Metric payload, tagged by `type` the way the collector expects:
/// `{type: Gauge, gauge: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Metric {
    Gauge { gauge: MetricGauge },
    Info { info: MetricInfo },
    StateSet {
        #[serde(rename = "stateSet")]
        state_set: MetricStateSet,
    },
}

impl Metric {
    pub fn type_name(&self) -> &'static str {
        match self {
            Metric::Gauge { .. } => "Gauge",
            Metric::Info { .. } => "Info",
            Metric::StateSet { .. } => "StateSet",
        }
    }

    pub fn meta(&self) -> &MetricMeta {
        match self {
            Metric::Gauge { gauge } => &gauge.meta,
            Metric::Info { info } => &info.meta,
            Metric::StateSet { state_set } => &state_set.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut MetricMeta {
        match self {
            Metric::Gauge { gauge } => &mut gauge.meta,
            Metric::Info { info } => &mut info.meta,
            Metric::StateSet { state_set } => &mut state_set.meta,
        }
    }

    pub fn path(&self) -> &[String] { &self.meta().path }

    /// Insert `segment` in front of the metric path, whatever the kind.
    pub fn prepend_path(&mut self, segment: &str) {
        self.meta_mut().path.insert(0, segment.to_string());
    }
}

impl From<MetricGauge> for Metric {
    fn from(gauge: MetricGauge) -> Self { Metric::Gauge { gauge } }
}

impl From<MetricInfo> for Metric {
    fn from(info: MetricInfo) -> Self { Metric::Info { info } }
}

impl From<MetricStateSet> for Metric {
    fn from(state_set: MetricStateSet) -> Self { Metric::StateSet { state_set } }
}

/// One emitted metric definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    pub each: Metric,
}

impl Generator {
    pub fn new(name: impl Into<String>, help: impl Into<String>, each: impl Into<Metric>) -> Self {
        Self { name: name.into(), help: help.into(), each: each.into() }
    }

    pub fn path(&self) -> &[String] { self.each.path() }

    /// Builder-style variant of [`Metric::prepend_path`].
    pub fn prepend_path(mut self, segment: &str) -> Self {
        self.each.prepend_path(segment);
        self
    }
}

/// Metrics configuration for one Group/Kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub group_version_kind: GroupVersionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels_from_path: LabelsFromPath,
    #[serde(default)]
    pub metrics: Vec<Generator>,
}

impl Resource {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group_version_kind: GroupVersionKind {
                group: group.to_string(),
                version: version.to_string(),
                kind: kind.to_string(),
            },
            metric_name_prefix: None,
            labels_from_path: LabelsFromPath::new(),
            metrics: Vec::new(),
        }
    }

    /// `group/version/kind`, used for ordering and messages.
    pub fn gvk_key(&self) -> String {
        let gvk = &self.group_version_kind;
        format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSpec {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Root of the generated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub kind: String,
    pub spec: MetricsSpec,
}

impl MetricsDocument {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { kind: DOCUMENT_KIND.to_string(), spec: MetricsSpec { resources } }
    }
}

pub mod prelude {
    pub use super::{
        Generator, GroupVersionKind, LabelsFromPath, Metric, MetricGauge, MetricInfo, MetricMeta,
        MetricStateSet, MetricsDocument, Resource,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauge(path: &[&str]) -> Generator {
        Generator::new(
            "g",
            "",
            MetricGauge {
                meta: MetricMeta { path: path.iter().map(|s| s.to_string()).collect(), ..Default::default() },
                ..Default::default()
            },
        )
    }

    #[test]
    fn prepend_path_is_symmetric_across_kinds() {
        let meta = MetricMeta { path: vec!["replicas".into()], ..Default::default() };
        let kinds: Vec<Metric> = vec![
            MetricGauge { meta: meta.clone(), ..Default::default() }.into(),
            MetricInfo { meta: meta.clone(), ..Default::default() }.into(),
            MetricStateSet { meta, ..Default::default() }.into(),
        ];
        for mut m in kinds {
            m.prepend_path("status");
            assert_eq!(m.path(), ["status", "replicas"], "kind {}", m.type_name());
        }
    }

    #[test]
    fn generator_serializes_in_collector_shape() {
        let g = gauge(&["spec", "size"]).prepend_path("x");
        let v = serde_json::to_value(&g).unwrap();
        assert_eq!(v, serde_json::json!({
            "name": "g",
            "each": { "type": "Gauge", "gauge": { "path": ["x", "spec", "size"] } }
        }));
    }

    #[test]
    fn stateset_uses_camel_case_key() {
        let s: Metric = MetricStateSet {
            list: vec!["Ready".into(), "Failed".into()],
            label_name: "phase".into(),
            ..Default::default()
        }
        .into();
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["type"], "StateSet");
        assert_eq!(v["stateSet"]["labelName"], "phase");
        assert_eq!(v["stateSet"]["list"], serde_json::json!(["Ready", "Failed"]));
    }

    #[test]
    fn document_carries_fixed_kind() {
        let mut r = Resource::new("example.com", "v1", "Widget");
        r.metric_name_prefix = Some("widgets".into());
        r.metrics.push(gauge(&["spec", "size"]));
        let doc = MetricsDocument::new(vec![r]);
        let yaml = serde_yaml::to_string(&doc).unwrap();
        assert!(yaml.starts_with("kind: CustomResourceStateMetrics\n"));
        assert!(yaml.contains("metricNamePrefix: widgets"));
        assert!(yaml.contains("groupVersionKind:"));
        let back: MetricsDocument = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, doc);
    }
}
