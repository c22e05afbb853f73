use std::collections::BTreeMap;

use metricgen_core::{Generator, MetricGauge, MetricMeta};

use crate::args::Args;
use crate::registry::{ArgHelp, Definition, Help, Target};
use crate::{resolve_labels, GeneratorMarker, JsonPath, Marker, MarkerError};

pub const GAUGE_MARKER: &str = "Metrics:gauge";

/// `+Metrics:gauge:name=<string>[,help=..][,JSONPath=..][,labelFromKey=..][,labelsFromPath={..}][,nilIsZero][,valueFrom=..]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GaugeMarker {
    pub name: String,
    pub help: String,
    pub json_path: JsonPath,
    pub label_from_key: String,
    pub labels_from_path: BTreeMap<String, JsonPath>,
    pub nil_is_zero: bool,
    pub value_from: Option<JsonPath>,
}

impl GaugeMarker {
    fn from_args(args: &Args) -> Result<Self, MarkerError> {
        Ok(Self {
            name: args.required_string("name")?,
            help: args.string("help")?.unwrap_or_default(),
            json_path: JsonPath(args.string("JSONPath")?.unwrap_or_default()),
            label_from_key: args.string("labelFromKey")?.unwrap_or_default(),
            labels_from_path: args.map("labelsFromPath")?.into_iter().map(|(k, v)| (k, JsonPath(v))).collect(),
            nil_is_zero: args.bool("nilIsZero")?,
            value_from: args.string("valueFrom")?.map(JsonPath),
        })
    }
}

pub(crate) fn definition() -> Definition {
    Definition::new(
        GAUGE_MARKER,
        &[Target::Field, Target::Type],
        Help {
            category: "Metrics",
            summary: "Defines a Gauge metric and uses the implicit path to the field joined by the provided JSONPath as path for the metric configuration.",
            args: vec![
                ArgHelp::required("name", "string", "metric name, appended to the resource's name prefix"),
                ArgHelp::optional("help", "string", "help text of the metric"),
                ArgHelp::optional("JSONPath", "string", "path appended to the field path"),
                ArgHelp::optional("labelFromKey", "string", "label that receives the map key when the path selects a map"),
                ArgHelp::optional("labelsFromPath", "map[string]string", "additional labels and the paths of their values"),
                ArgHelp::optional("nilIsZero", "bool", "report 0 when the value is missing"),
                ArgHelp::optional("valueFrom", "string", "path of the value relative to the metric path"),
            ],
        },
        |args| GaugeMarker::from_args(args).map(Marker::Gauge),
    )
}

impl GeneratorMarker for GaugeMarker {
    fn to_generator(&self, base: &[String]) -> Result<Generator, MarkerError> {
        let mut path = base.to_vec();
        path.extend(self.json_path.parse()?);
        let value_from = match &self.value_from {
            Some(p) => p.parse()?,
            None => Vec::new(),
        };
        let gauge = MetricGauge {
            meta: MetricMeta { labels_from_path: resolve_labels(&self.labels_from_path)?, path },
            value_from,
            label_from_key: self.label_from_key.clone(),
            nil_is_zero: self.nil_is_zero,
        };
        Ok(Generator::new(&self.name, &self.help, gauge))
    }
}
