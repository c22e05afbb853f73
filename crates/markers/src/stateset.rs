use std::collections::BTreeMap;

use metricgen_core::{Generator, MetricMeta, MetricStateSet};

use crate::args::Args;
use crate::registry::{ArgHelp, Definition, Help, Target};
use crate::{resolve_labels, GeneratorMarker, JsonPath, Marker, MarkerError};

pub const STATESET_MARKER: &str = "Metrics:stateset";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSetMarker {
    pub name: String,
    pub help: String,
    pub labels_from_path: BTreeMap<String, JsonPath>,
    pub json_path: Option<JsonPath>,
    pub label_name: String,
    pub list: Vec<String>,
    pub value_from: Option<JsonPath>,
}

impl StateSetMarker {
    fn from_args(args: &Args) -> Result<Self, MarkerError> {
        let list = args.list("list")?.ok_or_else(|| MarkerError::MissingArgument {
            marker: STATESET_MARKER.to_string(),
            arg: "list".to_string(),
        })?;
        Ok(Self {
            name: args.required_string("name")?,
            help: args.string("help")?.unwrap_or_default(),
            labels_from_path: args.map("labelsFromPath")?.into_iter().map(|(k, v)| (k, JsonPath(v))).collect(),
            json_path: args.string("JSONPath")?.map(JsonPath),
            label_name: args.string("labelName")?.unwrap_or_default(),
            list,
            value_from: args.string("valueFrom")?.map(JsonPath),
        })
    }
}

pub(crate) fn definition() -> Definition {
    Definition::new(
        STATESET_MARKER,
        &[Target::Field, Target::Type],
        Help {
            category: "Metrics",
            summary: "Defines a StateSet metric and uses the implicit path to the field as path for the metric configuration.",
            args: vec![
                ArgHelp::required("name", "string", "metric name"),
                ArgHelp::optional("help", "string", "help text of the metric"),
                ArgHelp::optional("labelsFromPath", "map[string]string", "labels and the paths of their values"),
                ArgHelp::optional("JSONPath", "string", "path appended to the field path"),
                ArgHelp::optional("labelName", "string", "label that carries the state; defaults to \"state\" in the collector"),
                ArgHelp::required("list", "[]string", "every possible state"),
                ArgHelp::optional("valueFrom", "string", "path of the state value relative to the metric path"),
            ],
        },
        |args| StateSetMarker::from_args(args).map(Marker::StateSet),
    )
}

impl GeneratorMarker for StateSetMarker {
    fn to_generator(&self, base: &[String]) -> Result<Generator, MarkerError> {
        let mut path = base.to_vec();
        if let Some(extra) = &self.json_path {
            path.extend(extra.parse()?);
        }
        let value_from = match &self.value_from {
            Some(p) => p.parse()?,
            None => Vec::new(),
        };
        let state_set = MetricStateSet {
            meta: MetricMeta { labels_from_path: resolve_labels(&self.labels_from_path)?, path },
            list: self.list.clone(),
            label_name: self.label_name.clone(),
            value_from,
        };
        Ok(Generator::new(&self.name, &self.help, state_set))
    }
}
