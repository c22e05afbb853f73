use std::collections::BTreeMap;

use metricgen_core::{Generator, MetricInfo, MetricMeta};

use crate::args::Args;
use crate::registry::{ArgHelp, Definition, Help, Target};
use crate::{resolve_labels, GeneratorMarker, JsonPath, Marker, MarkerError};

pub const INFO_MARKER: &str = "Metrics:info";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoMarker {
    pub name: String,
    pub help: String,
    pub labels_from_path: BTreeMap<String, JsonPath>,
    pub json_path: JsonPath,
    pub label_from_key: String,
}

impl InfoMarker {
    fn from_args(args: &Args) -> Result<Self, MarkerError> {
        Ok(Self {
            name: args.required_string("name")?,
            help: args.string("help")?.unwrap_or_default(),
            labels_from_path: args.map("labelsFromPath")?.into_iter().map(|(k, v)| (k, JsonPath(v))).collect(),
            json_path: JsonPath(args.string("JSONPath")?.unwrap_or_default()),
            label_from_key: args.string("labelFromKey")?.unwrap_or_default(),
        })
    }
}

pub(crate) fn definition() -> Definition {
    Definition::new(
        INFO_MARKER,
        &[Target::Field, Target::Type],
        Help {
            category: "Metrics",
            summary: "Defines a Info metric and uses the implicit path to the field as path for the metric configuration.",
            args: vec![
                ArgHelp::required("name", "string", "metric name"),
                ArgHelp::optional("help", "string", "help text of the metric"),
                ArgHelp::optional("labelsFromPath", "map[string]string", "labels and the paths of their values"),
                ArgHelp::optional("JSONPath", "string", "path appended to the field path"),
                ArgHelp::optional("labelFromKey", "string", "label that receives the map key when the path selects a map"),
            ],
        },
        |args| InfoMarker::from_args(args).map(Marker::Info),
    )
}

impl GeneratorMarker for InfoMarker {
    fn to_generator(&self, base: &[String]) -> Result<Generator, MarkerError> {
        let mut path = base.to_vec();
        if !self.json_path.is_empty() {
            path.extend(self.json_path.parse()?);
        }
        let info = MetricInfo {
            meta: MetricMeta { labels_from_path: resolve_labels(&self.labels_from_path)?, path },
            label_from_key: self.label_from_key.clone(),
        };
        Ok(Generator::new(&self.name, &self.help, info))
    }
}
