//! Markers that act on the resource of a Kind rather than producing metrics.

use metricgen_core::Resource;

use crate::args::Args;
use crate::registry::{ArgHelp, Definition, Help, Target};
use crate::{JsonPath, Marker, MarkerError, ResourceMarker};

pub const GVK_MARKER: &str = "Metrics:gvk";
pub const NAME_PREFIX_MARKER: &str = "Metrics:namePrefix";
pub const LABEL_FROM_PATH_MARKER: &str = "Metrics:labelFromPath";
pub const GROUP_NAME_MARKER: &str = "groupName";
pub const VERSION_NAME_MARKER: &str = "versionName";

/// Marks a type as a Kind that gets its own resource configuration.
/// Types without it are only expanded when nested in a marked Kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GvkMarker {
    pub name_prefix: Option<String>,
}

impl ResourceMarker for GvkMarker {
    fn apply_to_resource(&self, resource: &mut Resource) -> Result<(), MarkerError> {
        if let Some(prefix) = self.name_prefix.as_ref().filter(|p| !p.is_empty()) {
            resource.metric_name_prefix = Some(prefix.clone());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePrefixMarker(pub String);

impl ResourceMarker for NamePrefixMarker {
    fn apply_to_resource(&self, resource: &mut Resource) -> Result<(), MarkerError> {
        resource.metric_name_prefix = Some(self.0.clone());
        Ok(())
    }
}

/// `+Metrics:labelFromPath:name=<string>,JSONPath=<string>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFromPathMarker {
    pub name: String,
    pub json_path: JsonPath,
}

impl ResourceMarker for LabelFromPathMarker {
    fn apply_to_resource(&self, resource: &mut Resource) -> Result<(), MarkerError> {
        let elems = self.json_path.parse()?;
        if let Some(existing) = resource.labels_from_path.get(&self.name) {
            if *existing != elems {
                return Err(MarkerError::Conflict(self.name.clone()));
            }
            return Ok(());
        }
        resource.labels_from_path.insert(self.name.clone(), elems);
        Ok(())
    }
}

fn single_value(args: &Args) -> Result<String, MarkerError> {
    args.required_string("")
}

pub(crate) fn group_name_definition() -> Definition {
    Definition::anonymous(
        GROUP_NAME_MARKER,
        &[Target::Package],
        Help { category: "", summary: "API group of the package.", args: Vec::new() },
        |args| single_value(args).map(Marker::GroupName),
    )
}

pub(crate) fn version_name_definition() -> Definition {
    Definition::anonymous(
        VERSION_NAME_MARKER,
        &[Target::Package],
        Help { category: "", summary: "API version of the package; defaults to the directory name.", args: Vec::new() },
        |args| single_value(args).map(Marker::VersionName),
    )
}

pub(crate) fn gvk_definition() -> Definition {
    Definition::new(
        GVK_MARKER,
        &[Target::Type],
        Help {
            category: "Metrics",
            summary: "enables the creation of a customresourcestate Resource for the CRD.",
            args: vec![ArgHelp::optional("namePrefix", "string", "prefix for all metric names of the resource")],
        },
        |args| Ok(Marker::Gvk(GvkMarker { name_prefix: args.string("namePrefix")? })),
    )
}

pub(crate) fn name_prefix_definition() -> Definition {
    Definition::anonymous(
        NAME_PREFIX_MARKER,
        &[Target::Type],
        Help {
            category: "Metrics",
            summary: "uses the given prefix for the metrics of the customresourcestate Resource.",
            args: Vec::new(),
        },
        |args| single_value(args).map(|p| Marker::NamePrefix(NamePrefixMarker(p))),
    )
}

pub(crate) fn label_from_path_definition() -> Definition {
    Definition::new(
        LABEL_FROM_PATH_MARKER,
        &[Target::Type, Target::Field],
        Help {
            category: "Metrics",
            summary: "adds an additional label to all metrics of this field or type with a value from the given JSONPath.",
            args: vec![
                ArgHelp::required("name", "string", "label name"),
                ArgHelp::required("JSONPath", "string", "path of the label value"),
            ],
        },
        |args| {
            Ok(Marker::LabelFromPath(LabelFromPathMarker {
                name: args.required_string("name")?,
                json_path: JsonPath(args.required_string("JSONPath")?),
            }))
        },
    )
}
