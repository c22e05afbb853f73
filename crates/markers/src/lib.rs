//! metric-gen markers: typed values of `+Metrics:...` doc-comment markers.
//!
//! A marker either produces a [`Generator`] (gauge, info, stateset) or
//! mutates the [`Resource`] of the Kind it is attached to (gvk, namePrefix,
//! labelFromPath). Package markers (`groupName`, `versionName`) only feed the
//! loader.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use metricgen_core::{Generator, LabelsFromPath, PathError, Resource};
use thiserror::Error;

pub mod args;
mod gauge;
mod info;
pub mod registry;
mod resource;
mod stateset;

pub use gauge::GaugeMarker;
pub use info::InfoMarker;
pub use registry::{Definition, Help, Registry, Target};
pub use resource::{GvkMarker, LabelFromPathMarker, NamePrefixMarker};
pub use stateset::StateSetMarker;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("duplicate definition for label {0:?}")]
    Conflict(String),
    #[error("marker {marker}: {reason}")]
    Syntax { marker: String, reason: String },
    #[error("marker {marker}: missing argument {arg:?}")]
    MissingArgument { marker: String, arg: String },
    #[error("marker {marker}: unknown argument {arg:?}")]
    UnknownArgument { marker: String, arg: String },
    #[error("marker {marker}: argument {arg:?} {reason}")]
    InvalidValue { marker: String, arg: String, reason: String },
    #[error("marker {marker} cannot be used on a {target}")]
    WrongTarget { marker: String, target: Target },
}

/// A path expression as written in a marker argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(pub String);

impl JsonPath {
    pub fn new(expr: impl Into<String>) -> Self { Self(expr.into()) }

    pub fn is_empty(&self) -> bool { self.0.trim().is_empty() }

    pub fn parse(&self) -> Result<Vec<String>, PathError> { metricgen_core::resolve(&self.0) }
}

/// Resolve every `labelsFromPath` entry; `.` maps to the empty path.
pub(crate) fn resolve_labels(labels: &BTreeMap<String, JsonPath>) -> Result<LabelsFromPath, MarkerError> {
    let mut out = LabelsFromPath::new();
    for (name, path) in labels {
        out.insert(name.clone(), path.parse()?);
    }
    Ok(out)
}

/// Marker that knows how to create a generator from itself.
pub trait GeneratorMarker {
    /// Build the generator; `base` is the path of the annotated field.
    fn to_generator(&self, base: &[String]) -> Result<Generator, MarkerError>;
}

/// Marker that applies itself to the resource of the annotated Kind.
/// Called after the resource's generators are populated.
pub trait ResourceMarker {
    fn apply_to_resource(&self, resource: &mut Resource) -> Result<(), MarkerError>;
}

/// Every marker value the registry can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    GroupName(String),
    VersionName(String),
    Gvk(GvkMarker),
    NamePrefix(NamePrefixMarker),
    LabelFromPath(LabelFromPathMarker),
    Gauge(GaugeMarker),
    Info(InfoMarker),
    StateSet(StateSetMarker),
}

impl Marker {
    pub fn as_generator(&self) -> Option<&dyn GeneratorMarker> {
        match self {
            Marker::Gauge(m) => Some(m),
            Marker::Info(m) => Some(m),
            Marker::StateSet(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&dyn ResourceMarker> {
        match self {
            Marker::Gvk(m) => Some(m),
            Marker::NamePrefix(m) => Some(m),
            Marker::LabelFromPath(m) => Some(m),
            _ => None,
        }
    }

    /// Whether this is the marker that makes a type a tracked Kind.
    pub fn is_gvk(&self) -> bool { matches!(self, Marker::Gvk(_)) }
}
