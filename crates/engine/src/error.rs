use std::fmt;

use metricgen_markers::MarkerError;
use thiserror::Error;

use crate::graph::{GroupKind, PackageId, Position, TypeIdent};

/// Errors that abort the whole run: the input broke an assumption of the
/// generator and any document would be wrong.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{position}: unsupported field type `{expr}`")]
    UnsupportedType { expr: String, position: Position },
    #[error("expected to get type info for {0} but it does not exist")]
    MissingTypeInfo(TypeIdent),
    #[error("{group_kind}: version is already set to {existing}, {package} declares {found}")]
    VersionConflict { group_kind: GroupKind, existing: String, found: String, package: PackageId },
    #[error("no kinds marked with +Metrics:gvk in the root packages {}", join(.0))]
    NoKinds(Vec<PackageId>),
}

fn join(packages: &[PackageId]) -> String {
    packages.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// A recoverable marker problem tied to the declaration it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: Position,
    pub error: MarkerError,
}

impl Diagnostic {
    pub fn new(position: Position, error: impl Into<MarkerError>) -> Self {
        Self { position, error: error.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.position, self.error) }
}

impl std::error::Error for Diagnostic {}
