//! metric-gen engine: walks a [`TypeGraph`] of annotated API types and
//! assembles the CustomResourceStateMetrics document.
//!
//! The engine never touches source files; a loader supplies the graph.

#![forbid(unsafe_code)]

pub mod assembler;
pub mod document;
pub mod error;
pub mod graph;
mod resource;
pub mod walker;

use metricgen_core::MetricsDocument;
use tracing::{debug, info};

pub use assembler::MetricParser;
pub use document::{build_document, compare_resources};
pub use error::{Diagnostic, FatalError};
pub use graph::{
    FieldInfo, GroupKind, GroupVersion, PackageId, Position, Resolution, Serialization, TypeExpr, TypeGraph,
    TypeIdent, TypeInfo,
};

/// Result of a run that was not aborted. A non-empty `diagnostics` means
/// some markers were dropped and the document is incomplete.
#[derive(Debug)]
pub struct Generation {
    pub document: MetricsDocument,
    pub diagnostics: Vec<Diagnostic>,
}

impl Generation {
    pub fn is_clean(&self) -> bool { self.diagnostics.is_empty() }
}

/// Generate the document for every root package of `graph`.
///
/// A grouped root without tracked kinds is skipped; the run only fails with
/// [`FatalError::NoKinds`] when no grouped root has any.
pub fn generate(graph: &dyn TypeGraph) -> Result<Generation, FatalError> {
    let mut parser = MetricParser::new(graph);
    let mut empty = Vec::new();
    let mut tracked = 0;

    for root in graph.roots() {
        let Some(gv) = graph.group_version_of(&root) else {
            debug!(package = %root, "no group; skipping");
            continue;
        };
        let kinds: Vec<GroupKind> = graph
            .types_in(&root)
            .into_iter()
            .filter(|t| t.is_tracked_kind())
            .map(|t| GroupKind::new(gv.group.clone(), t.ident.name.clone()))
            .collect();
        if kinds.is_empty() {
            info!(package = %root, "no kinds marked with +Metrics:gvk; skipping");
            empty.push(root);
            continue;
        }
        tracked += kinds.len();
        info!(package = %root, group = %gv.group, version = %gv.version, kinds = kinds.len(), "collecting");
        for gk in &kinds {
            parser.resource_for(gk)?;
        }
    }

    if tracked == 0 && !empty.is_empty() {
        return Err(FatalError::NoKinds(empty));
    }

    let MetricParser { resources, diagnostics, .. } = parser;
    let document = build_document(resources.into_values());
    info!(resources = document.spec.resources.len(), diagnostics = diagnostics.len(), "document assembled");
    Ok(Generation { document, diagnostics })
}
