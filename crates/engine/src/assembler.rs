//! Generator assembly for a single type, recursing through its fields.

use metricgen_core::{Generator, Resource};
use metricgen_markers::Marker;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{Diagnostic, FatalError};
use crate::graph::{GroupKind, Position, Serialization, TypeGraph, TypeIdent};
use crate::walker::{self, GeneratorContext, GeneratorRequester};

/// Holds the state of one generation run: the memo caches and the
/// diagnostics collected on the way.
pub struct MetricParser<'g> {
    pub(crate) graph: &'g dyn TypeGraph,
    pub(crate) resources: FxHashMap<GroupKind, Resource>,
    flattened: FxHashMap<TypeIdent, Vec<Generator>>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'g> MetricParser<'g> {
    pub fn new(graph: &'g dyn TypeGraph) -> Self {
        Self { graph, resources: FxHashMap::default(), flattened: FxHashMap::default(), diagnostics: Vec::new() }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] { &self.diagnostics }

    /// Generators computed for `ident` on its first expansion.
    pub fn flattened(&self, ident: &TypeIdent) -> Option<&[Generator]> {
        self.flattened.get(ident).map(Vec::as_slice)
    }

    /// Generators of every marker in `markers`, rooted at `base`.
    /// Bad markers become diagnostics and contribute nothing.
    fn generators_from_markers(&mut self, markers: &[Marker], base: &[String], position: &Position) -> Vec<Generator> {
        let mut out = Vec::new();
        for marker in markers {
            let Some(gm) = marker.as_generator() else { continue };
            match gm.to_generator(base) {
                Ok(g) => out.push(g),
                Err(e) => self.diagnostics.push(Diagnostic::new(position.clone(), e)),
            }
        }
        out
    }

    /// Generators for `ident`. Computed once: later calls for the same type
    /// return nothing, which both ends recursion on self-referencing types
    /// and keeps a type reachable on several paths from being emitted twice.
    pub fn generators_for_type(&mut self, ident: &TypeIdent) -> Result<Vec<Generator>, FatalError> {
        if self.flattened.contains_key(ident) {
            debug!(ty = %ident, "already expanded");
            return Ok(Vec::new());
        }
        let graph = self.graph;
        let info = graph.type_info(ident).ok_or_else(|| FatalError::MissingTypeInfo(ident.clone()))?;
        self.flattened.insert(ident.clone(), Vec::new());

        let mut generators = self.generators_from_markers(&info.markers, &[], &info.position);
        for field in &info.fields {
            let prefix = match &field.serialization {
                // Not part of the serialized object.
                None | Some(Serialization::Skip) => continue,
                Some(Serialization::Named(name)) => Some(name.as_str()),
                Some(Serialization::Flatten) => None,
            };
            let base: Vec<String> = prefix.map(|p| vec![p.to_string()]).unwrap_or_default();

            for marker in field.markers.iter().filter(|m| m.as_resource().is_some()) {
                warn!(position = %field.position, ?marker, "resource markers only apply on types; ignoring");
            }
            generators.extend(self.generators_from_markers(&field.markers, &base, &field.position));

            let ctx = GeneratorContext { graph, package: &ident.package, position: &field.position };
            for generator in walker::generators_for(&ctx, &field.ty, self)? {
                generators.push(match prefix {
                    Some(p) => generator.prepend_path(p),
                    None => generator,
                });
            }
        }

        self.flattened.insert(ident.clone(), generators.clone());
        Ok(generators)
    }
}

impl GeneratorRequester for MetricParser<'_> {
    fn generators_for_type(&mut self, ident: &TypeIdent) -> Result<Vec<Generator>, FatalError> {
        MetricParser::generators_for_type(self, ident)
    }
}
