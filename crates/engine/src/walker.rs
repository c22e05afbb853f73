//! Walks a field's declared type and asks for the generators of the named
//! type behind it.

use metricgen_core::Generator;
use tracing::debug;

use crate::error::FatalError;
use crate::graph::{PackageId, Position, Resolution, TypeExpr, TypeGraph, TypeIdent};

/// Supplies the generators of a named type; implemented by the assembler.
pub trait GeneratorRequester {
    fn generators_for_type(&mut self, ident: &TypeIdent) -> Result<Vec<Generator>, FatalError>;
}

/// Where the type expression being walked was written.
pub struct GeneratorContext<'a> {
    pub graph: &'a dyn TypeGraph,
    pub package: &'a PackageId,
    /// The field declaring the type, for error messages.
    pub position: &'a Position,
}

impl GeneratorContext<'_> {
    fn unsupported(&self, expr: &TypeExpr) -> FatalError {
        FatalError::UnsupportedType { expr: expr.to_string(), position: self.position.clone() }
    }
}

pub fn generators_for(
    ctx: &GeneratorContext<'_>,
    expr: &TypeExpr,
    requester: &mut dyn GeneratorRequester,
) -> Result<Vec<Generator>, FatalError> {
    match expr {
        TypeExpr::Ident(name) => named_to_generators(ctx, std::slice::from_ref(name), requester),
        TypeExpr::Qualified { qualifier, name } => {
            let mut path = qualifier.clone();
            path.push(name.clone());
            named_to_generators(ctx, &path, requester)
        }
        TypeExpr::Pointer(inner) => generators_for(ctx, inner, requester),
        // No per-element metrics inside lists or maps.
        TypeExpr::Array(_) | TypeExpr::Map { .. } => Ok(Vec::new()),
        TypeExpr::Tuple(elems) if elems.is_empty() => Ok(Vec::new()),
        TypeExpr::Tuple(_) | TypeExpr::Interface(_) | TypeExpr::Unsupported(_) => Err(ctx.unsupported(expr)),
    }
}

fn named_to_generators(
    ctx: &GeneratorContext<'_>,
    path: &[String],
    requester: &mut dyn GeneratorRequester,
) -> Result<Vec<Generator>, FatalError> {
    match ctx.graph.resolve(ctx.package, path) {
        Resolution::Named(ident) => requester.generators_for_type(&ident),
        Resolution::Basic => Ok(Vec::new()),
        Resolution::Unresolved => {
            // Expected for types from packages that were not loaded; their
            // markers are ignored.
            debug!(ty = %path.join("::"), package = %ctx.package, "type not resolved; skipping");
            Ok(Vec::new())
        }
    }
}
