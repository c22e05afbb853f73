//! The type graph the engine walks, and the provider trait that supplies it.

use std::fmt;
use std::path::PathBuf;

use metricgen_markers::Marker;

/// Identity of a loaded package (for source packages: its directory).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A declared type: `(package, name)`. Memoization key of the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdent {
    pub package: PackageId,
    pub name: String,
}

impl TypeIdent {
    pub fn new(package: PackageId, name: impl Into<String>) -> Self { Self { package, name: name.into() } }
}

impl fmt::Display for TypeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}::{}", self.package, self.name) }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { group: group.into(), kind: kind.into() }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}/{}", self.group, self.kind) }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

/// Source location of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Shape of a field's declared type, as far as the walker cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `Foo`
    Ident(String),
    /// `common::Condition`, `super::v1::Foo`
    Qualified { qualifier: Vec<String>, name: String },
    /// `Option<T>`, `Box<T>`, `&T`, ...
    Pointer(Box<TypeExpr>),
    /// `Vec<T>`, `[T; N]`, sets
    Array(Box<TypeExpr>),
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    /// `()` or an anonymous tuple.
    Tuple(Vec<TypeExpr>),
    /// `dyn Trait` / `impl Trait`
    Interface(String),
    /// Anything else, kept as source text for messages.
    Unsupported(String),
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Ident(name) => f.write_str(name),
            TypeExpr::Qualified { qualifier, name } => write!(f, "{}::{}", qualifier.join("::"), name),
            TypeExpr::Pointer(inner) => write!(f, "Option<{}>", inner),
            TypeExpr::Array(inner) => write!(f, "Vec<{}>", inner),
            TypeExpr::Map { key, value } => write!(f, "Map<{}, {}>", key, value),
            TypeExpr::Tuple(elems) => {
                let parts: Vec<String> = elems.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            TypeExpr::Interface(src) | TypeExpr::Unsupported(src) => f.write_str(src),
        }
    }
}

/// How a field appears in the serialized object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Serialization {
    /// Serialized under this key.
    Named(String),
    /// Fields are inlined into the parent object.
    Flatten,
    /// Never serialized.
    Skip,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    /// `None` when the owning type is not serialized at all.
    pub serialization: Option<Serialization>,
    pub ty: TypeExpr,
    pub markers: Vec<Marker>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub ident: TypeIdent,
    pub markers: Vec<Marker>,
    /// Declaration order.
    pub fields: Vec<FieldInfo>,
    pub position: Position,
}

impl TypeInfo {
    /// Carries `+Metrics:gvk`.
    pub fn is_tracked_kind(&self) -> bool { self.markers.iter().any(Marker::is_gvk) }
}

/// Outcome of resolving a type name in the context of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Named(TypeIdent),
    /// Primitive; cannot carry markers.
    Basic,
    /// Outside the loaded packages.
    Unresolved,
}

/// Read-only view of all loaded packages.
pub trait TypeGraph {
    fn type_info(&self, ident: &TypeIdent) -> Option<&TypeInfo>;

    /// Resolve a (possibly qualified) type path as written in `context`.
    fn resolve(&self, context: &PackageId, path: &[String]) -> Resolution;

    /// Packages whose group is `group`, in a stable order.
    fn packages_declaring_group(&self, group: &str) -> Vec<PackageId>;

    fn group_version_of(&self, package: &PackageId) -> Option<&GroupVersion>;

    /// Packages named on the command line, in the order given.
    fn roots(&self) -> Vec<PackageId>;

    /// Types declared in `package`, in declaration order.
    fn types_in(&self, package: &PackageId) -> Vec<&TypeInfo>;
}
