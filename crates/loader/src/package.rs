//! Parsing of one package directory into type declarations.

use std::path::{Path, PathBuf};

use metricgen_engine::{
    Diagnostic, FieldInfo, GroupVersion, PackageId, Position, Resolution, Serialization, TypeInfo, TypeIdent,
};
use metricgen_markers::{Marker, Registry, Target};
use proc_macro2::Span;
use rustc_hash::FxHashMap;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, Fields, Item, Lit, Meta, UseTree};
use tracing::{debug, warn};

use crate::serde_attrs::ContainerAttrs;
use crate::tree::SourceTree;
use crate::types::type_expr;
use crate::LoadError;

/// A `use` declaration, flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Import {
    /// `use a::b::C;` or `use a::b::C as D;` (alias `D`).
    Name { alias: String, path: Vec<String> },
    /// `use a::b::*;`
    Glob(Vec<String>),
}

/// One loaded package: the Rust files directly inside a directory.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    pub dir: PathBuf,
    pub group_version: Option<GroupVersion>,
    pub imports: Vec<Import>,
    types: Vec<TypeInfo>,
    index: FxHashMap<String, usize>,
    pub(crate) resolutions: FxHashMap<Vec<String>, Resolution>,
}

impl Package {
    pub fn types(&self) -> &[TypeInfo] { &self.types }

    pub fn get(&self, name: &str) -> Option<&TypeInfo> { self.index.get(name).map(|&i| &self.types[i]) }

    pub fn declares(&self, name: &str) -> bool { self.index.contains_key(name) }

    /// Full path behind an imported name.
    pub fn import_path(&self, alias: &str) -> Option<&[String]> {
        self.imports.iter().find_map(|i| match i {
            Import::Name { alias: a, path } if a == alias => Some(path.as_slice()),
            _ => None,
        })
    }
}

pub fn package_id(dir: &Path) -> PackageId {
    if dir.as_os_str().is_empty() { PackageId::new(".") } else { PackageId::new(dir.display().to_string()) }
}

pub(crate) fn parse_package<T: SourceTree + ?Sized>(
    tree: &T,
    registry: &Registry,
    dir: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Package, LoadError> {
    let id = package_id(dir);
    let files = tree.rust_files(dir).map_err(|source| LoadError::Io { path: dir.to_path_buf(), source })?;

    let mut builder = PackageBuilder {
        id: id.clone(),
        registry,
        diagnostics,
        group: None,
        version: None,
        imports: Vec::new(),
        types: Vec::new(),
    };
    for file in &files {
        let text = tree.read(file).map_err(|source| LoadError::Io { path: file.clone(), source })?;
        let ast = syn::parse_file(&text).map_err(|e| LoadError::parse(file, &e))?;
        builder.file(file, &ast)?;
    }

    let version = builder.version.take().or_else(|| dir.file_name().map(|n| n.to_string_lossy().into_owned()));
    let group_version = match (builder.group.take(), version) {
        (Some(group), Some(version)) => Some(GroupVersion { group, version }),
        _ => None,
    };
    let index = builder.types.iter().enumerate().map(|(i, t)| (t.ident.name.clone(), i)).collect();
    debug!(package = %id, files = files.len(), types = builder.types.len(), "package parsed");
    Ok(Package {
        id,
        dir: dir.to_path_buf(),
        group_version,
        imports: builder.imports,
        types: builder.types,
        index,
        resolutions: FxHashMap::default(),
    })
}

struct PackageBuilder<'a> {
    id: PackageId,
    registry: &'a Registry,
    diagnostics: &'a mut Vec<Diagnostic>,
    group: Option<String>,
    version: Option<String>,
    imports: Vec<Import>,
    types: Vec<TypeInfo>,
}

fn position(file: &Path, span: Span) -> Position {
    let start = span.start();
    Position { file: file.to_path_buf(), line: start.line, column: start.column + 1 }
}

impl PackageBuilder<'_> {
    fn file(&mut self, file: &Path, ast: &syn::File) -> Result<(), LoadError> {
        for marker in self.markers(file, &ast.attrs, Target::Package) {
            match marker {
                Marker::GroupName(group) => set_once(&mut self.group, group, "groupName", file),
                Marker::VersionName(version) => set_once(&mut self.version, version, "versionName", file),
                _ => {}
            }
        }
        for item in &ast.items {
            match item {
                Item::Use(u) => flatten_use(&mut Vec::new(), &u.tree, &mut self.imports),
                Item::Struct(s) => {
                    let container = ContainerAttrs::parse(&s.attrs).map_err(|e| LoadError::parse(file, &e))?;
                    let fields = match &s.fields {
                        Fields::Named(named) => {
                            let mut fields = Vec::with_capacity(named.named.len());
                            for f in &named.named {
                                let Some(ident) = &f.ident else { continue };
                                let name = ident.unraw().to_string();
                                let serialization = if container.serialized {
                                    Some(container.field(&name, &f.attrs).map_err(|e| LoadError::parse(file, &e))?)
                                } else {
                                    None
                                };
                                fields.push(FieldInfo {
                                    markers: self.markers(file, &f.attrs, Target::Field),
                                    name,
                                    serialization,
                                    ty: type_expr(&f.ty),
                                    position: position(file, ident.span()),
                                });
                            }
                            fields
                        }
                        // A newtype serializes as its inner value.
                        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => unnamed
                            .unnamed
                            .iter()
                            .map(|f| FieldInfo {
                                name: "0".to_string(),
                                serialization: container.serialized.then_some(Serialization::Flatten),
                                ty: type_expr(&f.ty),
                                markers: self.markers(file, &f.attrs, Target::Field),
                                position: position(file, f.ty.span()),
                            })
                            .collect(),
                        _ => Vec::new(),
                    };
                    self.declare(file, &s.ident, &s.attrs, fields);
                }
                Item::Enum(e) => self.declare(file, &e.ident, &e.attrs, Vec::new()),
                Item::Type(t) => {
                    let alias = FieldInfo {
                        name: String::new(),
                        serialization: Some(Serialization::Flatten),
                        ty: type_expr(&t.ty),
                        markers: Vec::new(),
                        position: position(file, t.ty.span()),
                    };
                    self.declare(file, &t.ident, &t.attrs, vec![alias]);
                }
                Item::Mod(m) if m.content.is_some() => {
                    debug!(file = %file.display(), module = %m.ident, "inline module ignored");
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn declare(&mut self, file: &Path, ident: &syn::Ident, attrs: &[Attribute], fields: Vec<FieldInfo>) {
        let name = ident.unraw().to_string();
        if self.types.iter().any(|t| t.ident.name == name) {
            warn!(package = %self.id, ty = %name, "type declared twice; keeping the first");
            return;
        }
        let markers = self.markers(file, attrs, Target::Type);
        self.types.push(TypeInfo {
            ident: TypeIdent::new(self.id.clone(), name),
            markers,
            fields,
            position: position(file, ident.span()),
        });
    }

    /// Markers in the doc comments of `attrs`. Lines that are not markers of
    /// this registry are ignored; bad markers become diagnostics.
    fn markers(&mut self, file: &Path, attrs: &[Attribute], target: Target) -> Vec<Marker> {
        let mut out = Vec::new();
        for attr in attrs.iter().filter(|a| a.path().is_ident("doc")) {
            let Meta::NameValue(nv) = &attr.meta else { continue };
            let Expr::Lit(ExprLit { lit: Lit::Str(doc), .. }) = &nv.value else { continue };
            for line in doc.value().lines().map(str::trim).filter(|l| l.starts_with('+')) {
                match self.registry.parse(line, target) {
                    Some(Ok(marker)) => out.push(marker),
                    Some(Err(error)) => self.diagnostics.push(Diagnostic::new(position(file, attr.span()), error)),
                    None => debug!(file = %file.display(), line, "not a metric marker"),
                }
            }
        }
        out
    }
}

fn set_once(slot: &mut Option<String>, value: String, marker: &str, file: &Path) {
    match slot {
        Some(existing) if *existing != value => {
            warn!(file = %file.display(), marker, existing = %existing, ignored = %value, "package marker set twice");
        }
        Some(_) => {}
        None => *slot = Some(value),
    }
}

fn flatten_use(prefix: &mut Vec<String>, tree: &UseTree, out: &mut Vec<Import>) {
    match tree {
        UseTree::Path(p) => {
            prefix.push(p.ident.to_string());
            flatten_use(prefix, &p.tree, out);
            prefix.pop();
        }
        UseTree::Name(n) if n.ident == "self" => {
            if let Some(alias) = prefix.last() {
                out.push(Import::Name { alias: alias.clone(), path: prefix.clone() });
            }
        }
        UseTree::Name(n) => {
            let mut path = prefix.clone();
            path.push(n.ident.to_string());
            out.push(Import::Name { alias: n.ident.to_string(), path });
        }
        UseTree::Rename(r) => {
            if r.rename == "_" {
                return;
            }
            let mut path = prefix.clone();
            if r.ident != "self" {
                path.push(r.ident.to_string());
            }
            out.push(Import::Name { alias: r.rename.to_string(), path });
        }
        UseTree::Glob(_) => out.push(Import::Glob(prefix.clone())),
        UseTree::Group(g) => g.items.iter().for_each(|t| flatten_use(prefix, t, out)),
    }
}
