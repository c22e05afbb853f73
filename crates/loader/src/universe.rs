//! Loading of root packages and everything they reference, and the
//! [`TypeGraph`] view over the result.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use metricgen_engine::{Diagnostic, GroupVersion, PackageId, Resolution, TypeGraph, TypeIdent, TypeInfo};
use metricgen_markers::Registry;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::package::{package_id, parse_package, Import, Package};
use crate::tree::{normalize, SourceTree};
use crate::types::{is_primitive, named_paths};
use crate::LoadError;

/// Bound on alias chains (`use a as b; use b as a;`).
const MAX_DEPTH: usize = 16;

pub struct Loader<'r, T> {
    tree: T,
    registry: &'r Registry,
}

impl<'r, T: SourceTree> Loader<'r, T> {
    pub fn new(tree: T, registry: &'r Registry) -> Self { Self { tree, registry } }

    /// Load `roots` and every package reachable from them through `use`
    /// declarations and qualified field types, then resolve all field types.
    pub fn load_roots<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Universe, LoadError> {
        let mut packages: BTreeMap<PackageId, Package> = BTreeMap::new();
        let mut diagnostics = Vec::new();
        let mut root_ids = Vec::new();
        let mut queue = VecDeque::new();

        for root in roots {
            let dir = normalize(root.as_ref());
            if !self.tree.is_package(&dir) {
                return Err(LoadError::NotAPackage(root.as_ref().to_path_buf()));
            }
            let id = package_id(&dir);
            if !root_ids.contains(&id) {
                root_ids.push(id);
                queue.push_back(dir);
            }
        }

        while let Some(dir) = queue.pop_front() {
            if packages.contains_key(&package_id(&dir)) {
                continue;
            }
            let package = parse_package(&self.tree, self.registry, &dir, &mut diagnostics)?;
            let modules = Modules { tree: &self.tree };
            for dep in modules.referenced_dirs(&package) {
                if !packages.contains_key(&package_id(&dep)) && self.tree.is_package(&dep) {
                    debug!(from = %package.id, dir = %dep.display(), "loading referenced package");
                    queue.push_back(dep);
                }
            }
            packages.insert(package.id.clone(), package);
        }

        let resolver = Resolver { modules: Modules { tree: &self.tree }, packages: &packages };
        let resolved: Vec<(PackageId, FxHashMap<Vec<String>, Resolution>)> =
            packages.values().map(|p| (p.id.clone(), resolver.resolve_fields(p))).collect();
        for (id, resolutions) in resolved {
            if let Some(p) = packages.get_mut(&id) {
                p.resolutions = resolutions;
            }
        }

        info!(roots = root_ids.len(), packages = packages.len(), diagnostics = diagnostics.len(), "sources loaded");
        Ok(Universe { packages, roots: root_ids, diagnostics })
    }
}

/// Maps module paths onto package directories.
struct Modules<'t, T: ?Sized> {
    tree: &'t T,
}

impl<T: SourceTree + ?Sized> Modules<'_, T> {
    /// Nearest ancestor of `dir` (itself included) that is a crate root.
    fn crate_root(&self, dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .find(|a| self.tree.is_file(&a.join("lib.rs")) || self.tree.is_file(&a.join("main.rs")))
            .map(Path::to_path_buf)
    }

    /// Directory of the module `segments` as written in `package`; `None`
    /// for external crates.
    fn module_dir(&self, package: &Package, segments: &[String], depth: usize) -> Option<PathBuf> {
        let (first, rest) = segments.split_first()?;
        let start = match first.as_str() {
            "crate" => self.crate_root(&package.dir)?,
            "self" => package.dir.clone(),
            "super" => package.dir.parent()?.to_path_buf(),
            alias => {
                if let Some(path) = package.import_path(alias) {
                    if depth >= MAX_DEPTH {
                        return None;
                    }
                    let mut full = path.to_vec();
                    full.extend_from_slice(rest);
                    return self.module_dir(package, &full, depth + 1);
                }
                return self.descend(package.dir.clone(), segments);
            }
        };
        self.descend(start, rest)
    }

    fn descend(&self, mut dir: PathBuf, segments: &[String]) -> Option<PathBuf> {
        for (i, seg) in segments.iter().enumerate() {
            match seg.as_str() {
                "self" => {}
                "super" => dir = dir.parent()?.to_path_buf(),
                name => {
                    let child = dir.join(name);
                    if self.tree.is_dir(&child) {
                        dir = child;
                    } else if i + 1 == segments.len() && self.tree.is_file(&dir.join(format!("{name}.rs"))) {
                        // `name.rs` belongs to the package of its directory.
                    } else {
                        return None;
                    }
                }
            }
        }
        Some(normalize(&dir))
    }

    /// Directories named by the package's imports and qualified field types.
    fn referenced_dirs(&self, package: &Package) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for import in &package.imports {
            match import {
                Import::Name { path, .. } => {
                    dirs.extend(self.module_dir(package, &path[..path.len() - 1], 0));
                    dirs.extend(self.module_dir(package, path, 0));
                }
                Import::Glob(path) => dirs.extend(self.module_dir(package, path, 0)),
            }
        }
        for path in field_paths(package) {
            if path.len() > 1 {
                dirs.extend(self.module_dir(package, &path[..path.len() - 1], 0));
            }
        }
        dirs.sort();
        dirs.dedup();
        dirs
    }
}

fn field_paths(package: &Package) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    for field in package.types().iter().flat_map(|t| &t.fields) {
        named_paths(&field.ty, &mut paths);
    }
    paths
}

struct Resolver<'a, T: ?Sized> {
    modules: Modules<'a, T>,
    packages: &'a BTreeMap<PackageId, Package>,
}

impl<T: SourceTree + ?Sized> Resolver<'_, T> {
    fn resolve_fields(&self, package: &Package) -> FxHashMap<Vec<String>, Resolution> {
        let mut out = FxHashMap::default();
        for path in field_paths(package) {
            if !out.contains_key(&path) {
                let resolution = self.resolve(package, &path, 0);
                out.insert(path, resolution);
            }
        }
        out
    }

    fn package_at(&self, dir: &Path) -> Option<&Package> { self.packages.get(&package_id(dir)) }

    fn resolve(&self, package: &Package, path: &[String], depth: usize) -> Resolution {
        match path {
            [] => Resolution::Unresolved,
            [name] => self.resolve_name(package, name, depth),
            [qualifier @ .., name] => {
                let target = self.modules.module_dir(package, qualifier, depth).and_then(|dir| self.package_at(&dir));
                match target {
                    Some(target) => self.resolve_name(target, name, depth + 1),
                    None => Resolution::Unresolved,
                }
            }
        }
    }

    /// Local declarations, then imports, then glob imports, then primitives.
    fn resolve_name(&self, package: &Package, name: &str, depth: usize) -> Resolution {
        if package.declares(name) {
            return Resolution::Named(TypeIdent::new(package.id.clone(), name));
        }
        if depth >= MAX_DEPTH {
            return Resolution::Unresolved;
        }
        if let Some(path) = package.import_path(name) {
            return self.resolve(package, path, depth + 1);
        }
        for import in &package.imports {
            let Import::Glob(module) = import else { continue };
            let Some(target) = self.modules.module_dir(package, module, depth).and_then(|d| self.package_at(&d)) else {
                continue;
            };
            if target.declares(name) {
                return Resolution::Named(TypeIdent::new(target.id.clone(), name));
            }
        }
        if is_primitive(name) { Resolution::Basic } else { Resolution::Unresolved }
    }
}

/// Every loaded package, with field types resolved up front.
#[derive(Debug)]
pub struct Universe {
    packages: BTreeMap<PackageId, Package>,
    roots: Vec<PackageId>,
    diagnostics: Vec<Diagnostic>,
}

impl Universe {
    pub fn package(&self, id: &PackageId) -> Option<&Package> { self.packages.get(id) }

    /// Marker problems found while reading doc comments.
    pub fn diagnostics(&self) -> &[Diagnostic] { &self.diagnostics }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> { std::mem::take(&mut self.diagnostics) }
}

impl TypeGraph for Universe {
    fn type_info(&self, ident: &TypeIdent) -> Option<&TypeInfo> { self.packages.get(&ident.package)?.get(&ident.name) }

    fn resolve(&self, context: &PackageId, path: &[String]) -> Resolution {
        self.packages
            .get(context)
            .and_then(|p| p.resolutions.get(path))
            .cloned()
            .unwrap_or(Resolution::Unresolved)
    }

    fn packages_declaring_group(&self, group: &str) -> Vec<PackageId> {
        self.packages
            .values()
            .filter(|p| p.group_version.as_ref().is_some_and(|gv| gv.group == group))
            .map(|p| p.id.clone())
            .collect()
    }

    fn group_version_of(&self, package: &PackageId) -> Option<&GroupVersion> {
        self.packages.get(package)?.group_version.as_ref()
    }

    fn roots(&self) -> Vec<PackageId> { self.roots.clone() }

    fn types_in(&self, package: &PackageId) -> Vec<&TypeInfo> {
        self.packages.get(package).map(|p| p.types().iter().collect()).unwrap_or_default()
    }
}
