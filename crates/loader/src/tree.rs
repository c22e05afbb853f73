//! Access to source files, on disk or in memory.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

pub trait SourceTree {
    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// `*.rs` files directly inside `dir`, sorted by path.
    fn rust_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn read(&self, file: &Path) -> io::Result<String>;

    /// Whether `dir` holds at least one Rust file.
    fn is_package(&self, dir: &Path) -> bool {
        self.is_dir(dir) && self.rust_files(dir).map(|f| !f.is_empty()).unwrap_or(false)
    }
}

impl<T: SourceTree + ?Sized> SourceTree for &T {
    fn is_dir(&self, path: &Path) -> bool { (**self).is_dir(path) }
    fn is_file(&self, path: &Path) -> bool { (**self).is_file(path) }
    fn rust_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> { (**self).rust_files(dir) }
    fn read(&self, file: &Path) -> io::Result<String> { (**self).read(file) }
}

fn is_rust_file(path: &Path) -> bool { path.extension().is_some_and(|e| e == "rs") }

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTree;

impl FsTree {
    fn on_disk(path: &Path) -> &Path {
        if path.as_os_str().is_empty() { Path::new(".") } else { path }
    }
}

impl SourceTree for FsTree {
    fn is_dir(&self, path: &Path) -> bool { Self::on_disk(path).is_dir() }

    fn is_file(&self, path: &Path) -> bool { Self::on_disk(path).is_file() }

    fn rust_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(Self::on_disk(dir))? {
            let entry = entry?;
            let path = dir.join(entry.file_name());
            if entry.file_type()?.is_file() && is_rust_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read(&self, file: &Path) -> io::Result<String> { std::fs::read_to_string(Self::on_disk(file)) }
}

/// Files held in memory, keyed by relative path. Directories exist
/// implicitly when some file lies below them.
#[derive(Debug, Clone, Default)]
pub struct MemTree {
    files: BTreeMap<PathBuf, String>,
}

impl MemTree {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), text.into());
    }
}

impl SourceTree for MemTree {
    fn is_dir(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.files.keys().any(|f| f != &path && f.starts_with(&path))
    }

    fn is_file(&self, path: &Path) -> bool { self.files.contains_key(&normalize(path)) }

    fn rust_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let dir = normalize(dir);
        Ok(self.files.keys().filter(|f| f.parent() == Some(dir.as_path()) && is_rust_file(f)).cloned().collect())
    }

    fn read(&self, file: &Path) -> io::Result<String> {
        self.files
            .get(&normalize(file))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", file.display())))
    }
}

/// Lexically clean a path: drop `.` components and fold `..` into the
/// preceding component where there is one.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("./api/v1/../v2")), PathBuf::from("api/v2"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize(Path::new(".")), PathBuf::new());
    }

    #[test]
    fn mem_tree_directories_are_implicit() {
        let tree = MemTree::new().with("src/lib.rs", "").with("src/api/v1/types.rs", "").with("src/api/v1/notes.md", "");
        assert!(tree.is_dir(Path::new("src/api")));
        assert!(tree.is_dir(Path::new("")));
        assert!(!tree.is_dir(Path::new("src/lib.rs")));
        assert!(tree.is_file(Path::new("./src/lib.rs")));
        assert!(!tree.is_package(Path::new("src/api")));
        assert_eq!(tree.rust_files(Path::new("src/api/v1")).unwrap(), [PathBuf::from("src/api/v1/types.rs")]);
    }
}
