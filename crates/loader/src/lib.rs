//! metric-gen loader: reads annotated Rust API types with `syn` and exposes
//! them to the engine as a [`TypeGraph`](metricgen_engine::TypeGraph).
//!
//! A package is a directory; the `*.rs` files directly inside it share one
//! namespace. Package markers live in inner doc comments:
//!
//! ```text
//! //! +groupName=example.com
//! //! +versionName=v1
//! ```

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod package;
mod serde_attrs;
pub mod tree;
mod types;
mod universe;

pub use package::{Import, Package};
pub use serde_attrs::RenameRule;
pub use tree::{FsTree, MemTree, SourceTree};
pub use universe::{Loader, Universe};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}:{column}: {message}", path.display())]
    Parse { path: PathBuf, line: usize, column: usize, message: String },
    #[error("{}: not a directory containing Rust sources", .0.display())]
    NotAPackage(PathBuf),
}

impl LoadError {
    pub(crate) fn parse(path: &Path, err: &syn::Error) -> Self {
        let start = err.span().start();
        LoadError::Parse { path: path.to_path_buf(), line: start.line, column: start.column + 1, message: err.to_string() }
    }
}
