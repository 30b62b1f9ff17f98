//! The project a session is bound to.
//!
//! A session is always opened for exactly one project root. The context
//! is handed to the controller when it is built and travels inside
//! signals that need it (e.g. "open the settings of project R"), so no
//! global slot is needed to pass the path between screens.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::{CoreError, CoreResult};

/// Root directory and display name of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Root directory of the project
    root: PathBuf,

    /// Project name
    name: String,
}

impl ProjectContext {
    /// Creates a context for `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = normalize(&root.into());
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Project")
            .to_string();
        Self { root, name }
    }

    /// Opens a project from an existing directory.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let root = path
            .canonicalize()
            .map_err(|source| CoreError::io(path, source))?;

        if !root.is_dir() {
            return Err(CoreError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }

        Ok(Self::new(root))
    }

    /// Returns the project root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves a path against the project root.
    ///
    /// The result is lexically normalized, so every spelling of one file
    /// (`a.txt`, `./a.txt`, `sub/../a.txt`) resolves to the same path.
    /// Symlinks are not followed.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.root.join(path))
        }
    }
}

/// Drops `.` components and folds `..` into the preceding name.
///
/// `..` directly under the root stays at the root; a leading `..` in a
/// relative path is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }
    parts.iter().collect()
}
