//! Filesystem access for the session.
//!
//! ## Learning: Blocking I/O Behind an Async Boundary
//!
//! The trait is deliberately synchronous. The controller runs every call
//! on tokio's blocking pool (`spawn_blocking`), so implementations can use
//! plain `std::fs` and the owning task never stalls on disk access.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// File access used to load and persist documents.
pub trait FileSystem: Send + Sync + 'static {
    /// Reads the whole file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replaces the whole file.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Returns the file size in bytes.
    fn file_size(&self, path: &Path) -> io::Result<u64>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem {
    /// Write to a sibling temp file, then rename over the target
    atomic: bool,
}

impl DiskFileSystem {
    /// Creates a filesystem that writes files in place.
    pub fn new() -> Self {
        Self { atomic: false }
    }

    /// Enables or disables atomic (write then rename) saves.
    pub fn with_atomic_writes(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.quire-tmp"))
    }
}

impl FileSystem for DiskFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if !self.atomic {
            return std::fs::write(path, contents);
        }

        let temp_path = Self::temp_path(path);
        std::fs::write(&temp_path, contents)?;
        if let Err(err) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }
        Ok(())
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}

/// An in-memory filesystem with failure injection.
///
/// Paths are compared exactly; no normalization happens.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    failing_reads: Mutex<HashSet<PathBuf>>,
    failing_writes: Mutex<HashSet<PathBuf>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, builder style.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Creates or replaces a file.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        lock(&self.files).insert(path.into(), contents.into());
    }

    /// Returns the current contents of a file.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        lock(&self.files).get(path.as_ref()).cloned()
    }

    /// Returns the contents of a file as text.
    pub fn text(&self, path: impl AsRef<Path>) -> Option<String> {
        self.contents(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Makes every read of `path` fail.
    pub fn fail_reads(&self, path: impl Into<PathBuf>) {
        lock(&self.failing_reads).insert(path.into());
    }

    /// Makes every write of `path` fail.
    pub fn fail_writes(&self, path: impl Into<PathBuf>) {
        lock(&self.failing_writes).insert(path.into());
    }

    /// Removes injected failures for `path`.
    pub fn heal(&self, path: impl AsRef<Path>) {
        lock(&self.failing_reads).remove(path.as_ref());
        lock(&self.failing_writes).remove(path.as_ref());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        if lock(&self.failing_reads).contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected read failure",
            ));
        }
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if lock(&self.failing_writes).contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected write failure",
            ));
        }
        lock(&self.files).insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        lock(&self.files)
            .get(path)
            .map(|bytes| bytes.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

/// Reads `path` as UTF-8 text, refusing files above `max_bytes`.
pub(crate) fn read_text(fs: &dyn FileSystem, path: &Path, max_bytes: u64) -> io::Result<String> {
    let size = fs.file_size(path)?;
    if size > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("file is {size} bytes, limit is {max_bytes}"),
        ));
    }

    let bytes = fs.read_file(path)?;
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_disk_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let fs = DiskFileSystem::new();

        fs.write_file(&path, b"hello").unwrap();
        assert_eq!(fs.read_file(&path).unwrap(), b"hello");
        assert_eq!(fs.file_size(&path).unwrap(), 5);
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "old").unwrap();

        let fs = DiskFileSystem::new().with_atomic_writes(true);
        fs.write_file(&path, b"new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_memory_failure_injection() {
        let fs = MemoryFileSystem::new().with_file("/p/a.txt", "abc");
        fs.fail_writes("/p/a.txt");

        let err = fs.write_file(Path::new("/p/a.txt"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(fs.text("/p/a.txt").unwrap(), "abc");

        fs.heal("/p/a.txt");
        fs.write_file(Path::new("/p/a.txt"), b"x").unwrap();
        assert_eq!(fs.text("/p/a.txt").unwrap(), "x");
    }

    #[test]
    fn test_read_text_limits() {
        let fs = MemoryFileSystem::new()
            .with_file("/big", vec![b'a'; 16])
            .with_file("/binary", vec![0xff, 0xfe]);

        let err = read_text(&fs, Path::new("/big"), 8).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = read_text(&fs, Path::new("/binary"), 8).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        assert_eq!(read_text(&fs, Path::new("/big"), 16).unwrap().len(), 16);
    }
}
