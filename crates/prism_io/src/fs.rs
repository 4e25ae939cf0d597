//! File systems that IO lanes read from, and resolution of URLs to paths.

use parking_lot::RwLock;
use prism_containers::HashMap;
use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

/// A source of file data that IO lanes read from.
pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Reads the complete content of the file at the given path.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// A [`FileSystem`] reading from the local disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

/// A [`FileSystem`] keeping its files in memory. Files can be added while the
/// file system is shared with IO lanes.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

/// Maps URL prefixes like `res:` to directories.
///
/// A URL starting with an assigned prefix resolves to the prefix's directory
/// joined with the rest of the URL. The longest matching prefix wins. URLs
/// without a matching prefix are used as paths directly.
#[derive(Clone, Debug, Default)]
pub struct Assigns {
    prefixes: BTreeMap<String, PathBuf>,
}

impl FileSystem for LocalFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the given data as the file at the given path, replacing any
    /// existing file.
    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.write().insert(path.into(), data);
    }

    /// Removes the file at the given path if it exists.
    pub fn remove(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.write().remove(path)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("No file at {}", path.display()),
            )
        })
    }
}

impl Assigns {
    pub fn new(prefixes: BTreeMap<String, PathBuf>) -> Self {
        Self { prefixes }
    }

    /// Assigns the given directory to the given prefix, replacing any
    /// existing assignment.
    pub fn set(&mut self, prefix: impl Into<String>, directory: impl Into<PathBuf>) {
        self.prefixes.insert(prefix.into(), directory.into());
    }

    /// Resolves the given URL to a path.
    pub fn resolve(&self, url: &str) -> PathBuf {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or_else(
                || PathBuf::from(url),
                |(prefix, directory)| directory.join(&url[prefix.len()..]),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_url_without_assign_gives_url_as_path() {
        let assigns = Assigns::default();
        assert_eq!(assigns.resolve("data/a.omsh"), PathBuf::from("data/a.omsh"));
    }

    #[test]
    fn resolving_url_with_assign_replaces_prefix() {
        let mut assigns = Assigns::default();
        assigns.set("res:", "assets");
        assert_eq!(
            assigns.resolve("res:meshes/cube.omsh"),
            Path::new("assets").join("meshes/cube.omsh")
        );
    }

    #[test]
    fn resolving_url_picks_longest_matching_prefix() {
        let mut assigns = Assigns::default();
        assigns.set("res:", "assets");
        assigns.set("res:meshes/", "mesh_cache");
        assert_eq!(
            assigns.resolve("res:meshes/cube.omsh"),
            Path::new("mesh_cache").join("cube.omsh")
        );
    }

    #[test]
    fn reading_missing_memory_file_gives_not_found() {
        let fs = MemoryFileSystem::new();
        let error = fs.read(Path::new("nope")).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn reading_inserted_memory_file_gives_its_data() {
        let fs = MemoryFileSystem::new();
        fs.insert("a/b", vec![4, 2]);
        assert_eq!(fs.read(Path::new("a/b")).unwrap(), vec![4, 2]);
        assert_eq!(fs.remove(Path::new("a/b")), Some(vec![4, 2]));
        assert!(fs.read(Path::new("a/b")).is_err());
    }
}
