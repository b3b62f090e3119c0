//! Suppliers of named template text for the resolver. The resolver only ever
//! asks for a blob by name or for the full listing (wildcard expansion), so
//! the backing store can be a preloaded map or a live directory.
//!
//! Types:
//!
//! - `SourceProvider` is the lookup contract consumed by `TemplateResolver`.
//! - `SourceError` separates "no such template" from I/O trouble so the
//!   resolver can report missing sources precisely.
//! - `MemorySources` keeps name → text in memory. `from_directory` preloads a
//!   shader directory once so variant switches never touch the filesystem.
//! - `DirectorySources` reads beneath a root on every lookup, which keeps
//!   edited templates visible without restarting.
//!
//! Names are always forward-slash relative paths (`noise/perlin.glsl`).
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::glob::GlobPattern;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source \"{0}\" not found")]
    NotFound(String),

    #[error("source name \"{0}\" escapes the source root")]
    OutsideRoot(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub trait SourceProvider {
    fn load(&self, name: &str) -> Result<String, SourceError>;

    fn list(&self) -> Result<Vec<String>, SourceError>;
}

impl<T: SourceProvider + ?Sized> SourceProvider for &T {
    fn load(&self, name: &str) -> Result<String, SourceError> {
        (**self).load(name)
    }

    fn list(&self) -> Result<Vec<String>, SourceError> {
        (**self).list()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    entries: BTreeMap<String, String>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every file under `root` whose relative path matches `pattern`.
    pub fn from_directory(root: impl AsRef<Path>, pattern: &str) -> Result<Self, SourceError> {
        let root = root.as_ref();
        let pattern = GlobPattern::new(pattern);
        let mut entries = BTreeMap::new();
        for name in walk_relative(root)? {
            let file_name = name.rsplit('/').next().unwrap_or(name.as_str());
            if !pattern.matches(&name) && !pattern.matches(file_name) {
                continue;
            }
            let path = root.join(&name);
            let text = fs::read_to_string(&path).map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;
            entries.insert(name, text);
        }
        debug!(root = %root.display(), count = entries.len(), "preloaded shader sources");
        Ok(Self { entries })
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(name.into(), text.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MemorySources
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, text)| (name.into(), text.into()))
                .collect(),
        }
    }
}

impl SourceProvider for MemorySources {
    fn load(&self, name: &str) -> Result<String, SourceError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[derive(Debug, Clone)]
pub struct DirectorySources {
    root: PathBuf,
}

impl DirectorySources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SourceError::OutsideRoot(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl SourceProvider for DirectorySources {
    fn load(&self, name: &str) -> Result<String, SourceError> {
        let path = self.path_for(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(name.to_string()))
            }
            Err(source) => Err(SourceError::Io { path, source }),
        }
    }

    fn list(&self) -> Result<Vec<String>, SourceError> {
        walk_relative(&self.root)
    }
}

/// Sorted forward-slash paths of every regular file beneath `root`.
fn walk_relative(root: &Path) -> Result<Vec<String>, SourceError> {
    let mut names = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|source| SourceError::Io {
            path: dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| SourceError::Io {
                path: dir.clone(),
                source,
            })?;
            let file_type = entry.file_type().map_err(|source| SourceError::Io {
                path: entry.path(),
                source,
            })?;
            let path = entry.path();
            // Symlinked directories are not followed.
            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if file_type.is_symlink() && path.is_dir() {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(root) {
                let name = relative
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, name: &str, text: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn memory_sources_report_missing_names() {
        let sources: MemorySources = [("a.glsl", "A")].into_iter().collect();
        assert_eq!(sources.load("a.glsl").unwrap(), "A");
        assert!(matches!(
            sources.load("b.glsl"),
            Err(SourceError::NotFound(name)) if name == "b.glsl"
        ));
    }

    #[test]
    fn preloads_matching_files_with_relative_names() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "fragment_shader.glsl", "F");
        write(temp.path(), "noise/perlin.glsl", "P");
        write(temp.path(), "README.md", "ignored");

        let sources = MemorySources::from_directory(temp.path(), "*.glsl").unwrap();
        assert_eq!(
            sources.list().unwrap(),
            vec!["fragment_shader.glsl".to_string(), "noise/perlin.glsl".to_string()]
        );
        assert_eq!(sources.load("noise/perlin.glsl").unwrap(), "P");
    }

    #[test]
    fn directory_sources_read_live_files() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "common/math.glsl", "old");
        let sources = DirectorySources::new(temp.path());
        assert_eq!(sources.load("common/math.glsl").unwrap(), "old");

        write(temp.path(), "common/math.glsl", "new");
        assert_eq!(sources.load("common/math.glsl").unwrap(), "new");
        assert!(matches!(
            sources.load("missing.glsl"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn listing_skips_symlinked_directories() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "noise/perlin.glsl", "P");
        std::os::unix::fs::symlink(temp.path(), temp.path().join("noise/loop")).unwrap();

        let sources = DirectorySources::new(temp.path());
        assert_eq!(sources.list().unwrap(), vec!["noise/perlin.glsl".to_string()]);
    }

    #[test]
    fn directory_sources_reject_parent_components() {
        let temp = tempfile::tempdir().unwrap();
        let sources = DirectorySources::new(temp.path());
        assert!(matches!(
            sources.load("../secret.glsl"),
            Err(SourceError::OutsideRoot(_))
        ));
    }
}
