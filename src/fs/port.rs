use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::Result;

/// A raw directory entry as reported by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Raw file name; may not be valid UTF-8.
    pub name: OsString,
    pub is_dir: bool,
}

/// Filesystem primitives the tree engine consumes.
///
/// Expected failures (missing entries, permissions, name collisions) are
/// reported as `Ok(false)` / `Ok(None)`. Only unexpected I/O errors come back
/// as `Err`.
pub trait FsPort: Send + Sync + 'static {
    /// List the immediate entries of `path`. `None` if it is not a readable directory.
    fn list_entries(&self, path: &Path) -> Result<Option<Vec<Entry>>>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Create an empty file. `Ok(false)` if something already exists there.
    fn create_file(&self, path: &Path) -> Result<bool>;
    /// Create a directory and any missing parents.
    fn make_directories(&self, path: &Path) -> Result<bool>;
    fn delete_single(&self, path: &Path) -> Result<bool>;
    fn delete_recursive(&self, path: &Path) -> Result<bool>;
    /// Rename `from` to `to`. Never overwrites: `Ok(false)` if `to` exists.
    fn rename_to(&self, from: &Path, to: &Path) -> Result<bool>;
}

/// Whether an I/O error is one of the recoverable, user-caused kinds.
fn is_expected(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::AlreadyExists
    )
}

/// Fold an I/O result into the port's success-indicator convention.
fn absorb(result: std::io::Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if is_expected(e.kind()) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// `FsPort` backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FsPort for LocalFs {
    fn list_entries(&self, path: &Path) -> Result<Option<Vec<Entry>>> {
        if !path.is_dir() {
            return Ok(None);
        }
        let entries = match fs::read_dir(path) {
            Ok(e) => e,
            Err(e) if is_expected(e.kind()) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for entry in entries {
            // Entries that vanish or can't be stat'ed mid-listing are skipped.
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            out.push(Entry {
                is_dir: entry.path().is_dir(),
                name: entry.file_name(),
            });
        }
        Ok(Some(out))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_file(&self, path: &Path) -> Result<bool> {
        absorb(
            fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map(|_| ()),
        )
    }

    fn make_directories(&self, path: &Path) -> Result<bool> {
        if path.is_dir() {
            return Ok(false);
        }
        absorb(fs::create_dir_all(path))
    }

    fn delete_single(&self, path: &Path) -> Result<bool> {
        absorb(fs::remove_file(path))
    }

    fn delete_recursive(&self, path: &Path) -> Result<bool> {
        absorb(fs::remove_dir_all(path))
    }

    fn rename_to(&self, from: &Path, to: &Path) -> Result<bool> {
        if self.exists(to) {
            return Ok(false);
        }
        absorb(fs::rename(from, to))
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    /// `LocalFs` wrapper that reports chosen directories as unreadable.
    #[derive(Default)]
    pub struct FlakyFs {
        unreadable: Mutex<HashSet<PathBuf>>,
    }

    impl FlakyFs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn make_unreadable(&self, path: &Path) {
            self.unreadable.lock().unwrap().insert(path.to_path_buf());
        }
    }

    impl FsPort for FlakyFs {
        fn list_entries(&self, path: &Path) -> Result<Option<Vec<Entry>>> {
            if self.unreadable.lock().unwrap().contains(path) {
                return Ok(None);
            }
            LocalFs.list_entries(path)
        }
        fn exists(&self, path: &Path) -> bool {
            LocalFs.exists(path)
        }
        fn is_dir(&self, path: &Path) -> bool {
            LocalFs.is_dir(path)
        }
        fn create_file(&self, path: &Path) -> Result<bool> {
            LocalFs.create_file(path)
        }
        fn make_directories(&self, path: &Path) -> Result<bool> {
            LocalFs.make_directories(path)
        }
        fn delete_single(&self, path: &Path) -> Result<bool> {
            LocalFs.delete_single(path)
        }
        fn delete_recursive(&self, path: &Path) -> Result<bool> {
            LocalFs.delete_recursive(path)
        }
        fn rename_to(&self, from: &Path, to: &Path) -> Result<bool> {
            LocalFs.rename_to(from, to)
        }
    }
}
