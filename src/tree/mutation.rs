use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::fs::port::FsPort;

/// A filesystem change requested through the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateFile { parent: PathBuf, name: String },
    CreateDirectory { parent: PathBuf, name: String },
    Rename { path: PathBuf, new_name: String },
    Delete { path: PathBuf, is_dir: bool },
}

impl Mutation {
    /// The directory whose listing this mutation changes.
    pub fn parent_dir(&self) -> PathBuf {
        match self {
            Mutation::CreateFile { parent, .. } | Mutation::CreateDirectory { parent, .. } => {
                parent.clone()
            }
            Mutation::Rename { path, .. } | Mutation::Delete { path, .. } => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| path.clone()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mutation::CreateFile { .. } => "create file",
            Mutation::CreateDirectory { .. } => "create directory",
            Mutation::Rename { .. } => "rename",
            Mutation::Delete { .. } => "delete",
        }
    }
}

/// Result of executing a `Mutation` on a worker.
#[derive(Debug)]
pub struct MutationOutcome {
    pub mutation: Mutation,
    /// The path created, renamed to, or deleted.
    pub target: PathBuf,
    /// `Ok(true)` if the filesystem changed, `Ok(false)` for a silent no-op.
    pub result: Result<bool>,
}

impl MutationOutcome {
    #[cfg(test)]
    pub fn changed(&self) -> bool {
        matches!(self.result, Ok(true))
    }
}

/// Reject blank names and names that would leave the parent directory.
fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BlankName);
    }
    let path = Path::new(trimmed);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(AppError::InvalidName(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Rename targets must be a single path segment.
fn validate_leaf_name(name: &str) -> Result<&str> {
    let name = validate_name(name)?;
    if Path::new(name).components().count() != 1 {
        return Err(AppError::InvalidName(name.to_string()));
    }
    Ok(name)
}

fn target_of(mutation: &Mutation) -> PathBuf {
    match mutation {
        Mutation::CreateFile { parent, name } | Mutation::CreateDirectory { parent, name } => {
            parent.join(name.trim())
        }
        Mutation::Rename { path, new_name } => path
            .parent()
            .map(|p| p.join(new_name.trim()))
            .unwrap_or_else(|| PathBuf::from(new_name.trim())),
        Mutation::Delete { path, .. } => path.clone(),
    }
}

fn run(port: &dyn FsPort, mutation: &Mutation) -> Result<bool> {
    match mutation {
        Mutation::CreateFile { parent, name } => {
            let name = validate_name(name)?;
            port.create_file(&parent.join(name))
        }
        Mutation::CreateDirectory { parent, name } => {
            let name = validate_name(name)?;
            port.make_directories(&parent.join(name))
        }
        Mutation::Rename { path, new_name } => {
            let new_name = validate_leaf_name(new_name)?;
            let Some(parent) = path.parent() else {
                return Ok(false);
            };
            let to = parent.join(new_name);
            if to == *path || port.exists(&to) {
                return Ok(false);
            }
            port.rename_to(path, &to)
        }
        Mutation::Delete { path, is_dir } => {
            if *is_dir {
                port.delete_recursive(path)
            } else {
                port.delete_single(path)
            }
        }
    }
}

/// Apply `mutation` through the port. Blocking; run it on a worker.
pub fn execute(port: &dyn FsPort, mutation: Mutation) -> MutationOutcome {
    let target = target_of(&mutation);
    let result = run(port, &mutation);
    match &result {
        Ok(true) => {
            info!(op = mutation.label(), target = %target.display(), "mutation applied")
        }
        Ok(false) => {
            info!(op = mutation.label(), target = %target.display(), "mutation was a no-op")
        }
        Err(e) => {
            warn!(op = mutation.label(), target = %target.display(), error = %e, "mutation failed")
        }
    }
    MutationOutcome {
        mutation,
        target,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::port::LocalFs;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str) -> MutationOutcome {
        execute(
            &LocalFs,
            Mutation::CreateFile {
                parent: dir.to_path_buf(),
                name: name.into(),
            },
        )
    }

    #[test]
    fn create_file_twice_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        assert!(create_file(tmp.path(), "x.txt").changed());
        let second = create_file(tmp.path(), "x.txt");
        assert!(second.result.is_ok());
        assert!(!second.changed());
        let count = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn create_file_blank_name_fails() {
        let tmp = TempDir::new().unwrap();
        let outcome = create_file(tmp.path(), "   ");
        assert!(matches!(outcome.result, Err(AppError::BlankName)));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn create_file_rejects_parent_escape() {
        let tmp = TempDir::new().unwrap();
        let outcome = create_file(tmp.path(), "../evil.txt");
        assert!(matches!(outcome.result, Err(AppError::InvalidName(_))));
    }

    #[test]
    fn create_directory_with_intermediates() {
        let tmp = TempDir::new().unwrap();
        let outcome = execute(
            &LocalFs,
            Mutation::CreateDirectory {
                parent: tmp.path().to_path_buf(),
                name: "a/b".into(),
            },
        );
        assert!(outcome.changed());
        assert_eq!(outcome.target, tmp.path().join("a/b"));
        assert!(tmp.path().join("a").join("b").is_dir());
    }

    #[test]
    fn rename_onto_existing_is_silent_noop() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");
        fs::write(&a, "A").unwrap();
        fs::write(&b, "B").unwrap();
        let outcome = execute(
            &LocalFs,
            Mutation::Rename {
                path: a.clone(),
                new_name: "b.txt".into(),
            },
        );
        assert!(outcome.result.is_ok());
        assert!(!outcome.changed());
        assert_eq!(fs::read_to_string(&a).unwrap(), "A");
        assert_eq!(fs::read_to_string(&b).unwrap(), "B");
    }

    #[test]
    fn rename_moves_entry() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.txt");
        fs::write(&a, "A").unwrap();
        let outcome = execute(
            &LocalFs,
            Mutation::Rename {
                path: a.clone(),
                new_name: "c.txt".into(),
            },
        );
        assert!(outcome.changed());
        assert_eq!(outcome.target, tmp.path().join("c.txt"));
        assert!(!a.exists());
    }

    #[test]
    fn rename_rejects_nested_name() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.txt");
        fs::write(&a, "A").unwrap();
        let outcome = execute(
            &LocalFs,
            Mutation::Rename {
                path: a.clone(),
                new_name: "sub/a.txt".into(),
            },
        );
        assert!(matches!(outcome.result, Err(AppError::InvalidName(_))));
        assert!(a.exists());
    }

    #[test]
    fn delete_directory_recursively() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("d");
        fs::create_dir_all(dir.join("inner")).unwrap();
        fs::write(dir.join("inner").join("f"), "").unwrap();
        let outcome = execute(
            &LocalFs,
            Mutation::Delete {
                path: dir.clone(),
                is_dir: true,
            },
        );
        assert!(outcome.changed());
        assert!(!dir.exists());
    }

    #[test]
    fn delete_missing_file_is_noop() {
        let tmp = TempDir::new().unwrap();
        let outcome = execute(
            &LocalFs,
            Mutation::Delete {
                path: tmp.path().join("ghost"),
                is_dir: false,
            },
        );
        assert!(outcome.result.is_ok());
        assert!(!outcome.changed());
    }

    #[test]
    fn parent_dir_of_each_kind() {
        let create = Mutation::CreateFile {
            parent: "/r/d".into(),
            name: "x".into(),
        };
        assert_eq!(create.parent_dir(), PathBuf::from("/r/d"));
        let delete = Mutation::Delete {
            path: "/r/d/x".into(),
            is_dir: false,
        };
        assert_eq!(delete.parent_dir(), PathBuf::from("/r/d"));
    }
}
