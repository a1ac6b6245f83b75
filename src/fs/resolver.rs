use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::fs::port::FsPort;

/// A node in the directory tree, identified by its absolute path.
///
/// Nodes are transient: they are rebuilt from the filesystem on every
/// projection pass and never cached across mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

impl Node {
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Display name for a path: its final component, or the whole path for `/`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Directories before files, then case-insensitive by name.
pub fn compare_nodes(a: &Node, b: &Node) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        // Keep the order total for names differing only in case, or only
        // in bytes lost to lossy decoding.
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.path.cmp(&b.path))
}

/// Produces the sorted immediate children of a directory.
#[derive(Clone)]
pub struct ChildResolver {
    port: Arc<dyn FsPort>,
    show_hidden: bool,
}

impl ChildResolver {
    pub fn new(port: Arc<dyn FsPort>, show_hidden: bool) -> Self {
        Self { port, show_hidden }
    }

    pub fn port(&self) -> &Arc<dyn FsPort> {
        &self.port
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn set_show_hidden(&mut self, show_hidden: bool) {
        self.show_hidden = show_hidden;
    }

    /// Build the node for a path, or `None` if it does not exist.
    pub fn node_for(&self, path: &Path) -> Option<Node> {
        if !self.port.exists(path) {
            return None;
        }
        Some(Node {
            path: path.to_path_buf(),
            name: display_name(path),
            is_dir: self.port.is_dir(path),
        })
    }

    /// Sorted children of `path`, or `None` if it can't be listed.
    pub fn try_resolve_children(&self, path: &Path) -> Option<Vec<Node>> {
        let entries = match self.port.list_entries(path) {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!(path = %path.display(), "directory not listable");
                return None;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "listing failed");
                return None;
            }
        };

        let mut children: Vec<Node> = entries
            .into_iter()
            .map(|entry| Node {
                name: entry.name.to_string_lossy().into_owned(),
                path: path.join(entry.name),
                is_dir: entry.is_dir,
            })
            .filter(|node| self.show_hidden || !node.is_hidden())
            .collect();
        children.sort_by(compare_nodes);
        Some(children)
    }

    /// Sorted children of `path`; unreadable directories have none.
    pub fn resolve_children(&self, path: &Path) -> Vec<Node> {
        self.try_resolve_children(path).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::port::testing::FlakyFs;
    use crate::fs::port::LocalFs;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::create_dir(dir.path().join("Alpha")).unwrap();
        File::create(dir.path().join("zeta.txt")).unwrap();
        File::create(dir.path().join("Apple.rs")).unwrap();
        File::create(dir.path().join("banana.md")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        dir
    }

    fn names(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn dirs_first_then_case_insensitive() {
        let dir = setup_test_dir();
        let resolver = ChildResolver::new(Arc::new(LocalFs), false);
        let children = resolver.resolve_children(dir.path());
        assert_eq!(
            names(&children),
            vec!["Alpha", "beta", "Apple.rs", "banana.md", "zeta.txt"]
        );
        assert!(children[0].is_dir && children[1].is_dir);
        assert!(children[2..].iter().all(|n| !n.is_dir));
    }

    #[test]
    fn hidden_entries_follow_flag() {
        let dir = setup_test_dir();
        let resolver = ChildResolver::new(Arc::new(LocalFs), true);
        let children = resolver.resolve_children(dir.path());
        assert_eq!(children.len(), 6);
        // '.' sorts before letters once lowercased
        assert_eq!(children[2].name, ".hidden");
    }

    #[test]
    fn child_paths_are_joined_to_parent() {
        let dir = setup_test_dir();
        let resolver = ChildResolver::new(Arc::new(LocalFs), false);
        let children = resolver.resolve_children(dir.path());
        assert!(children.iter().all(|n| n.path.parent() == Some(dir.path())));
    }

    #[test]
    fn file_and_missing_paths_have_no_children() {
        let dir = setup_test_dir();
        let resolver = ChildResolver::new(Arc::new(LocalFs), false);
        assert!(resolver.resolve_children(&dir.path().join("zeta.txt")).is_empty());
        assert!(resolver.try_resolve_children(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn unreadable_directory_is_empty_not_error() {
        let dir = setup_test_dir();
        let port = Arc::new(FlakyFs::new());
        port.make_unreadable(&dir.path().join("beta"));
        let resolver = ChildResolver::new(port, false);
        assert!(resolver.try_resolve_children(&dir.path().join("beta")).is_none());
        assert!(resolver.resolve_children(&dir.path().join("beta")).is_empty());
    }

    #[test]
    fn empty_directory_is_some_empty() {
        let dir = setup_test_dir();
        let resolver = ChildResolver::new(Arc::new(LocalFs), false);
        assert_eq!(resolver.try_resolve_children(&dir.path().join("beta")), Some(vec![]));
    }

    #[test]
    fn repeated_resolution_is_stable() {
        let dir = setup_test_dir();
        let resolver = ChildResolver::new(Arc::new(LocalFs), false);
        assert_eq!(
            resolver.resolve_children(dir.path()),
            resolver.resolve_children(dir.path())
        );
    }

    #[test]
    fn node_for_root() {
        let dir = setup_test_dir();
        let resolver = ChildResolver::new(Arc::new(LocalFs), false);
        let node = resolver.node_for(dir.path()).unwrap();
        assert!(node.is_dir);
        assert!(resolver.node_for(&dir.path().join("missing")).is_none());
    }

    fn node(path: &str, is_dir: bool) -> Node {
        let path = PathBuf::from(path);
        Node {
            name: display_name(&path),
            path,
            is_dir,
        }
    }

    #[test]
    fn compare_nodes_orders_case_variants() {
        let a = node("/x/a", false);
        let upper = node("/x/A", false);
        assert_eq!(compare_nodes(&upper, &a), Ordering::Less);
        let dir = node("/x/z", true);
        assert_eq!(compare_nodes(&dir, &a), Ordering::Less);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_keep_their_real_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let bad_dir = dir.path().join(OsStr::from_bytes(b"bad\xffdir"));
        let first = dir.path().join(OsStr::from_bytes(b"x\xfe"));
        let second = dir.path().join(OsStr::from_bytes(b"x\xfd"));
        // Some filesystems reject non-UTF-8 names outright.
        if fs::create_dir(&bad_dir).is_err() {
            return;
        }
        File::create(bad_dir.join("inner.txt")).unwrap();
        File::create(&first).unwrap();
        File::create(&second).unwrap();

        let resolver = ChildResolver::new(Arc::new(LocalFs), false);
        let children = resolver.resolve_children(dir.path());
        assert_eq!(children.len(), 3);
        assert!(children.iter().all(|n| n.path.exists()));
        assert_ne!(children[1].path, children[2].path);
        assert_eq!(children[0].path, bad_dir);
        assert_eq!(children[0].name, "bad\u{fffd}dir");

        let inner = resolver.try_resolve_children(&children[0].path).unwrap();
        assert_eq!(names(&inner), vec!["inner.txt"]);

        assert!(LocalFs.delete_single(&children[1].path).unwrap());
        assert_eq!(resolver.resolve_children(dir.path()).len(), 2);
    }
}
