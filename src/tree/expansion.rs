use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::sync::watch;

/// The set of directory paths currently shown open.
///
/// This is the only owner of "is this directory open". Every mutation bumps
/// `version` exactly once and publishes it, so observers re-derive the
/// projection after each logical transition. Callers must only insert paths
/// a worker has just confirmed to be directories.
pub struct ExpansionStore {
    expanded: HashSet<PathBuf>,
    /// Per-path invalidation counters, bumped by `invalidate`.
    generations: HashMap<PathBuf, u64>,
    version: watch::Sender<u64>,
}

impl Default for ExpansionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpansionStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            expanded: HashSet::new(),
            generations: HashMap::new(),
            version,
        }
    }

    pub fn is_expanded(&self, path: &Path) -> bool {
        self.expanded.contains(path)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    /// Current version; increases on every observable transition.
    #[cfg(test)]
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to version bumps.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Invalidation generation of `path` (0 if never invalidated).
    #[cfg(test)]
    pub fn generation(&self, path: &Path) -> u64 {
        self.generations.get(path).copied().unwrap_or(0)
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    #[cfg(test)]
    pub fn expand(&mut self, path: &Path) {
        if self.expanded.insert(path.to_path_buf()) {
            self.bump();
        }
    }

    /// Insert every path in one transition. Readers never see a partial set.
    pub fn expand_all<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut changed = false;
        for path in paths {
            changed |= self.expanded.insert(path);
        }
        if changed {
            self.bump();
        }
    }

    /// Remove a single path. Descendants keep their membership.
    pub fn collapse(&mut self, path: &Path) {
        if self.expanded.remove(path) {
            self.bump();
        }
    }

    /// Remove `path` and every member below it.
    pub fn collapse_subtree(&mut self, path: &Path) {
        let before = self.expanded.len();
        self.expanded.retain(|p| !p.starts_with(path));
        if self.expanded.len() != before {
            self.bump();
        }
    }

    /// Drop all state for a path that no longer exists.
    pub fn forget_subtree(&mut self, path: &Path) {
        self.generations.retain(|p, _| !p.starts_with(path));
        self.collapse_subtree(path);
    }

    /// Re-key `from` and its expanded descendants under `to`.
    pub fn rename_subtree(&mut self, from: &Path, to: &Path) {
        let moved: Vec<PathBuf> = self
            .expanded
            .iter()
            .filter(|p| p.starts_with(from))
            .cloned()
            .collect();
        if moved.is_empty() {
            return;
        }
        for old in moved {
            self.expanded.remove(&old);
            if let Ok(rest) = old.strip_prefix(from) {
                self.expanded.insert(to.join(rest));
            }
        }
        self.generations.retain(|p, _| !p.starts_with(from));
        self.bump();
    }

    /// Force observers to re-read `path` even though membership is unchanged.
    pub fn invalidate(&mut self, path: &Path) {
        *self.generations.entry(path.to_path_buf()).or_insert(0) += 1;
        self.bump();
    }

    /// Replace the whole store: `{root}` if given, empty otherwise.
    pub fn reset(&mut self, root: Option<&Path>) {
        self.expanded.clear();
        self.generations.clear();
        if let Some(root) = root {
            self.expanded.insert(root.to_path_buf());
        }
        self.bump();
    }

    /// Sorted copy of the current members.
    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.expanded.iter().cloned().collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn expand_and_collapse_single() {
        let mut store = ExpansionStore::new();
        store.expand(&p("/r/a"));
        assert!(store.is_expanded(&p("/r/a")));
        store.collapse(&p("/r/a"));
        assert!(!store.is_expanded(&p("/r/a")));
    }

    #[test]
    fn expand_all_is_one_transition() {
        let mut store = ExpansionStore::new();
        let before = store.version();
        store.expand_all(vec![p("/r/a"), p("/r/a/b"), p("/r/a/b/c")]);
        assert_eq!(store.version(), before + 1);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[test]
    fn noop_mutations_do_not_bump_version() {
        let mut store = ExpansionStore::new();
        store.expand(&p("/r"));
        let v = store.version();
        store.expand(&p("/r"));
        store.collapse(&p("/elsewhere"));
        store.expand_all(vec![p("/r")]);
        assert_eq!(store.version(), v);
    }

    #[test]
    fn collapse_keeps_descendants() {
        let mut store = ExpansionStore::new();
        store.expand_all(vec![p("/r/a"), p("/r/a/b")]);
        store.collapse(&p("/r/a"));
        assert!(store.is_expanded(&p("/r/a/b")));
    }

    #[test]
    fn collapse_subtree_clears_descendants_only() {
        let mut store = ExpansionStore::new();
        store.expand_all(vec![p("/r"), p("/r/a"), p("/r/a/b"), p("/r/ab")]);
        store.collapse_subtree(&p("/r/a"));
        assert_eq!(store.snapshot(), vec![p("/r"), p("/r/ab")]);
    }

    #[test]
    fn commutative_for_disjoint_paths() {
        let mut one = ExpansionStore::new();
        one.expand(&p("/r/a"));
        one.expand_all(vec![p("/r/b"), p("/r/b/c")]);
        one.collapse(&p("/r/a"));

        let mut two = ExpansionStore::new();
        two.expand_all(vec![p("/r/b"), p("/r/b/c")]);
        two.expand(&p("/r/a"));
        two.collapse(&p("/r/a"));

        assert_eq!(one.snapshot(), two.snapshot());
    }

    #[test]
    fn rename_subtree_moves_members() {
        let mut store = ExpansionStore::new();
        store.expand_all(vec![p("/r"), p("/r/old"), p("/r/old/x")]);
        store.rename_subtree(&p("/r/old"), &p("/r/new"));
        assert_eq!(store.snapshot(), vec![p("/r"), p("/r/new"), p("/r/new/x")]);
    }

    #[test]
    fn invalidate_bumps_generation_and_version() {
        let mut store = ExpansionStore::new();
        store.expand(&p("/r"));
        let v = store.version();
        store.invalidate(&p("/r"));
        store.invalidate(&p("/r"));
        assert_eq!(store.generation(&p("/r")), 2);
        assert_eq!(store.version(), v + 2);
        assert!(store.is_expanded(&p("/r")));
    }

    #[test]
    fn reset_replaces_everything() {
        let mut store = ExpansionStore::new();
        store.expand_all(vec![p("/old"), p("/old/a")]);
        store.invalidate(&p("/old"));
        store.reset(Some(&p("/new")));
        assert_eq!(store.snapshot(), vec![p("/new")]);
        assert_eq!(store.generation(&p("/old")), 0);
        store.reset(None);
        assert!(store.is_empty());
    }

    #[test]
    fn subscribers_observe_bumps() {
        let mut store = ExpansionStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());
        store.expand(&p("/r"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), store.version());
    }
}
