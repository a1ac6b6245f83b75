use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Measured row widths keyed by path, for deciding on horizontal scrolling.
///
/// Holds at most one entry per visible path. `sync` diffs against the
/// latest visible set: newly visible rows are measured and rows that left
/// the view are evicted.
#[derive(Debug, Default)]
pub struct WidthCache {
    widths: HashMap<PathBuf, usize>,
}

impl WidthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the visible rows. Returns the number of evicted entries.
    pub fn sync<'a, I>(&mut self, visible: I) -> usize
    where
        I: IntoIterator<Item = (&'a Path, usize)>,
    {
        let mut seen: HashSet<&Path> = HashSet::new();
        for (path, width) in visible {
            seen.insert(path);
            match self.widths.get_mut(path) {
                Some(w) => *w = width,
                None => {
                    self.widths.insert(path.to_path_buf(), width);
                }
            }
        }
        let before = self.widths.len();
        self.widths.retain(|p, _| seen.contains(p.as_path()));
        before - self.widths.len()
    }

    #[cfg(test)]
    pub fn width_of(&self, path: &Path) -> Option<usize> {
        self.widths.get(path).copied()
    }

    pub fn max_width(&self) -> usize {
        self.widths.values().copied().max().unwrap_or(0)
    }

    pub fn needs_horizontal_scroll(&self, viewport_width: usize) -> bool {
        self.max_width() > viewport_width
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.widths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_adds_and_evicts() {
        let a = PathBuf::from("/r/a");
        let b = PathBuf::from("/r/b");
        let mut cache = WidthCache::new();
        assert_eq!(cache.sync(vec![(a.as_path(), 10), (b.as_path(), 30)]), 0);
        assert_eq!(cache.len(), 2);

        let evicted = cache.sync(vec![(a.as_path(), 12)]);
        assert_eq!(evicted, 1);
        assert_eq!(cache.width_of(&a), Some(12));
        assert_eq!(cache.width_of(&b), None);
    }

    #[test]
    fn one_entry_per_path() {
        let a = PathBuf::from("/r/a");
        let mut cache = WidthCache::new();
        cache.sync(vec![(a.as_path(), 5), (a.as_path(), 7)]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.width_of(&a), Some(7));
    }

    #[test]
    fn horizontal_scroll_threshold() {
        let a = PathBuf::from("/r/a");
        let mut cache = WidthCache::new();
        assert!(!cache.needs_horizontal_scroll(0));
        cache.sync(vec![(a.as_path(), 40)]);
        assert!(!cache.needs_horizontal_scroll(40));
        assert!(cache.needs_horizontal_scroll(39));
    }

    #[test]
    fn empty_sync_clears() {
        let a = PathBuf::from("/r/a");
        let mut cache = WidthCache::new();
        cache.sync(vec![(a.as_path(), 1)]);
        cache.sync(Vec::<(&Path, usize)>::new());
        assert_eq!(cache.len(), 0);
    }
}
