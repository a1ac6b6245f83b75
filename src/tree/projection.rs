use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::fs::resolver::{ChildResolver, Node};
use crate::tree::expansion::ExpansionStore;

/// Default depth below which the projection stops descending.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// One row of the visible tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleNode {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
    pub depth: usize,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
}

/// Lazy depth-first, pre-order walk of the visible tree.
///
/// Children are listed only when their expanded parent is yielded, so I/O is
/// bounded by the expanded directories actually consumed. Nothing is cached:
/// a fresh `Projection` always reflects the current store and filesystem.
pub struct Projection<'a> {
    resolver: &'a ChildResolver,
    store: &'a ExpansionStore,
    root: Option<Node>,
    stack: Vec<(usize, std::vec::IntoIter<Node>)>,
    max_depth: usize,
}

impl<'a> Projection<'a> {
    pub fn new(
        resolver: &'a ChildResolver,
        store: &'a ExpansionStore,
        root: &Path,
        max_depth: usize,
    ) -> Self {
        Self {
            resolver,
            store,
            root: resolver.node_for(root),
            stack: Vec::new(),
            max_depth,
        }
    }
}

impl Iterator for Projection<'_> {
    type Item = VisibleNode;

    fn next(&mut self) -> Option<VisibleNode> {
        let (node, depth, is_last_sibling) = match self.root.take() {
            Some(root) => (root, 0, true),
            None => loop {
                let frame = self.stack.last_mut()?;
                let depth = frame.0;
                match frame.1.next() {
                    Some(node) => {
                        let is_last = frame.1.len() == 0;
                        break (node, depth, is_last);
                    }
                    None => {
                        self.stack.pop();
                    }
                }
            },
        };

        let is_expanded = node.is_dir && self.store.is_expanded(&node.path);
        if is_expanded && depth < self.max_depth {
            let children = self.resolver.resolve_children(&node.path);
            if !children.is_empty() {
                self.stack.push((depth + 1, children.into_iter()));
            }
        }

        Some(VisibleNode {
            path: node.path,
            name: node.name,
            is_dir: node.is_dir,
            depth,
            is_expanded,
            is_last_sibling,
        })
    }
}
