//! Smart expand: decide which directories to open when one is toggled.
//!
//! Opening a directory whose only child is another directory keeps going
//! down that chain, so `a/b/c/d` with nothing else along the way opens in a
//! single step. The walk stops at the first directory with zero children,
//! a single file, or several entries. It performs blocking I/O and must run
//! off the main context.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs::resolver::ChildResolver;

/// Default bound on how many directories one chain may open.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 64;

/// Outcome of a smart-expand scan: the directories to open, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionPlan {
    pub paths: Vec<PathBuf>,
}

impl ExpansionPlan {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The deepest directory the chain reached.
    pub fn last(&self) -> Option<&Path> {
        self.paths.last().map(PathBuf::as_path)
    }
}

/// Scan from `start` and build the expansion plan.
///
/// `start` itself is only included if it can be listed. A directory in the
/// chain that fails to list ends the chain; everything read so far stays in
/// the plan. With `cascade` off, only `start` is planned. `max_chain_depth`
/// caps the number of planned directories, which bounds symlink loops.
pub fn plan_expansion(
    resolver: &ChildResolver,
    start: &Path,
    cascade: bool,
    max_chain_depth: usize,
) -> ExpansionPlan {
    let mut plan = ExpansionPlan::default();

    let Some(mut children) = resolver.try_resolve_children(start) else {
        debug!(path = %start.display(), "smart expand: start not listable");
        return plan;
    };
    plan.paths.push(start.to_path_buf());

    if !cascade {
        return plan;
    }

    while plan.paths.len() < max_chain_depth.max(1) {
        let next = match children.as_slice() {
            [only] if only.is_dir => only.path.clone(),
            _ => break,
        };
        match resolver.try_resolve_children(&next) {
            Some(grandchildren) => {
                plan.paths.push(next);
                children = grandchildren;
            }
            None => {
                debug!(
                    path = %next.display(),
                    "smart expand: chain stopped at unreadable directory"
                );
                break;
            }
        }
    }

    debug!(
        start = %start.display(),
        depth = plan.paths.len(),
        "smart expand planned"
    );
    plan
}
