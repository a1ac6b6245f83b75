//! The tree engine: main-context owner of expansion state.
//!
//! `TreeEngine::handle` accepts commands and never blocks. Anything that
//! touches the filesystem runs on the blocking pool and comes back as a
//! `Completion` on the engine's channel; the owner feeds those to
//! `TreeEngine::apply`, which is the only place the store changes as a
//! result of I/O.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::error::AppError;
use crate::fs::port::FsPort;
use crate::fs::resolver::ChildResolver;
use crate::tree::expansion::ExpansionStore;
use crate::tree::mutation::{self, Mutation, MutationOutcome};
use crate::tree::projection::{Projection, DEFAULT_MAX_DEPTH};
use crate::tree::smart_expand::{plan_expansion, ExpansionPlan, DEFAULT_MAX_CHAIN_DEPTH};

/// What happens to expanded descendants when a directory is collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollapsePolicy {
    /// Descendants stay in the store and reappear when the parent reopens.
    #[default]
    Remember,
    /// Descendants are cleared with the parent.
    Forget,
}

impl FromStr for CollapsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remember" => Ok(CollapsePolicy::Remember),
            "forget" => Ok(CollapsePolicy::Forget),
            other => Err(format!("unknown collapse policy {other:?}")),
        }
    }
}

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub smart_expand: bool,
    pub max_chain_depth: usize,
    pub max_depth: usize,
    pub collapse_policy: CollapsePolicy,
    pub show_hidden: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            smart_expand: true,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            collapse_policy: CollapsePolicy::Remember,
            show_hidden: false,
        }
    }
}

/// Requests a front end sends to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleRequested(PathBuf),
    CollapseRequested(PathBuf),
    CreateFileRequested { parent: PathBuf, name: String },
    CreateDirectoryRequested { parent: PathBuf, name: String },
    RenameRequested { path: PathBuf, new_name: String },
    DeleteRequested(PathBuf),
    RefreshRequested(PathBuf),
    SetRootRequested(PathBuf),
}

/// Result of background work, posted back to the main context.
#[derive(Debug)]
pub enum Completion {
    RootProbed {
        epoch: u64,
        root: PathBuf,
        is_dir: bool,
    },
    Expanded {
        epoch: u64,
        ticket: u64,
        path: PathBuf,
        plan: ExpansionPlan,
    },
    /// Not tied to a root: paths are absolute, so the result holds after a
    /// root change too.
    Mutated {
        outcome: MutationOutcome,
    },
    Failed {
        epoch: u64,
        error: AppError,
    },
}

/// What applying a completion did, for the front end to report.
#[derive(Debug)]
pub enum EngineEvent {
    RootChanged { root: PathBuf, exists: bool },
    /// `opened` directories were added, ending at `deepest`.
    Expanded { deepest: PathBuf, opened: usize },
    /// The directory could not be listed and stays collapsed.
    Unreadable(PathBuf),
    Mutated { mutation: Mutation, target: PathBuf, changed: bool },
    MutationFailed { mutation: Mutation, error: AppError },
    WorkerFailed(AppError),
    /// A completion superseded by a later request.
    Stale,
}

pub struct TreeEngine {
    root: PathBuf,
    resolver: ChildResolver,
    store: ExpansionStore,
    options: EngineOptions,
    /// Bumped on every root change; older completions are discarded.
    epoch: u64,
    next_ticket: u64,
    /// In-flight expand requests by path. Only the latest ticket may apply.
    pending: HashMap<PathBuf, u64>,
    in_flight: usize,
    completions: mpsc::UnboundedSender<Completion>,
}

impl TreeEngine {
    /// Create an engine for `root` and start probing it.
    ///
    /// Must be called inside a tokio runtime. The receiver yields the
    /// completions to pass to `apply`.
    pub fn new(
        root: &Path,
        port: Arc<dyn FsPort>,
        options: EngineOptions,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut engine = Self {
            root: root.to_path_buf(),
            resolver: ChildResolver::new(port, options.show_hidden),
            store: ExpansionStore::new(),
            options,
            epoch: 0,
            next_ticket: 0,
            pending: HashMap::new(),
            in_flight: 0,
            completions: tx,
        };
        engine.probe_root();
        (engine, rx)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(test)]
    pub fn store(&self) -> &ExpansionStore {
        &self.store
    }

    #[cfg(test)]
    pub fn is_expanded(&self, path: &Path) -> bool {
        self.store.is_expanded(path)
    }

    /// Whether an expand of `path` is still being scanned.
    pub fn is_loading(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    /// Number of spawned tasks whose completion has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Receiver that changes whenever the visible tree may have changed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }

    #[cfg(test)]
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    pub fn show_hidden(&self) -> bool {
        self.resolver.show_hidden()
    }

    pub fn set_show_hidden(&mut self, show_hidden: bool) {
        self.resolver.set_show_hidden(show_hidden);
        self.options.show_hidden = show_hidden;
        let root = self.root.clone();
        self.store.invalidate(&root);
    }

    /// Lazy visible-node sequence, re-derived from current state on each call.
    pub fn visible_nodes(&self) -> Projection<'_> {
        Projection::new(&self.resolver, &self.store, &self.root, self.options.max_depth)
    }

    pub fn handle(&mut self, command: Command) {
        debug!(?command, "command");
        match command {
            Command::ToggleRequested(path) => self.toggle(path),
            Command::CollapseRequested(path) => self.collapse(&path),
            Command::CreateFileRequested { parent, name } => {
                self.spawn_mutation(Mutation::CreateFile { parent, name })
            }
            Command::CreateDirectoryRequested { parent, name } => {
                self.spawn_mutation(Mutation::CreateDirectory { parent, name })
            }
            Command::RenameRequested { path, new_name } => {
                self.spawn_mutation(Mutation::Rename { path, new_name })
            }
            Command::DeleteRequested(path) => self.spawn_delete(path),
            Command::RefreshRequested(path) => self.refresh(&path),
            Command::SetRootRequested(path) => self.set_root(path),
        }
    }

    fn toggle(&mut self, path: PathBuf) {
        if self.pending.remove(&path).is_some() {
            // Open then close before the scan finished: end closed.
            debug!(path = %path.display(), "toggle cancels in-flight expand");
            return;
        }
        if self.store.is_expanded(&path) {
            self.collapse(&path);
        } else {
            self.request_expand(path);
        }
    }

    fn collapse(&mut self, path: &Path) {
        self.pending.remove(path);
        match self.options.collapse_policy {
            CollapsePolicy::Remember => self.store.collapse(path),
            CollapsePolicy::Forget => self.store.collapse_subtree(path),
        }
    }

    fn request_expand(&mut self, path: PathBuf) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending.insert(path.clone(), ticket);

        let epoch = self.epoch;
        let resolver = self.resolver.clone();
        let cascade = self.options.smart_expand;
        let max_chain = self.options.max_chain_depth;
        self.spawn(move || {
            let plan = plan_expansion(&resolver, &path, cascade, max_chain);
            Completion::Expanded {
                epoch,
                ticket,
                path,
                plan,
            }
        });
    }

    fn spawn_mutation(&mut self, mutation: Mutation) {
        let port = Arc::clone(self.resolver.port());
        self.spawn(move || Completion::Mutated {
            outcome: mutation::execute(port.as_ref(), mutation),
        });
    }

    fn spawn_delete(&mut self, path: PathBuf) {
        let port = Arc::clone(self.resolver.port());
        self.spawn(move || {
            let is_dir = port.is_dir(&path);
            Completion::Mutated {
                outcome: mutation::execute(port.as_ref(), Mutation::Delete { path, is_dir }),
            }
        });
    }

    fn set_root(&mut self, root: PathBuf) {
        info!(root = %root.display(), "root changed");
        self.epoch += 1;
        self.pending.clear();
        self.root = root;
        self.store.reset(None);
        self.probe_root();
    }

    fn probe_root(&mut self) {
        let epoch = self.epoch;
        let root = self.root.clone();
        let port = Arc::clone(self.resolver.port());
        self.spawn(move || {
            let is_dir = port.is_dir(&root);
            Completion::RootProbed {
                epoch,
                root,
                is_dir,
            }
        });
    }

    /// Make observers re-read `dir` if it is currently open.
    fn refresh(&mut self, dir: &Path) {
        if self.store.is_expanded(dir) {
            debug!(dir = %dir.display(), "refresh");
            self.store.invalidate(dir);
        }
    }

    fn spawn<F>(&mut self, work: F)
    where
        F: FnOnce() -> Completion + Send + 'static,
    {
        self.in_flight += 1;
        let epoch = self.epoch;
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let completion = match tokio::task::spawn_blocking(work).await {
                Ok(completion) => completion,
                Err(e) => Completion::Failed {
                    epoch,
                    error: e.into(),
                },
            };
            let _ = tx.send(completion);
        });
    }

    /// Apply a worker result to the store. Call on the main context only.
    pub fn apply(&mut self, completion: Completion) -> EngineEvent {
        self.in_flight = self.in_flight.saturating_sub(1);

        match completion {
            Completion::Mutated { outcome } => self.apply_mutation(outcome),
            Completion::RootProbed { epoch, .. }
            | Completion::Expanded { epoch, .. }
            | Completion::Failed { epoch, .. }
                if epoch != self.epoch =>
            {
                trace!("dropping completion from a previous root");
                EngineEvent::Stale
            }
            Completion::RootProbed { root, is_dir, .. } => {
                if is_dir {
                    self.store.reset(Some(&root));
                } else {
                    warn!(root = %root.display(), "root is not a directory");
                    self.store.reset(None);
                }
                EngineEvent::RootChanged {
                    root,
                    exists: is_dir,
                }
            }
            Completion::Expanded {
                ticket, path, plan, ..
            } => {
                if self.pending.get(&path) != Some(&ticket) {
                    trace!(path = %path.display(), "dropping superseded expand");
                    return EngineEvent::Stale;
                }
                self.pending.remove(&path);
                let Some(deepest) = plan.last().map(Path::to_path_buf) else {
                    return EngineEvent::Unreadable(path);
                };
                let opened = plan.paths.len();
                self.store.expand_all(plan.paths);
                EngineEvent::Expanded { deepest, opened }
            }
            Completion::Failed { error, .. } => {
                warn!(error = %error, "background task failed");
                EngineEvent::WorkerFailed(error)
            }
        }
    }

    fn apply_mutation(&mut self, outcome: MutationOutcome) -> EngineEvent {
        let MutationOutcome {
            mutation,
            target,
            result,
        } = outcome;

        let changed = match result {
            Ok(changed) => changed,
            Err(error) => return EngineEvent::MutationFailed { mutation, error },
        };

        if changed {
            match &mutation {
                Mutation::Delete { path, .. } => {
                    self.store.forget_subtree(path);
                    self.pending.retain(|p, _| !p.starts_with(path));
                }
                Mutation::Rename { path, .. } => {
                    self.store.rename_subtree(path, &target);
                    self.pending.retain(|p, _| !p.starts_with(path));
                }
                Mutation::CreateFile { .. } | Mutation::CreateDirectory { .. } => {}
            }
            self.refresh(&mutation.parent_dir());
        }

        EngineEvent::Mutated {
            mutation,
            target,
            changed,
        }
    }
}
