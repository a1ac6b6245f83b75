use std::path::{Path, PathBuf};
use std::time::Instant;

use ratatui::text::Span;
use tokio::sync::watch;

use crate::fs::resolver::display_name;
use crate::tree::engine::{Command, EngineEvent, TreeEngine};
use crate::tree::layout::WidthCache;
use crate::tree::mutation::Mutation;
use crate::tree::projection::VisibleNode;

/// Columns a row uses before its name: connector plus icon.
const ROW_CHROME: usize = 4;
/// Columns per depth level.
const INDENT: usize = 3;

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    CreateFile { parent: PathBuf },
    CreateDirectory { parent: PathBuf },
    Rename { original: PathBuf },
    DeleteConfirm { target: PathBuf },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    Dialog(DialogKind),
}

/// State for a dialog's text input.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    pub cursor_position: usize,
}

/// Main application state.
pub struct App {
    pub engine: TreeEngine,
    /// Rows of the last projection pass.
    pub rows: Vec<VisibleNode>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub h_scroll: usize,
    /// Inner width of the tree panel at the last draw.
    pub viewport_width: usize,
    pub widths: WidthCache,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub status_message: Option<(String, Instant)>,
    pub should_quit: bool,
    pub confirm_delete: bool,
    pub use_icons: bool,
    /// Fires when the engine's visible tree may have changed.
    version_rx: watch::Receiver<u64>,
    /// Row to select once it shows up, e.g. the old root after moving up.
    pending_select: Option<PathBuf>,
}

impl App {
    pub fn new(engine: TreeEngine, confirm_delete: bool, use_icons: bool) -> Self {
        let version_rx = engine.subscribe();
        let mut app = Self {
            engine,
            rows: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            h_scroll: 0,
            viewport_width: 0,
            widths: WidthCache::new(),
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            status_message: None,
            should_quit: false,
            confirm_delete,
            use_icons,
            version_rx,
            pending_select: None,
        };
        app.version_rx.borrow_and_update();
        app.reproject();
        app
    }

    /// Re-project if the expansion store changed since the last pass.
    pub fn sync_rows(&mut self) {
        // The engine owns the sender, so the channel cannot close under us.
        if !self.version_rx.has_changed().unwrap_or(false) {
            return;
        }
        self.version_rx.borrow_and_update();
        self.reproject();
    }

    fn reproject(&mut self) {
        let selected_path = self.selected_path().map(Path::to_path_buf);
        self.rows = self.engine.visible_nodes().collect();
        self.widths
            .sync(self.rows.iter().map(|row| (row.path.as_path(), Self::measure(row))));

        self.selected_index = selected_path
            .and_then(|p| self.rows.iter().position(|row| row.path == p))
            .unwrap_or(self.selected_index);
        if let Some(wanted) = &self.pending_select {
            if let Some(idx) = self.rows.iter().position(|row| &row.path == wanted) {
                self.selected_index = idx;
                self.pending_select = None;
            }
        }
        if !self.rows.is_empty() && self.selected_index >= self.rows.len() {
            self.selected_index = self.rows.len() - 1;
        }
    }

    fn measure(row: &VisibleNode) -> usize {
        row.depth * INDENT + ROW_CHROME + Span::raw(row.name.as_str()).width()
    }

    pub fn selected(&self) -> Option<&VisibleNode> {
        self.rows.get(self.selected_index)
    }

    pub fn selected_path(&self) -> Option<&Path> {
        self.selected().map(|row| row.path.as_path())
    }

    /// Directory that new entries go into: the selection if it is a directory,
    /// otherwise its parent.
    pub fn current_dir(&self) -> PathBuf {
        match self.selected() {
            Some(row) if row.is_dir => row.path.clone(),
            Some(row) => row
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.engine.root().to_path_buf()),
            None => self.engine.root().to_path_buf(),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn select_next(&mut self) {
        let len = self.rows.len();
        if len > 0 && self.selected_index < len - 1 {
            self.selected_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        if !self.rows.is_empty() {
            self.selected_index = self.rows.len() - 1;
        }
    }

    /// Open or close the selected directory.
    pub fn toggle_selected(&mut self) {
        if let Some(row) = self.selected() {
            if row.is_dir {
                let path = row.path.clone();
                self.engine.handle(Command::ToggleRequested(path));
            }
        }
    }

    /// Collapse the selected directory, or jump to parent if on a file or collapsed directory.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected() else {
            return;
        };
        if row.is_dir && row.is_expanded {
            let path = row.path.clone();
            self.engine.handle(Command::CollapseRequested(path));
            return;
        }
        if let Some(parent) = row.path.parent() {
            if let Some(idx) = self.rows.iter().position(|r| r.path == parent) {
                self.selected_index = idx;
            }
        }
    }

    /// Make the selected directory the new root.
    pub fn root_at_selected(&mut self) {
        let Some(row) = self.selected() else {
            return;
        };
        if !row.is_dir || row.depth == 0 {
            return;
        }
        let path = row.path.clone();
        self.change_root(path, None);
    }

    /// Move the root up to its parent, keeping the old root selected.
    pub fn root_up(&mut self) {
        let old_root = self.engine.root().to_path_buf();
        if let Some(parent) = old_root.parent() {
            let parent = parent.to_path_buf();
            self.change_root(parent, Some(old_root));
        }
    }

    fn change_root(&mut self, root: PathBuf, select: Option<PathBuf>) {
        self.selected_index = 0;
        self.scroll_offset = 0;
        self.h_scroll = 0;
        self.pending_select = select;
        self.engine.handle(Command::SetRootRequested(root));
    }

    pub fn toggle_hidden(&mut self) {
        let show = !self.engine.show_hidden();
        self.engine.set_show_hidden(show);
    }

    pub fn refresh(&mut self) {
        let dir = self.current_dir();
        self.engine.handle(Command::RefreshRequested(dir));
    }

    pub fn request_delete(&mut self) {
        let Some(path) = self.selected_path().map(Path::to_path_buf) else {
            return;
        };
        if path == self.engine.root() {
            self.set_status_message("Refusing to delete the root".into());
            return;
        }
        if self.confirm_delete {
            self.open_dialog(DialogKind::DeleteConfirm { target: path });
        } else {
            self.engine.handle(Command::DeleteRequested(path));
        }
    }

    pub fn request_rename(&mut self) {
        if let Some(path) = self.selected_path().map(Path::to_path_buf) {
            if path != self.engine.root() {
                self.open_dialog(DialogKind::Rename { original: path });
            }
        }
    }

    /// Open a dialog of the given kind.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        if let DialogKind::Rename { ref original } = kind {
            if let Some(name) = original.file_name() {
                let name = name.to_string_lossy().to_string();
                self.dialog_state.cursor_position = name.len();
                self.dialog_state.input = name;
            }
        }
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    /// Turn the open dialog into an engine command and close it.
    pub fn submit_dialog(&mut self) {
        let AppMode::Dialog(kind) = std::mem::take(&mut self.mode) else {
            return;
        };
        let name = std::mem::take(&mut self.dialog_state.input);
        let command = match kind {
            DialogKind::CreateFile { parent } => Command::CreateFileRequested { parent, name },
            DialogKind::CreateDirectory { parent } => {
                Command::CreateDirectoryRequested { parent, name }
            }
            DialogKind::Rename { original } => Command::RenameRequested {
                path: original,
                new_name: name,
            },
            DialogKind::DeleteConfirm { target } => Command::DeleteRequested(target),
        };
        self.close_dialog();
        self.engine.handle(command);
    }

    /// Insert a character at the current cursor position.
    pub fn dialog_input_char(&mut self, c: char) {
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev_char) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev_char.len_utf8();
            self.dialog_state
                .input
                .remove(self.dialog_state.cursor_position);
        }
    }

    pub fn dialog_move_cursor_left(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev_char) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev_char.len_utf8();
        }
    }

    pub fn dialog_move_cursor_right(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(next_char) = self.dialog_state.input[pos..].chars().next() {
            self.dialog_state.cursor_position += next_char.len_utf8();
        }
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Report the result of applied background work.
    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::RootChanged { root, exists: false } => {
                self.set_status_message(format!("{} is not a directory", root.display()));
            }
            EngineEvent::Unreadable(path) => {
                self.set_status_message(format!("Cannot open {}", path.display()));
            }
            EngineEvent::Mutated {
                mutation,
                target,
                changed,
            } => {
                let name = target
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let msg = match (&mutation, changed) {
                    (Mutation::CreateFile { .. }, true) => format!("Created {name}"),
                    (Mutation::CreateDirectory { .. }, true) => format!("Created {name}/"),
                    (Mutation::Rename { .. }, true) => format!("Renamed to {name}"),
                    (Mutation::Delete { .. }, true) => format!("Deleted {name}"),
                    (Mutation::Rename { .. }, false) => format!("{name} already exists"),
                    (_, false) => format!("Nothing to {} for {name}", mutation.label()),
                };
                if changed {
                    self.select_after_mutation(&mutation, &target);
                }
                self.set_status_message(msg);
            }
            EngineEvent::MutationFailed { mutation, error } => {
                self.set_status_message(format!("Failed to {}: {error}", mutation.label()));
            }
            EngineEvent::WorkerFailed(error) => {
                self.set_status_message(format!("Error: {error}"));
            }
            EngineEvent::Expanded { deepest, opened } if opened > 1 => {
                self.set_status_message(format!(
                    "Opened {opened} levels down to {}",
                    display_name(&deepest)
                ));
            }
            EngineEvent::RootChanged { .. }
            | EngineEvent::Expanded { .. }
            | EngineEvent::Stale => {}
        }
    }

    /// Keep the cursor on something meaningful once rows are re-projected.
    fn select_after_mutation(&mut self, mutation: &Mutation, target: &Path) {
        self.sync_rows();
        let wanted = match mutation {
            Mutation::Delete { .. } => target.parent().map(Path::to_path_buf),
            _ => Some(target.to_path_buf()),
        };
        if let Some(idx) = wanted.and_then(|p| self.rows.iter().position(|r| r.path == p)) {
            self.selected_index = idx;
        }
    }

    /// Update the scroll offset to ensure the selected item is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }

    pub fn scroll_right(&mut self) {
        if self.widths.needs_horizontal_scroll(self.viewport_width) {
            let max = self.widths.max_width().saturating_sub(self.viewport_width);
            self.h_scroll = (self.h_scroll + INDENT).min(max);
        }
    }

    pub fn scroll_left(&mut self) {
        self.h_scroll = self.h_scroll.saturating_sub(INDENT);
    }
}
