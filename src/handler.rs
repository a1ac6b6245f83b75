use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, AppMode, DialogKind};

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    match app.mode {
        AppMode::Normal => handle_normal_key(app, key),
        AppMode::Dialog(DialogKind::DeleteConfirm { .. }) => handle_confirm_key(app, key),
        AppMode::Dialog(_) => handle_input_key(app, key),
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('h') | KeyCode::Backspace => app.collapse_selected(),
        KeyCode::Right => app.scroll_right(),
        KeyCode::Left => app.scroll_left(),
        KeyCode::Char('a') => {
            let parent = app.current_dir();
            app.open_dialog(DialogKind::CreateFile { parent });
        }
        KeyCode::Char('A') => {
            let parent = app.current_dir();
            app.open_dialog(DialogKind::CreateDirectory { parent });
        }
        KeyCode::Char('r') => app.request_rename(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(),
        KeyCode::Char('R') => app.refresh(),
        KeyCode::Char('c') => app.root_at_selected(),
        KeyCode::Char('u') => app.root_up(),
        KeyCode::Char('.') => app.toggle_hidden(),
        _ => {}
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_dialog(),
        KeyCode::Enter => app.submit_dialog(),
        KeyCode::Backspace => app.dialog_delete_char(),
        KeyCode::Left => app.dialog_move_cursor_left(),
        KeyCode::Right => app.dialog_move_cursor_right(),
        KeyCode::Char(c) => app.dialog_input_char(c),
        _ => {}
    }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => app.submit_dialog(),
        KeyCode::Char('n') | KeyCode::Esc => app.close_dialog(),
        _ => {}
    }
}

/// Handle a mouse event: wheel scrolls the selection.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if app.mode != AppMode::Normal {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.select_next(),
        MouseEventKind::ScrollUp => app.select_previous(),
        _ => {}
    }
}
