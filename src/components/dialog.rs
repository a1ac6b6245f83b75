use std::path::Path;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{AppMode, DialogKind, DialogState};
use crate::fs::resolver::display_name;

/// Dialog widget that renders a centered modal overlay.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState) -> Self {
        Self { mode, dialog_state }
    }

    /// Calculate a centered rectangle within the given area.
    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        let w = width.min(area.width);
        let h = height.min(area.height);
        Rect::new(x, y, w, h)
    }
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let AppMode::Dialog(kind) = self.mode else {
            return;
        };

        match kind {
            DialogKind::CreateFile { parent } => {
                let title = format!("New file in {}", display_name(parent));
                render_input_dialog(&title, self.dialog_state, area, buf);
            }
            DialogKind::CreateDirectory { parent } => {
                let title = format!("New directory in {}", display_name(parent));
                render_input_dialog(&title, self.dialog_state, area, buf);
            }
            DialogKind::Rename { .. } => {
                render_input_dialog("Rename", self.dialog_state, area, buf);
            }
            DialogKind::DeleteConfirm { target } => {
                render_confirm_dialog(target, area, buf);
            }
        }
    }
}

fn hint_line(hint: &str) -> Line<'_> {
    Line::from(Span::styled(
        hint,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
    ))
}

fn render_input_dialog(title: &str, state: &DialogState, area: Rect, buf: &mut Buffer) {
    let dialog_width = 50.min(area.width.saturating_sub(4));
    let rect = DialogWidget::centered_rect(dialog_width, 5, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input = state.input.as_str();
    let cursor_pos = state.cursor_position.min(input.len());
    let max_width = inner.width as usize;

    let before = &input[..cursor_pos];
    let rest = &input[cursor_pos..];
    let (cursor_char, after) = match rest.chars().next() {
        Some(c) => rest.split_at(c.len_utf8()),
        None => (" ", ""),
    };

    // Keep the cursor in view by dropping characters from the left.
    let keep = max_width.saturating_sub(2);
    let before_count = before.chars().count();
    let before_display = if before_count > keep {
        let skip = before_count - keep;
        let byte = before.char_indices().nth(skip).map_or(before.len(), |(i, _)| i);
        &before[byte..]
    } else {
        before
    };

    let input_style = Style::default().fg(Color::White);
    let cursor_style = Style::default()
        .bg(Color::White)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);

    let line = Line::from(vec![
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ]);
    buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);

    if inner.height > 1 {
        let hint = hint_line("[Enter] Confirm  [Esc] Cancel");
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
    }
}

fn render_confirm_dialog(target: &Path, area: Rect, buf: &mut Buffer) {
    let name = display_name(target);
    let dialog_width = (name.chars().count() as u16 + 10)
        .max(40)
        .min(area.width.saturating_sub(4));
    let rect = DialogWidget::centered_rect(dialog_width, 6, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(" Delete Confirmation ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height < 2 || inner.width == 0 {
        return;
    }

    let header = Line::from(Span::styled(
        "Delete this entry?",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ));
    buf.set_line(inner.x, inner.y, &header, inner.width);

    let line = Line::from(Span::styled(
        format!("  • {}", name),
        Style::default().fg(Color::White),
    ));
    buf.set_line(inner.x, inner.y + 1, &line, inner.width);

    let hint = hint_line("[y] Yes  [n/Esc] Cancel");
    buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn buffer_to_string(buf: &Buffer, area: Rect) -> String {
        let mut s = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                s.push_str(buf[(x, y)].symbol());
            }
            s.push('\n');
        }
        s
    }

    fn render(mode: &AppMode, state: &DialogState) -> String {
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(mode, state).render(area, &mut buf);
        buffer_to_string(&buf, area)
    }

    #[test]
    fn input_dialog_shows_parent_and_input() {
        let mode = AppMode::Dialog(DialogKind::CreateFile {
            parent: PathBuf::from("/tmp/project"),
        });
        let state = DialogState {
            input: "test.txt".to_string(),
            cursor_position: 8,
        };
        let content = render(&mode, &state);
        assert!(content.contains("New file in project"));
        assert!(content.contains("test.txt"));
    }

    #[test]
    fn cursor_inside_multibyte_input() {
        let mode = AppMode::Dialog(DialogKind::Rename {
            original: PathBuf::from("/tmp/old.txt"),
        });
        let state = DialogState {
            input: "naïve".to_string(),
            cursor_position: 2,
        };
        let content = render(&mode, &state);
        assert!(content.contains("Rename"));
        assert!(content.contains("naïve"));
    }

    #[test]
    fn confirm_dialog_names_target() {
        let mode = AppMode::Dialog(DialogKind::DeleteConfirm {
            target: PathBuf::from("/tmp/file1.txt"),
        });
        let content = render(&mode, &DialogState::default());
        assert!(content.contains("Delete"));
        assert!(content.contains("file1.txt"));
    }

    #[test]
    fn normal_mode_draws_nothing() {
        let content = render(&AppMode::Normal, &DialogState::default());
        assert!(content.trim().is_empty());
    }
}
