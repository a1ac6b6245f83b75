use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::components::dialog::DialogWidget;
use crate::components::tree::TreeWidget;
use crate::tree::projection::VisibleNode;

const HINTS: &str =
    "j/k move  l open  h close  c/u root  a/A new  r rename  d del  R refresh  . hidden  q quit";

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let [tree_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    let block = Block::default()
        .title(format!(" {} ", app.engine.root().display()))
        .borders(Borders::ALL);
    let inner = block.inner(tree_area);

    app.viewport_width = inner.width as usize;
    app.update_scroll(inner.height as usize);

    let engine = &app.engine;
    let loading = |row: &VisibleNode| engine.is_loading(&row.path);
    let tree = TreeWidget::new(&app.rows, app.selected_index, &loading)
        .scroll(app.scroll_offset, app.h_scroll)
        .use_icons(app.use_icons)
        .block(block);
    frame.render_widget(tree, tree_area);

    frame.render_widget(status_line(app), status_area);

    frame.render_widget(DialogWidget::new(&app.mode, &app.dialog_state), frame.area());
}

fn status_line(app: &App) -> Paragraph<'_> {
    let line = match &app.status_message {
        Some((msg, _)) => Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        None => Line::from(vec![
            Span::styled(
                format!(" {} items ", app.rows.len()),
                Style::default().fg(Color::Black).bg(Color::Cyan),
            ),
            Span::styled(format!(" {HINTS}"), Style::default().fg(Color::DarkGray)),
        ]),
    };
    Paragraph::new(line)
}
