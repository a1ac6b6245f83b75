use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::tree::projection::VisibleNode;

/// Tree widget that renders projected rows with box-drawing characters.
pub struct TreeWidget<'a> {
    rows: &'a [VisibleNode],
    selected: usize,
    scroll_offset: usize,
    h_scroll: usize,
    use_icons: bool,
    loading: &'a dyn Fn(&VisibleNode) -> bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(
        rows: &'a [VisibleNode],
        selected: usize,
        loading: &'a dyn Fn(&VisibleNode) -> bool,
    ) -> Self {
        Self {
            rows,
            selected,
            scroll_offset: 0,
            h_scroll: 0,
            use_icons: true,
            loading,
            block: None,
        }
    }

    pub fn scroll(mut self, vertical: usize, horizontal: usize) -> Self {
        self.scroll_offset = vertical;
        self.h_scroll = horizontal;
        self
    }

    pub fn use_icons(mut self, use_icons: bool) -> Self {
        self.use_icons = use_icons;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Build the indentation prefix for `rows[index]`.
    ///
    /// Each ancestor level draws a continuation line unless that ancestor was
    /// the last of its siblings.
    pub fn build_prefix(rows: &[VisibleNode], index: usize) -> String {
        let item = &rows[index];
        if item.depth == 0 {
            return String::new();
        }

        let mut parts: Vec<&str> = Vec::new();
        for d in 1..item.depth {
            let mut ancestor_is_last = false;
            for j in (0..index).rev() {
                if rows[j].depth == d {
                    ancestor_is_last = rows[j].is_last_sibling;
                    break;
                }
                if rows[j].depth < d {
                    break;
                }
            }
            parts.push(if ancestor_is_last { "   " } else { "│  " });
        }
        parts.push(if item.is_last_sibling { "└──" } else { "├──" });
        parts.join("")
    }

    fn indicator(&self, item: &VisibleNode) -> &'static str {
        match (self.use_icons, item.is_dir, item.is_expanded) {
            (true, true, true) => "\u{f07c} ",
            (true, true, false) => "\u{f07b} ",
            (true, false, _) => "\u{f15b} ",
            (false, true, true) => "[-] ",
            (false, true, false) => "[+] ",
            (false, false, _) => "    ",
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        let visible_height = inner_area.height as usize;
        if self.rows.is_empty() || visible_height == 0 {
            return;
        }

        let visible = self
            .rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_height);

        for (i, (idx, item)) in visible.enumerate() {
            let y = inner_area.y + i as u16;

            let style = if idx == self.selected {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else if item.is_dir {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let loading = if (self.loading)(item) { " …" } else { "" };
            let content = format!(
                "{}{}{}{}",
                Self::build_prefix(self.rows, idx),
                self.indicator(item),
                item.name,
                loading
            );
            let shifted: String = content.chars().skip(self.h_scroll).collect();
            let line = Line::from(Span::styled(shifted, style));
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn row(name: &str, depth: usize, is_last_sibling: bool) -> VisibleNode {
        VisibleNode {
            path: PathBuf::from(name),
            name: name.into(),
            is_dir: true,
            depth,
            is_expanded: true,
            is_last_sibling,
        }
    }

    #[test]
    fn prefix_draws_continuation_lines() {
        let rows = vec![
            row("root", 0, true),
            row("a", 1, false),
            row("a1", 2, true),
            row("b", 1, true),
            row("b1", 2, true),
        ];
        assert_eq!(TreeWidget::build_prefix(&rows, 0), "");
        assert_eq!(TreeWidget::build_prefix(&rows, 1), "├──");
        assert_eq!(TreeWidget::build_prefix(&rows, 2), "│  └──");
        assert_eq!(TreeWidget::build_prefix(&rows, 3), "└──");
        assert_eq!(TreeWidget::build_prefix(&rows, 4), "   └──");
    }

    #[test]
    fn renders_rows_into_buffer() {
        let rows = vec![row("root", 0, true), row("child", 1, true)];
        let not_loading = |_: &VisibleNode| false;
        let widget = TreeWidget::new(&rows, 0, &not_loading).use_icons(false);
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let second: String = (0..20).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(second.starts_with("└──[-] child"));
    }
}
