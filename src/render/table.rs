use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use super::Renderer;
use crate::markdown::{Align, Token, TokenTag};

type Cell = Vec<Span<'static>>;

fn cell_width(cell: &Cell) -> usize {
    cell.iter()
        .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
        .sum()
}

fn border(left: &str, mid: &str, right: &str, widths: &[usize]) -> String {
    let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", inner.join(mid))
}

/// Lay the table out as a boxed grid sized to its widest cells.
pub(super) fn render(
    renderer: &Renderer,
    table: &Token,
    alignments: &[Align],
) -> Vec<Line<'static>> {
    let theme = renderer.theme();
    let mut rows: Vec<(bool, Vec<Cell>)> = Vec::new();

    for section in &table.children {
        let header = section.tag() == TokenTag::TableHead;
        let style = if header {
            theme.text.add_modifier(Modifier::BOLD)
        } else {
            theme.text
        };
        let cells = section
            .children
            .iter()
            .filter(|cell| cell.tag() == TokenTag::TableCell)
            .map(|cell| {
                let lines = renderer.inline_lines(&cell.children, style);
                let mut spans: Cell = Vec::new();
                for (idx, line) in lines.into_iter().enumerate() {
                    if idx > 0 {
                        spans.push(Span::styled(" ", style));
                    }
                    spans.extend(line.spans);
                }
                spans
            })
            .collect();
        rows.push((header, cells));
    }

    let columns = rows.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }
    let mut widths = vec![1usize; columns];
    for (_, cells) in &rows {
        for (idx, cell) in cells.iter().enumerate() {
            widths[idx] = widths[idx].max(cell_width(cell));
        }
    }

    let border_style = theme.table_border;
    let mut lines = vec![Line::from(Span::styled(
        border("┌", "┬", "┐", &widths),
        border_style,
    ))];

    for (row_idx, (header, cells)) in rows.iter().enumerate() {
        let mut spans = vec![Span::styled("│", border_style)];
        for (col, width) in widths.iter().enumerate() {
            let cell = cells.get(col).cloned().unwrap_or_default();
            let gap = width.saturating_sub(cell_width(&cell));
            let (before, after) = match alignments.get(col).copied().unwrap_or(Align::None) {
                Align::Right => (gap, 0),
                Align::Center => (gap / 2, gap - gap / 2),
                Align::Left | Align::None => (0, gap),
            };
            spans.push(Span::raw(" ".repeat(before + 1)));
            spans.extend(cell);
            spans.push(Span::raw(" ".repeat(after + 1)));
            spans.push(Span::styled("│", border_style));
        }
        lines.push(Line::from(spans));

        if *header && row_idx + 1 < rows.len() {
            lines.push(Line::from(Span::styled(
                border("├", "┼", "┤", &widths),
                border_style,
            )));
        }
    }

    lines.push(Line::from(Span::styled(
        border("└", "┴", "┘", &widths),
        border_style,
    )));
    lines
}
